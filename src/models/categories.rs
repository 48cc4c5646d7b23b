use super::JsonValue;

upstream_object!(CategoryListItem {
    category: String,
    title: String,
    category_rank: i64,
    category_rank_1h_previous: i64,
    category_rank_24h_previous: i64,
    interactions_24h: f64,
    num_contributors: f64,
    num_posts: f64,
    social_dominance: f64,
});

upstream_object!(CategoryDetails {
    topic: String,
    title: String,
    category: String,
    related_topics: Vec<String>,
    types_count: JsonValue,
    types_interactions: JsonValue,
    types_sentiment: JsonValue,
    interactions_24h: f64,
    num_contributors: i64,
    num_posts: i64,
    trend: String,
});

upstream_object!(CategoryTopic {
    topic: String,
    title: String,
    topic_rank: i64,
    topic_rank_1h_previous: i64,
    topic_rank_24h_previous: i64,
    interactions_24h: f64,
    num_contributors: f64,
    num_posts: f64,
    social_dominance: f64,
});

upstream_object!(CategoryTimeSeriesItem {
    time: i64,
    contributors_active: i64,
    contributors_created: i64,
    interactions: f64,
    posts_active: i64,
    posts_created: i64,
    sentiment: f64,
    spam: i64,
});

upstream_object!(CategoryCreator {
    creator_id: String,
    creator_name: String,
    creator_avatar: String,
    creator_followers: f64,
    creator_rank: i64,
    interactions_24h: f64,
});
