use super::JsonValue;

upstream_object!(TopicListItem {
    topic: String,
    title: String,
    topic_rank: i64,
    topic_rank_1h_previous: i64,
    topic_rank_24h_previous: i64,
    num_contributors: f64,
    num_posts: f64,
    interactions_24h: f64,
});

upstream_object!(TopicDetails {
    topic: String,
    title: String,
    topic_rank: i64,
    related_topics: Vec<String>,
    types_count: JsonValue,
    types_interactions: JsonValue,
    types_sentiment: JsonValue,
    types_sentiment_detail: JsonValue,
    interactions_24h: f64,
    num_contributors: i64,
    num_posts: i64,
    categories: Vec<String>,
    trend: String,
});

upstream_object!(
    /// AI summary of what is happening on a topic
    TopicWhatsup {
        summary: String,
    }
);

upstream_object!(
    /// One bucket of a topic or coin time series
    TopicTimeSeriesItem {
        time: i64,
        contributors_active: i64,
        contributors_created: i64,
        interactions: f64,
        posts_active: i64,
        posts_created: i64,
        sentiment: f64,
        spam: i64,
        alt_rank: i64,
        circulating_supply: f64,
        close: f64,
        galaxy_score: f64,
        high: f64,
        low: f64,
        market_cap: f64,
        market_dominance: f64,
        open: f64,
        social_dominance: f64,
        volume_24h: f64,
    }
);

upstream_object!(TopicCreator {
    id: String,
    name: String,
    followers: f64,
    creator_id: String,
    creator_name: String,
    creator_display_name: String,
    creator_avatar: String,
    creator_followers: f64,
    interactions_24h: f64,
});
