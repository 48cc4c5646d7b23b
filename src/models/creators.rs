use super::JsonValue;

upstream_object!(CreatorListItem {
    creator_id: String,
    creator_name: String,
    creator_display_name: String,
    creator_avatar: String,
    creator_network: String,
    creator_followers: f64,
    creator_posts: i64,
    creator_rank: i64,
    interactions_24h: f64,
});

upstream_object!(CreatorDetails {
    creator_id: String,
    creator_name: String,
    creator_display_name: String,
    creator_avatar: String,
    creator_followers: f64,
    creator_rank: i64,
    interactions_24h: f64,
    topic_influence: JsonValue,
});

upstream_object!(CreatorTimeSeriesItem {
    time: i64,
    followers: f64,
    interactions: f64,
    posts_active: i64,
    creator_rank: i64,
});
