use super::JsonValue;

/// Feed entries share one shape across topics, categories and creators
macro_rules! social_post {
    ($($name:ident),* $(,)?) => {
        $(
            upstream_object!($name {
                id: String,
                post_type: String,
                post_title: String,
                post_created: i64,
                post_sentiment: f64,
                post_link: String,
                post_image: String,
                interactions_total: f64,
                interactions_24h: f64,
                creator_id: String,
                creator_name: String,
                creator_display_name: String,
                creator_followers: f64,
                creator_avatar: String,
            });
        )*
    };
}

social_post!(TopicPost, TopicNews, CategoryPost, CategoryNews, CreatorPost);

upstream_object!(PostMetrics {
    bookmarks: f64,
    favorites: f64,
    retweets: f64,
    replies: f64,
    views: f64,
});

upstream_object!(PostImage {
    src: String,
    width: i64,
    height: i64,
});

upstream_object!(
    /// Single post as returned by `/posts/{type}/{id}/v1`
    PostDetails {
        #[serde(rename = "type")]
        #[graphql(name = "type")]
        kind: String,
        id: String,
        title: String,
        description: String,
        #[serde(rename = "extraText", alias = "extra_text")]
        #[graphql(name = "extraText")]
        extra_text: String,
        metrics: PostMetrics,
        image: PostImage,
        video: JsonValue,
        images: JsonValue,
        creator_id: String,
        creator_name: String,
        creator_display_name: String,
        creator_avatar: String,
        creator_followers: f64,
        topics: Vec<String>,
        categories: Vec<String>,
    }
);

upstream_object!(PostTimeSeriesItem {
    time: i64,
    interactions: f64,
});
