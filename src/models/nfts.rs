upstream_object!(NftListItem {
    id: String,
    lunar_id: String,
    name: String,
    logo: String,
    base_crypto: String,
    floor_price: f64,
    market_cap: f64,
    percent_change_24h: f64,
    volume_24h: f64,
    interactions_24h: f64,
    social_contributors: i64,
    social_volume_24h: f64,
    social_dominance: f64,
    galaxy_score: f64,
    alt_rank: i64,
});

upstream_object!(NftDetails {
    id: String,
    name: String,
    floor_price: f64,
    market_cap: f64,
    percent_change_24h: f64,
    volume_24h: f64,
});

upstream_object!(NftTimeSeriesItem {
    time: i64,
    alt_rank: i64,
    contributors_active: i64,
    contributors_created: i64,
    interactions: f64,
    market_cap: f64,
    posts_active: i64,
    posts_created: i64,
    sentiment: f64,
    social_dominance: f64,
});
