upstream_object!(StockListItem {
    id: i64,
    symbol: String,
    name: String,
    price: f64,
    volume_24h: f64,
    percent_change_24h: f64,
    market_cap: f64,
    market_cap_rank: i64,
    interactions_24h: f64,
    social_volume_24h: f64,
    social_dominance: f64,
    market_dominance: f64,
    market_dominance_prev: f64,
    galaxy_score: f64,
    galaxy_score_previous: f64,
    alt_rank: i64,
    alt_rank_previous: i64,
    sentiment: f64,
    categories: Vec<String>,
    topic: String,
    logo: String,
});

upstream_object!(StockDetails {
    id: i64,
    name: String,
    symbol: String,
    price: f64,
    market_cap: f64,
    percent_change_24h: f64,
    volume_24h: f64,
    close: f64,
    market_cap_rank: i64,
});

upstream_object!(StockTimeSeriesItem {
    time: i64,
    open: f64,
    close: f64,
    high: f64,
    low: f64,
    market_cap: f64,
    contributors_active: i64,
    contributors_created: i64,
    interactions: f64,
    posts_active: i64,
    posts_created: i64,
    sentiment: f64,
    spam: i64,
    alt_rank: i64,
    galaxy_score: f64,
    market_dominance: f64,
    social_dominance: f64,
});
