use super::JsonValue;

upstream_object!(CoinListItem {
    id: i64,
    symbol: String,
    name: String,
    price: f64,
    price_btc: f64,
    volume_24h: f64,
    volatility: f64,
    circulating_supply: f64,
    max_supply: f64,
    percent_change_1h: f64,
    percent_change_24h: f64,
    percent_change_7d: f64,
    percent_change_30d: f64,
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
    blockchains: Vec<JsonValue>,
    last_updated_price: i64,
    last_updated_price_by: String,
    topic: String,
    logo: String,
});

upstream_object!(CoinDetails {
    id: i64,
    name: String,
    symbol: String,
    price: f64,
    price_btc: f64,
    market_cap: f64,
    percent_change_24h: f64,
    percent_change_7d: f64,
    percent_change_30d: f64,
    volume_24h: f64,
    max_supply: f64,
    circulating_supply: f64,
    close: f64,
    galaxy_score: f64,
    alt_rank: i64,
    volatility: f64,
    market_cap_rank: i64,
});

upstream_object!(Blockchain {
    network: String,
    address: String,
    decimals: i64,
    #[serde(rename = "type")]
    #[graphql(name = "type")]
    kind: String,
});

upstream_object!(CoinMeta {
    id: i64,
    name: String,
    symbol: String,
    market_categories: Vec<String>,
    updated: i64,
    blockchain: Vec<Blockchain>,
    short_summary: String,
    description: String,
    github_link: String,
    website_link: String,
    whitepaper_link: String,
    twitter_link: String,
    reddit_link: String,
    header_image: String,
    header_text: String,
    videos: Vec<JsonValue>,
    coingecko_link: String,
    coinmarketcap_link: String,
    telegram_link: String,
    forum_link: String,
    wikipedia_link: String,
    overview_promotion: String,
    sections_order: Vec<String>,
});

/// Coin time series rows have the same columns as topic rows
pub type CoinTimeSeriesItem = super::TopicTimeSeriesItem;
