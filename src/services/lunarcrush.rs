use crate::{
    config::Config,
    errors::ApiError,
    metrics::record_upstream,
    models::*,
    Result,
};
use reqwest::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Url,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

/// Standard `{ "data": ... }` wrapper around upstream payloads
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

/// Some endpoints answer with the envelope, others with the bare object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MaybeEnvelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> MaybeEnvelope<T> {
    fn into_inner(self) -> T {
        match self {
            MaybeEnvelope::Wrapped { data } => data,
            MaybeEnvelope::Bare(inner) => inner,
        }
    }
}

type Query = Vec<(&'static str, Option<String>)>;

/// Optional window for time series endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeSeriesParams {
    pub bucket: Option<String>,
    pub interval: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl TimeSeriesParams {
    fn query(&self) -> Query {
        vec![
            ("bucket", self.bucket.clone()),
            ("interval", self.interval.clone()),
            ("start", self.start.clone()),
            ("end", self.end.clone()),
        ]
    }
}

/// Sorting and paging for list endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    pub sort: Option<String>,
    pub filter: Option<String>,
    pub limit: Option<i64>,
    pub desc: Option<bool>,
    pub page: Option<i64>,
}

impl ListParams {
    fn query(&self) -> Query {
        vec![
            ("sort", self.sort.clone()),
            ("filter", self.filter.clone()),
            ("limit", self.limit.map(|v| v.to_string())),
            ("desc", self.desc.map(|v| v.to_string())),
            ("page", self.page.map(|v| v.to_string())),
        ]
    }
}

fn window(start: Option<String>, end: Option<String>) -> Query {
    vec![("start", start), ("end", end)]
}

/// Client for the LunarCrush v4 public API
#[derive(Debug, Clone)]
pub struct LunarCrushClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl LunarCrushClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.lunarcrush_base_url,
            &config.lunarcrush_api_key,
            Duration::from_secs(config.upstream_timeout_secs),
        )
    }

    fn build_url(&self, endpoint: &str, params: &[(&'static str, Option<String>)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, endpoint))
            .map_err(|e| ApiError::Custom(format!("Invalid upstream URL: {e}")))?;
        let present: Vec<(&str, &str)> = params
            .iter()
            .filter_map(|(key, value)| value.as_deref().map(|v| (*key, v)))
            .collect();
        if !present.is_empty() {
            url.query_pairs_mut().extend_pairs(present);
        }
        Ok(url)
    }

    /// Performs one authenticated GET and decodes the JSON body
    async fn request<T: DeserializeOwned>(
        &self,
        operation: &str,
        endpoint: &str,
        params: Query,
    ) -> Result<T> {
        let url = self.build_url(endpoint, &params)?;
        info!("LunarCrush API Request: {}", url.path());

        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| {
                record_upstream(operation, "error");
                ApiError::from(err)
            })?;

        let status = response.status();
        if !status.is_success() {
            record_upstream(operation, "http_error");
            warn!("{} failed with {}", operation, status);
            return Err(ApiError::Upstream {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        let body = response.json::<T>().await.map_err(|err| {
            record_upstream(operation, "decode_error");
            ApiError::from(err)
        })?;
        record_upstream(operation, "ok");
        Ok(body)
    }

    /// Requests an enveloped list, a missing `data` reads as empty
    async fn list<T: DeserializeOwned>(
        &self,
        operation: &str,
        endpoint: &str,
        params: Query,
    ) -> Result<Vec<T>> {
        let envelope: Envelope<Vec<T>> = self.request(operation, endpoint, params).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    /// Requests an enveloped object
    async fn item<T: DeserializeOwned>(
        &self,
        operation: &str,
        endpoint: &str,
    ) -> Result<Option<T>> {
        let envelope: Envelope<T> = self.request(operation, endpoint, Vec::new()).await?;
        Ok(envelope.data)
    }

    // Topics

    pub async fn topics_list(&self) -> Result<Vec<TopicListItem>> {
        self.list("topics_list", "/topics/list/v1", Vec::new()).await
    }

    pub async fn topic(&self, topic: &str) -> Result<Option<TopicDetails>> {
        self.item("topic", &format!("/topic/{}/v1", topic.to_lowercase()))
            .await
    }

    pub async fn topic_whatsup(&self, topic: &str) -> Result<TopicWhatsup> {
        let body: MaybeEnvelope<TopicWhatsup> = self
            .request(
                "topic_whatsup",
                &format!("/topic/{}/whatsup/v1", topic.to_lowercase()),
                Vec::new(),
            )
            .await?;
        Ok(body.into_inner())
    }

    pub async fn topic_time_series(
        &self,
        topic: &str,
        params: &TimeSeriesParams,
    ) -> Result<Vec<TopicTimeSeriesItem>> {
        self.list(
            "topic_time_series",
            &format!("/topic/{}/time-series/v1", topic.to_lowercase()),
            params.query(),
        )
        .await
    }

    pub async fn topic_time_series_v2(
        &self,
        topic: &str,
        bucket: Option<String>,
    ) -> Result<Vec<TopicTimeSeriesItem>> {
        self.list(
            "topic_time_series_v2",
            &format!("/topic/{}/time-series/v2", topic.to_lowercase()),
            vec![("bucket", bucket)],
        )
        .await
    }

    pub async fn topic_posts(
        &self,
        topic: &str,
        start: Option<String>,
        end: Option<String>,
    ) -> Result<Vec<TopicPost>> {
        self.list(
            "topic_posts",
            &format!("/topic/{}/posts/v1", topic.to_lowercase()),
            window(start, end),
        )
        .await
    }

    pub async fn topic_news(&self, topic: &str) -> Result<Vec<TopicNews>> {
        self.list(
            "topic_news",
            &format!("/topic/{}/news/v1", topic.to_lowercase()),
            Vec::new(),
        )
        .await
    }

    pub async fn topic_creators(&self, topic: &str) -> Result<Vec<TopicCreator>> {
        self.list(
            "topic_creators",
            &format!("/topic/{}/creators/v1", topic.to_lowercase()),
            Vec::new(),
        )
        .await
    }

    // Categories

    pub async fn categories_list(&self) -> Result<Vec<CategoryListItem>> {
        self.list("categories_list", "/categories/list/v1", Vec::new())
            .await
    }

    pub async fn category(&self, category: &str) -> Result<Option<CategoryDetails>> {
        self.item("category", &format!("/category/{category}/v1"))
            .await
    }

    pub async fn category_topics(&self, category: &str) -> Result<Vec<CategoryTopic>> {
        self.list(
            "category_topics",
            &format!("/category/{category}/topics/v1"),
            Vec::new(),
        )
        .await
    }

    pub async fn category_time_series(
        &self,
        category: &str,
        params: &TimeSeriesParams,
    ) -> Result<Vec<CategoryTimeSeriesItem>> {
        self.list(
            "category_time_series",
            &format!("/category/{category}/time-series/v1"),
            params.query(),
        )
        .await
    }

    pub async fn category_posts(
        &self,
        category: &str,
        start: Option<String>,
        end: Option<String>,
    ) -> Result<Vec<CategoryPost>> {
        self.list(
            "category_posts",
            &format!("/category/{category}/posts/v1"),
            window(start, end),
        )
        .await
    }

    pub async fn category_news(&self, category: &str) -> Result<Vec<CategoryNews>> {
        self.list(
            "category_news",
            &format!("/category/{category}/news/v1"),
            Vec::new(),
        )
        .await
    }

    pub async fn category_creators(&self, category: &str) -> Result<Vec<CategoryCreator>> {
        self.list(
            "category_creators",
            &format!("/category/{category}/creators/v1"),
            Vec::new(),
        )
        .await
    }

    // Creators

    pub async fn creators_list(&self) -> Result<Vec<CreatorListItem>> {
        self.list("creators_list", "/creators/list/v1", Vec::new())
            .await
    }

    pub async fn creator(&self, network: &str, id: &str) -> Result<Option<CreatorDetails>> {
        self.item("creator", &format!("/creator/{network}/{id}/v1"))
            .await
    }

    pub async fn creator_time_series(
        &self,
        network: &str,
        id: &str,
        params: &TimeSeriesParams,
    ) -> Result<Vec<CreatorTimeSeriesItem>> {
        self.list(
            "creator_time_series",
            &format!("/creator/{network}/{id}/time-series/v1"),
            params.query(),
        )
        .await
    }

    pub async fn creator_posts(
        &self,
        network: &str,
        id: &str,
        start: Option<String>,
        end: Option<String>,
    ) -> Result<Vec<CreatorPost>> {
        self.list(
            "creator_posts",
            &format!("/creator/{network}/{id}/posts/v1"),
            window(start, end),
        )
        .await
    }

    // Coins

    pub async fn coins_list(&self, params: &ListParams) -> Result<Vec<CoinListItem>> {
        self.list("coins_list", "/coins/list/v1", params.query())
            .await
    }

    pub async fn coins_list_v2(&self, params: &ListParams) -> Result<Vec<CoinListItem>> {
        self.list("coins_list_v2", "/coins/list/v2", params.query())
            .await
    }

    pub async fn coin(&self, coin: &str) -> Result<Option<CoinDetails>> {
        self.item("coin", &format!("/coins/{coin}/v1")).await
    }

    pub async fn coin_time_series(
        &self,
        coin: &str,
        params: &TimeSeriesParams,
    ) -> Result<Vec<CoinTimeSeriesItem>> {
        self.list(
            "coin_time_series",
            &format!("/coins/{coin}/time-series/v2"),
            params.query(),
        )
        .await
    }

    pub async fn coin_meta(&self, coin: &str) -> Result<Option<CoinMeta>> {
        self.item("coin_meta", &format!("/coins/{coin}/meta/v1"))
            .await
    }

    // Stocks

    pub async fn stocks_list(&self, params: &ListParams) -> Result<Vec<StockListItem>> {
        self.list("stocks_list", "/stocks/list/v1", without_filter(params))
            .await
    }

    pub async fn stocks_list_v2(&self, params: &ListParams) -> Result<Vec<StockListItem>> {
        self.list("stocks_list_v2", "/stocks/list/v2", without_filter(params))
            .await
    }

    pub async fn stock(&self, stock: &str) -> Result<Option<StockDetails>> {
        self.item("stock", &format!("/stocks/{stock}/v1")).await
    }

    pub async fn stock_time_series(
        &self,
        stock: &str,
        params: &TimeSeriesParams,
    ) -> Result<Vec<StockTimeSeriesItem>> {
        self.list(
            "stock_time_series",
            &format!("/stocks/{stock}/time-series/v2"),
            params.query(),
        )
        .await
    }

    // NFTs

    pub async fn nfts_list(&self, params: &ListParams) -> Result<Vec<NftListItem>> {
        self.list("nfts_list", "/nfts/list/v1", without_filter(params))
            .await
    }

    pub async fn nfts_list_v2(&self, params: &ListParams) -> Result<Vec<NftListItem>> {
        self.list("nfts_list_v2", "/nfts/list/v2", without_filter(params))
            .await
    }

    pub async fn nft(&self, nft: &str) -> Result<Option<NftDetails>> {
        self.item("nft", &format!("/nfts/{nft}/v1")).await
    }

    pub async fn nft_time_series(
        &self,
        nft: &str,
        params: &TimeSeriesParams,
    ) -> Result<Vec<NftTimeSeriesItem>> {
        self.list(
            "nft_time_series",
            &format!("/nfts/{nft}/time-series/v2"),
            params.query(),
        )
        .await
    }

    /// Legacy series, an upstream failure reads as no data
    pub async fn nft_time_series_v1(&self, nft: &str) -> Vec<NftTimeSeriesItem> {
        self.list(
            "nft_time_series_v1",
            &format!("/nfts/{nft}/time-series/v1"),
            Vec::new(),
        )
        .await
        .unwrap_or_else(|err| {
            warn!("nft_time_series_v1 for {} degraded to empty: {}", nft, err);
            Vec::new()
        })
    }

    // System and searches

    pub async fn system_changes(
        &self,
        start: Option<String>,
        end: Option<String>,
    ) -> Result<Vec<SystemChange>> {
        self.list("system_changes", "/system/changes", window(start, end))
            .await
    }

    pub async fn searches_list(&self) -> Result<Vec<SearchItem>> {
        self.list("searches_list", "/searches/list", Vec::new())
            .await
    }

    /// Saved search by slug, an empty result when the upstream has none
    pub async fn search(&self, slug: &str) -> SearchResult {
        let body: Result<MaybeEnvelope<SearchResult>> = self
            .request("search", &format!("/searches/{slug}"), Vec::new())
            .await;
        match body {
            Ok(body) => body.into_inner(),
            Err(err) => {
                warn!("search {} degraded to empty: {}", slug, err);
                SearchResult::empty(slug)
            }
        }
    }

    /// Full-text post search. Anything other than a list reads as no results
    pub async fn search_posts(
        &self,
        term: Option<String>,
        search_json: Option<String>,
    ) -> Vec<SearchPost> {
        let body: Result<Value> = self
            .request(
                "search_posts",
                "/searches/search",
                vec![("term", term), ("search_json", search_json)],
            )
            .await;

        let items = match body {
            Ok(Value::Array(items)) => items,
            Ok(Value::Object(mut map)) => match map.remove("data") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            Ok(_) => Vec::new(),
            Err(err) => {
                warn!("search_posts degraded to empty: {}", err);
                Vec::new()
            }
        };

        items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect()
    }

    // Posts

    pub async fn post_details(&self, post_type: &str, id: &str) -> Result<PostDetails> {
        let body: MaybeEnvelope<PostDetails> = self
            .request(
                "post_details",
                &format!("/posts/{post_type}/{id}/v1"),
                Vec::new(),
            )
            .await?;
        Ok(body.into_inner())
    }

    /// Interaction series of one post, an upstream failure reads as no data
    pub async fn post_time_series(
        &self,
        post_type: &str,
        id: &str,
        params: &TimeSeriesParams,
    ) -> Vec<PostTimeSeriesItem> {
        self.list(
            "post_time_series",
            &format!("/posts/{post_type}/{id}/time-series/v1"),
            params.query(),
        )
        .await
        .unwrap_or_else(|err| {
            warn!("post_time_series for {}/{} degraded to empty: {}", post_type, id, err);
            Vec::new()
        })
    }
}

/// Stock and NFT lists take no `filter`
fn without_filter(params: &ListParams) -> Query {
    params
        .query()
        .into_iter()
        .filter(|(key, _)| *key != "filter")
        .collect()
}
