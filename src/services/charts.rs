use crate::{
    cache::{CacheService, CacheTtl},
    errors::ApiError,
    models::{ChartBatchResponse, ChartRequestInput, ChartResponse, CoinTimeSeriesItem},
    services::lunarcrush::{LunarCrushClient, TimeSeriesParams},
    Result,
};
use async_graphql::Json;
use chrono::{TimeZone, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{fmt, str::FromStr, sync::Arc};

const CHART_TTL_SECS: u64 = 300;
const DEFAULT_WIDTH: u32 = 800;
const DEFAULT_HEIGHT: u32 = 400;
const VOLUME_HEIGHT: u32 = 300;
/// Most charts a single batch request may ask for
pub const MAX_BATCH_CHARTS: usize = 5;

/// Rejects batches over [`MAX_BATCH_CHARTS`]
pub fn check_batch_size(len: usize) -> Result<()> {
    if len > MAX_BATCH_CHARTS {
        return Err(ApiError::Validation(format!(
            "Maximum {MAX_BATCH_CHARTS} charts per batch request"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Price,
    Volume,
    Social,
    Sentiment,
}

impl ChartKind {
    pub const ALL: [ChartKind; 4] = [
        ChartKind::Price,
        ChartKind::Volume,
        ChartKind::Social,
        ChartKind::Sentiment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Price => "price",
            ChartKind::Volume => "volume",
            ChartKind::Social => "social",
            ChartKind::Sentiment => "sentiment",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            ChartKind::Price => "Price movement over time",
            ChartKind::Volume => "Trading volume over time",
            ChartKind::Social => "Social media activity and mentions",
            ChartKind::Sentiment => "Social sentiment analysis over time",
        }
    }

    fn default_timeframes(&self) -> &'static [&'static str] {
        match self {
            ChartKind::Price | ChartKind::Volume => &["1h", "1d", "1w", "1m"],
            ChartKind::Social | ChartKind::Sentiment => &["1d", "1w", "1m"],
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartKind {
    type Err = ApiError;

    fn from_str(value: &str) -> Result<Self> {
        ChartKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| ApiError::Validation(format!("Unsupported chart type: {value}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timeframe {
    OneHour,
    #[default]
    OneDay,
    OneWeek,
    OneMonth,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::OneHour => "1h",
            Timeframe::OneDay => "1d",
            Timeframe::OneWeek => "1w",
            Timeframe::OneMonth => "1m",
        }
    }

    /// Upstream bucket size
    pub fn bucket(&self) -> &'static str {
        match self {
            Timeframe::OneHour => "hour",
            _ => "day",
        }
    }

    /// Upstream lookback interval
    pub fn interval(&self) -> &'static str {
        match self {
            Timeframe::OneHour => "1d",
            Timeframe::OneDay => "1w",
            Timeframe::OneWeek => "1m",
            Timeframe::OneMonth => "3m",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = ApiError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim() {
            "1h" => Ok(Timeframe::OneHour),
            "1d" => Ok(Timeframe::OneDay),
            "1w" => Ok(Timeframe::OneWeek),
            "1m" => Ok(Timeframe::OneMonth),
            other => Err(ApiError::Validation(format!("Unsupported timeframe: {other}"))),
        }
    }
}

/// Renderer-agnostic chart description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    #[serde(rename = "type")]
    pub chart_type: String,
    pub title: String,
    pub data: Vec<Value>,
    pub x_field: String,
    pub y_field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_field: Option<String>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Default)]
pub struct ChartOverrides {
    pub title: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    pub symbol: String,
    pub chart_type: String,
    pub timeframe: String,
    pub generated_at: String,
    pub data_points: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedChart {
    pub chart: ChartConfig,
    pub metadata: ChartMetadata,
}

impl GeneratedChart {
    fn apply(mut self, overrides: &ChartOverrides) -> Self {
        if let Some(title) = overrides.title.as_ref().filter(|t| !t.trim().is_empty()) {
            self.chart.title = title.clone();
        }
        if let Some(width) = overrides.width.filter(|w| *w > 0) {
            self.chart.width = width;
        }
        if let Some(height) = overrides.height.filter(|h| *h > 0) {
            self.chart.height = height;
        }
        self
    }

    pub fn chart_url(&self) -> String {
        format!(
            "/charts/{}/{}?timeframe={}",
            self.metadata.symbol, self.metadata.chart_type, self.metadata.timeframe
        )
    }

    pub fn into_response(self) -> ChartResponse {
        let chart_url = self.chart_url();
        let metadata = serde_json::to_value(&self.chart).unwrap_or_default();
        ChartResponse {
            symbol: self.metadata.symbol,
            chart_type: self.metadata.chart_type,
            timeframe: self.metadata.timeframe,
            chart_url,
            data_points: self.metadata.data_points as i32,
            generated_at: self.metadata.generated_at,
            metadata: Json(metadata),
        }
    }
}

/// Supported chart kinds with their timeframes
pub fn supported_chart_types() -> Value {
    let mut types = serde_json::Map::new();
    for kind in ChartKind::ALL {
        types.insert(
            kind.as_str().to_string(),
            json!({
                "description": kind.description(),
                "defaultTimeframes": kind.default_timeframes(),
            }),
        );
    }
    Value::Object(types)
}

fn iso_time(time: Option<i64>) -> Value {
    time.and_then(|t| Utc.timestamp_opt(t, 0).single())
        .map(|t| Value::String(t.to_rfc3339()))
        .unwrap_or(Value::Null)
}

/// Maps a coin series onto the chart layout of `kind`
pub fn build_chart(kind: ChartKind, points: &[CoinTimeSeriesItem]) -> ChartConfig {
    let (chart_type, title, y_field, color_field, height) = match kind {
        ChartKind::Price => ("line", "Price Chart", "close", None, DEFAULT_HEIGHT),
        ChartKind::Volume => ("bar", "Volume Chart", "volume_24h", None, VOLUME_HEIGHT),
        ChartKind::Social => (
            "area",
            "Social Activity Chart",
            "posts_active",
            None,
            DEFAULT_HEIGHT,
        ),
        ChartKind::Sentiment => (
            "line",
            "Sentiment Chart",
            "sentiment",
            Some("sentiment".to_string()),
            DEFAULT_HEIGHT,
        ),
    };

    let data = points
        .iter()
        .map(|p| {
            let time = iso_time(p.time);
            match kind {
                ChartKind::Price => json!({
                    "time": time,
                    "close": p.close,
                    "volume_24h": p.volume_24h,
                }),
                ChartKind::Volume => json!({ "time": time, "volume_24h": p.volume_24h }),
                ChartKind::Social => json!({
                    "time": time,
                    "posts_active": p.posts_active.unwrap_or(0),
                    "interactions": p.interactions.unwrap_or(0.0),
                }),
                ChartKind::Sentiment => json!({
                    "time": time,
                    "sentiment": p.sentiment,
                    "posts_active": p.posts_active,
                }),
            }
        })
        .collect();

    ChartConfig {
        chart_type: chart_type.to_string(),
        title: title.to_string(),
        data,
        x_field: "time".to_string(),
        y_field: y_field.to_string(),
        color_field,
        width: DEFAULT_WIDTH,
        height,
    }
}

#[derive(Clone)]
pub struct ChartService {
    client: Arc<LunarCrushClient>,
    cache: CacheService,
}

impl ChartService {
    pub fn new(client: Arc<LunarCrushClient>, cache: CacheService) -> Self {
        Self { client, cache }
    }

    pub fn cache_key(symbol: &str, kind: ChartKind, timeframe: Timeframe) -> String {
        format!("chart:{symbol}:{kind}:{timeframe}")
    }

    pub async fn generate(
        &self,
        symbol: &str,
        kind: ChartKind,
        timeframe: Timeframe,
        overrides: &ChartOverrides,
    ) -> Result<GeneratedChart> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(ApiError::Validation("symbol parameter is required".to_string()));
        }

        let key = Self::cache_key(symbol, kind, timeframe);
        let generated = self
            .cache
            .get_or_fetch(&key, CacheTtl::Ttl(CHART_TTL_SECS), move || async move {
                let params = TimeSeriesParams {
                    bucket: Some(timeframe.bucket().to_string()),
                    interval: Some(timeframe.interval().to_string()),
                    ..Default::default()
                };
                let points = self.client.coin_time_series(symbol, &params).await?;
                let chart = build_chart(kind, &points);
                Ok(GeneratedChart {
                    metadata: ChartMetadata {
                        symbol: symbol.to_string(),
                        chart_type: kind.to_string(),
                        timeframe: timeframe.to_string(),
                        generated_at: Utc::now().to_rfc3339(),
                        data_points: chart.data.len(),
                    },
                    chart,
                })
            })
            .await?;

        Ok(generated.apply(overrides))
    }

    async fn generate_one(&self, request: &ChartRequestInput) -> Result<GeneratedChart> {
        let kind: ChartKind = request.chart_type.parse()?;
        let timeframe = match request.timeframe.as_deref() {
            Some(tf) => tf.parse()?,
            None => Timeframe::default(),
        };
        self.generate(&request.symbol, kind, timeframe, &ChartOverrides::default())
            .await
    }

    /// Generates every chart concurrently, a failure only marks its own entry
    pub async fn generate_many(
        &self,
        requests: &[ChartRequestInput],
    ) -> Result<Vec<Result<GeneratedChart>>> {
        check_batch_size(requests.len())?;
        Ok(join_all(requests.iter().map(|request| self.generate_one(request))).await)
    }

    pub async fn generate_batch(
        &self,
        requests: Vec<ChartRequestInput>,
    ) -> Result<Vec<ChartBatchResponse>> {
        let results = self.generate_many(&requests).await?;

        let responses = requests
            .into_iter()
            .zip(results)
            .map(|(request, result)| {
                let timeframe = request
                    .timeframe
                    .clone()
                    .unwrap_or_else(|| Timeframe::default().to_string());
                match result {
                    Ok(generated) => {
                        let response = generated.into_response();
                        ChartBatchResponse {
                            symbol: response.symbol,
                            chart_type: response.chart_type,
                            timeframe: response.timeframe,
                            success: true,
                            chart_url: Some(response.chart_url),
                            data_points: Some(response.data_points),
                            generated_at: response.generated_at,
                            metadata: Some(response.metadata),
                            error: None,
                        }
                    }
                    Err(err) => ChartBatchResponse {
                        symbol: request.symbol,
                        chart_type: request.chart_type,
                        timeframe,
                        success: false,
                        chart_url: None,
                        data_points: None,
                        generated_at: Utc::now().to_rfc3339(),
                        metadata: None,
                        error: Some(err.public_message()),
                    },
                }
            })
            .collect();
        Ok(responses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cache::MemoryCache, state::testing::spawn_upstream};
    use axum::{extract::RawQuery, routing::get, Router};
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    fn points() -> Vec<CoinTimeSeriesItem> {
        serde_json::from_value(json!([
            {
                "time": 1717200000, "close": 67000.5, "volume_24h": 1.5e10,
                "posts_active": 900, "interactions": 12000, "sentiment": 78
            },
            { "time": 1717286400, "close": 68000.0, "volume_24h": 1.7e10, "sentiment": 81 }
        ]))
        .unwrap()
    }

    #[test]
    fn test_parse_kinds_and_timeframes() {
        assert_eq!(assert_ok!("Price".parse::<ChartKind>()), ChartKind::Price);
        assert_err!("candles".parse::<ChartKind>());
        assert_eq!(assert_ok!("1w".parse::<Timeframe>()), Timeframe::OneWeek);
        assert_err!("5m".parse::<Timeframe>());

        assert_eq!(Timeframe::OneHour.bucket(), "hour");
        assert_eq!(Timeframe::OneHour.interval(), "1d");
        assert_eq!(Timeframe::OneMonth.bucket(), "day");
        assert_eq!(Timeframe::OneMonth.interval(), "3m");
    }

    #[test]
    fn test_supported_chart_types() {
        let types = supported_chart_types();
        assert_eq!(types["price"]["defaultTimeframes"], json!(["1h", "1d", "1w", "1m"]));
        assert_eq!(types["social"]["defaultTimeframes"], json!(["1d", "1w", "1m"]));
        assert_eq!(types["sentiment"]["description"], "Social sentiment analysis over time");
    }

    #[test]
    fn test_build_chart_layouts() {
        let price = build_chart(ChartKind::Price, &points());
        assert_eq!(price.chart_type, "line");
        assert_eq!(price.y_field, "close");
        assert_eq!(price.height, 400);
        assert_eq!(price.data[0]["time"], "2024-06-01T00:00:00+00:00");
        assert_eq!(price.data[1]["close"], json!(68000.0));

        let volume = build_chart(ChartKind::Volume, &points());
        assert_eq!(volume.chart_type, "bar");
        assert_eq!(volume.height, 300);

        let social = build_chart(ChartKind::Social, &points());
        assert_eq!(social.chart_type, "area");
        assert_eq!(social.data[1]["posts_active"], json!(0));

        let sentiment = build_chart(ChartKind::Sentiment, &points());
        assert_eq!(sentiment.color_field.as_deref(), Some("sentiment"));
        assert_eq!(sentiment.data[1]["sentiment"], json!(81.0));
    }

    async fn spawn_service() -> ChartService {
        let app = Router::new().route(
            "/coins/:coin/time-series/v2",
            get(|RawQuery(query): RawQuery| async move {
                assert_eq!(query.as_deref(), Some("bucket=day&interval=1w"));
                axum::Json(json!({ "data": [
                    { "time": 1717200000, "close": 1.0 },
                    { "time": 1717286400, "close": 2.0 },
                    { "time": 1717372800, "close": 3.0 }
                ]}))
            }),
        );
        let base_url = spawn_upstream(app).await;
        let client =
            LunarCrushClient::new(&base_url, "key-123456789", Duration::from_secs(5)).unwrap();
        ChartService::new(Arc::new(client), CacheService::new(Arc::new(MemoryCache::new())))
    }

    #[tokio::test]
    async fn test_generate_applies_overrides_after_cache() {
        let service = spawn_service().await;

        let plain = assert_ok!(
            service
                .generate("btc", ChartKind::Price, Timeframe::OneDay, &ChartOverrides::default())
                .await
        );
        assert_eq!(plain.metadata.data_points, 3);
        assert_eq!(plain.chart.title, "Price Chart");
        assert_eq!(plain.chart_url(), "/charts/btc/price?timeframe=1d");

        let custom = service
            .generate(
                "btc",
                ChartKind::Price,
                Timeframe::OneDay,
                &ChartOverrides {
                    title: Some("BTC".into()),
                    width: Some(1200),
                    height: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(custom.chart.title, "BTC");
        assert_eq!(custom.chart.width, 1200);
        assert_eq!(custom.chart.height, 400);
        assert_eq!(custom.metadata.generated_at, plain.metadata.generated_at);
    }

    #[tokio::test]
    async fn test_batch_reports_failures_per_item() {
        let service = spawn_service().await;
        let results = service
            .generate_batch(vec![
                ChartRequestInput {
                    symbol: "eth".into(),
                    chart_type: "price".into(),
                    timeframe: Some("1d".into()),
                },
                ChartRequestInput {
                    symbol: "eth".into(),
                    chart_type: "candles".into(),
                    timeframe: None,
                },
            ])
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results[0].success);
        assert_eq!(results[0].data_points, Some(3));
        assert!(!results[1].success);
        assert_eq!(
            results[1].error.as_deref(),
            Some("Unsupported chart type: candles")
        );
        assert_eq!(results[1].timeframe, "1d");
    }

    #[tokio::test]
    async fn test_batch_over_limit_is_rejected() {
        let service = spawn_service().await;
        let requests: Vec<ChartRequestInput> = (0..MAX_BATCH_CHARTS + 1)
            .map(|_| ChartRequestInput {
                symbol: "btc".into(),
                chart_type: "price".into(),
                timeframe: None,
            })
            .collect();

        let err = assert_err!(service.generate_batch(requests.clone()).await);
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(err.to_string(), "Maximum 5 charts per batch request");

        let at_limit = assert_ok!(service.generate_many(&requests[..MAX_BATCH_CHARTS]).await);
        assert_eq!(at_limit.len(), MAX_BATCH_CHARTS);
        assert!(at_limit.iter().all(|result| result.is_ok()));
    }
}
