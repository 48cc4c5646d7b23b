use crate::{
    cache::CacheTtl,
    errors::ApiError,
    graphql::RequestContext,
    models::*,
    services::{
        charts::{supported_chart_types, ChartKind, ChartOverrides, Timeframe},
        health::{perform_health_check, VERSION},
        lunarcrush::{ListParams, TimeSeriesParams},
        LunarCrushClient,
    },
    state::Services,
    validation::validate_input,
    Result,
};
use async_graphql::{Context, ErrorExtensions, Json, Object};
use serde::{de::DeserializeOwned, Serialize};
use std::{future::Future, sync::Arc};
use url::form_urlencoded::byte_serialize;

/// Longest identifier accepted in resolver arguments
const MAX_IDENTIFIER_LENGTH: usize = 100;
const DEFAULT_POST_TYPE: &str = "tweet";

type GqlResult<T> = async_graphql::Result<T>;

/// Trimmed, sanitized value of a mandatory argument
fn required(value: Option<String>, name: &str) -> GqlResult<String> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Validation(format!("{name} parameter is required")).extend())?;
    validate_input(&value, MAX_IDENTIFIER_LENGTH).map_err(|e| e.extend())
}

fn optional(value: Option<String>) -> GqlResult<Option<String>> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(|v| validate_input(&v, MAX_IDENTIFIER_LENGTH))
        .transpose()
        .map_err(|e| e.extend())
}

fn key_part(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

/// `op:part:part..` with every part percent-encoded, so a `:` inside an
/// argument cannot shift it into the next slot
fn cache_key(op: &str, parts: &[&str]) -> String {
    parts.iter().fold(op.to_string(), |mut key, part| {
        key.push(':');
        key.extend(byte_serialize(part.as_bytes()));
        key
    })
}

fn fetch_failed(what: &str, err: &ApiError) -> async_graphql::Error {
    async_graphql::Error::new(format!("Failed to fetch {what}: {err}"))
        .extend_with(|_, e| e.set("code", "UPSTREAM_ERROR"))
}

fn cache_ttl(ctx: &Context<'_>, services: &Services) -> CacheTtl {
    ctx.data_opt::<RequestContext>()
        .map(|request| request.cache_ttl)
        .unwrap_or(CacheTtl::Ttl(services.config.cache_default_ttl))
}

/// Serves `key` from the cache or fetches it upstream
async fn cached<T, F, Fut>(
    ctx: &Context<'_>,
    what: &str,
    key: String,
    fetch: F,
) -> GqlResult<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce(Arc<LunarCrushClient>) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let services = ctx.data::<Services>()?;
    let client = services.client.clone();
    services
        .cache
        .get_or_fetch(&key, cache_ttl(ctx, services), move || fetch(client))
        .await
        .map_err(|err| {
            tracing::warn!("Resolver for {} failed: {}", what, err);
            fetch_failed(what, &err)
        })
}

fn series_params(
    bucket: Option<String>,
    interval: Option<String>,
    start: Option<String>,
    end: Option<String>,
) -> GqlResult<TimeSeriesParams> {
    Ok(TimeSeriesParams {
        bucket: optional(bucket)?,
        interval: optional(interval)?,
        start: optional(start)?,
        end: optional(end)?,
    })
}

fn series_key(op: &str, ids: &[&str], params: &TimeSeriesParams) -> String {
    let mut parts = ids.to_vec();
    parts.extend([
        key_part(&params.bucket),
        key_part(&params.interval),
        key_part(&params.start),
        key_part(&params.end),
    ]);
    cache_key(op, &parts)
}

fn list_params(
    sort: Option<String>,
    filter: Option<String>,
    limit: Option<i64>,
    desc: Option<bool>,
    page: Option<i64>,
) -> GqlResult<ListParams> {
    Ok(ListParams {
        sort: optional(sort)?,
        filter: optional(filter)?,
        limit,
        desc,
        page,
    })
}

fn list_key(op: &str, params: &ListParams) -> String {
    let limit = params.limit.map(|v| v.to_string()).unwrap_or_default();
    let desc = params.desc.map(|v| v.to_string()).unwrap_or_default();
    let page = params.page.map(|v| v.to_string()).unwrap_or_default();
    cache_key(
        op,
        &[
            key_part(&params.sort),
            key_part(&params.filter),
            &limit,
            &desc,
            &page,
        ],
    )
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Full health report, serialized as JSON
    async fn health(&self, ctx: &Context<'_>) -> GqlResult<String> {
        let services = ctx.data::<Services>()?;
        let report = perform_health_check(
            &services.config,
            services.cache.store().as_ref(),
            services.started_at,
        )
        .await;
        serde_json::to_string(&report).map_err(|e| ApiError::from(e).extend())
    }

    async fn hello(&self) -> String {
        "Hello from the LunarCrush GraphQL gateway!".to_string()
    }

    async fn health_simple(&self) -> String {
        "OK".to_string()
    }

    async fn system_health(&self, ctx: &Context<'_>) -> GqlResult<SystemHealthResponse> {
        let services = ctx.data::<Services>()?;
        Ok(SystemHealthResponse {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime: services.started_at.elapsed().as_secs() as i64,
            version: VERSION.to_string(),
        })
    }

    async fn ping(&self) -> PingResponse {
        PingResponse {
            status: "ok".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    // Charts

    async fn chart_types(&self) -> JsonValue {
        Json(supported_chart_types())
    }

    async fn generate_chart(
        &self,
        ctx: &Context<'_>,
        symbol: String,
        chart_type: String,
        timeframe: Option<String>,
    ) -> GqlResult<ChartResponse> {
        let symbol = required(Some(symbol), "symbol")?;
        let kind = chart_type.parse::<ChartKind>().map_err(|e: ApiError| e.extend())?;
        let timeframe = match timeframe {
            Some(tf) => tf.parse::<Timeframe>().map_err(|e: ApiError| e.extend())?,
            None => Timeframe::default(),
        };

        let services = ctx.data::<Services>()?;
        let generated = services
            .charts
            .generate(&symbol, kind, timeframe, &ChartOverrides::default())
            .await
            .map_err(|err| fetch_failed("chart data", &err))?;
        Ok(generated.into_response())
    }

    async fn generate_chart_batch(
        &self,
        ctx: &Context<'_>,
        requests: Vec<ChartRequestInput>,
    ) -> GqlResult<Vec<ChartBatchResponse>> {
        let services = ctx.data::<Services>()?;
        services
            .charts
            .generate_batch(requests)
            .await
            .map_err(|err| err.extend())
    }

    // Topics

    async fn get_topics_list(&self, ctx: &Context<'_>) -> GqlResult<Vec<TopicListItem>> {
        cached(ctx, "topics list", "topics_list".to_string(), |client| async move {
            client.topics_list().await
        })
        .await
    }

    async fn get_topic(
        &self,
        ctx: &Context<'_>,
        topic: Option<String>,
    ) -> GqlResult<Option<TopicDetails>> {
        let topic = required(topic, "topic")?;
        let key = cache_key("topic", &[&topic]);
        cached(ctx, &format!("topic {topic}"), key, move |client| async move {
            client.topic(&topic).await
        })
        .await
    }

    async fn get_topic_whatsup(
        &self,
        ctx: &Context<'_>,
        topic: Option<String>,
    ) -> GqlResult<TopicWhatsup> {
        let topic = required(topic, "topic")?;
        let key = cache_key("topic_whatsup", &[&topic]);
        cached(ctx, "topic whatsup", key, move |client| async move {
            client.topic_whatsup(&topic).await
        })
        .await
    }

    async fn get_topic_time_series(
        &self,
        ctx: &Context<'_>,
        topic: Option<String>,
        bucket: Option<String>,
        interval: Option<String>,
        start: Option<String>,
        end: Option<String>,
    ) -> GqlResult<Vec<TopicTimeSeriesItem>> {
        let topic = required(topic, "topic")?;
        let params = series_params(bucket, interval, start, end)?;
        let key = series_key("topic_time_series", &[&topic], &params);
        cached(ctx, "topic time series", key, move |client| async move {
            client.topic_time_series(&topic, &params).await
        })
        .await
    }

    #[graphql(name = "getTopicTimeSeriesV2")]
    async fn get_topic_time_series_v2(
        &self,
        ctx: &Context<'_>,
        topic: Option<String>,
        bucket: Option<String>,
    ) -> GqlResult<Vec<TopicTimeSeriesItem>> {
        let topic = required(topic, "topic")?;
        let bucket = optional(bucket)?;
        let key = cache_key("topic_time_series_v2", &[&topic, key_part(&bucket)]);
        cached(ctx, "topic time series", key, move |client| async move {
            client.topic_time_series_v2(&topic, bucket).await
        })
        .await
    }

    async fn get_topic_posts(
        &self,
        ctx: &Context<'_>,
        topic: Option<String>,
        start: Option<String>,
        end: Option<String>,
    ) -> GqlResult<Vec<TopicPost>> {
        let topic = required(topic, "topic")?;
        let (start, end) = (optional(start)?, optional(end)?);
        let key = cache_key("topic_posts", &[&topic, key_part(&start), key_part(&end)]);
        cached(ctx, "topic posts", key, move |client| async move {
            client.topic_posts(&topic, start, end).await
        })
        .await
    }

    async fn get_topic_news(
        &self,
        ctx: &Context<'_>,
        topic: Option<String>,
    ) -> GqlResult<Vec<TopicNews>> {
        let topic = required(topic, "topic")?;
        let key = cache_key("topic_news", &[&topic]);
        cached(ctx, "topic news", key, move |client| async move {
            client.topic_news(&topic).await
        })
        .await
    }

    async fn get_topic_creators(
        &self,
        ctx: &Context<'_>,
        topic: Option<String>,
    ) -> GqlResult<Vec<TopicCreator>> {
        let topic = required(topic, "topic")?;
        let key = cache_key("topic_creators", &[&topic]);
        cached(ctx, "topic creators", key, move |client| async move {
            client.topic_creators(&topic).await
        })
        .await
    }

    // Categories

    async fn get_categories_list(&self, ctx: &Context<'_>) -> GqlResult<Vec<CategoryListItem>> {
        cached(ctx, "categories list", "categories_list".to_string(), |client| async move {
            client.categories_list().await
        })
        .await
    }

    async fn get_category(
        &self,
        ctx: &Context<'_>,
        category: Option<String>,
    ) -> GqlResult<Option<CategoryDetails>> {
        let category = required(category, "category")?;
        let key = cache_key("category", &[&category]);
        cached(ctx, &format!("category {category}"), key, move |client| async move {
            client.category(&category).await
        })
        .await
    }

    async fn get_category_topics(
        &self,
        ctx: &Context<'_>,
        category: Option<String>,
    ) -> GqlResult<Vec<CategoryTopic>> {
        let category = required(category, "category")?;
        let key = cache_key("category_topics", &[&category]);
        cached(ctx, "category topics", key, move |client| async move {
            client.category_topics(&category).await
        })
        .await
    }

    async fn get_category_time_series(
        &self,
        ctx: &Context<'_>,
        category: Option<String>,
        bucket: Option<String>,
        interval: Option<String>,
        start: Option<String>,
        end: Option<String>,
    ) -> GqlResult<Vec<CategoryTimeSeriesItem>> {
        let category = required(category, "category")?;
        let params = series_params(bucket, interval, start, end)?;
        let key = series_key("category_time_series", &[&category], &params);
        cached(ctx, "category time series", key, move |client| async move {
            client.category_time_series(&category, &params).await
        })
        .await
    }

    async fn get_category_posts(
        &self,
        ctx: &Context<'_>,
        category: Option<String>,
        start: Option<String>,
        end: Option<String>,
    ) -> GqlResult<Vec<CategoryPost>> {
        let category = required(category, "category")?;
        let (start, end) = (optional(start)?, optional(end)?);
        let key = cache_key(
            "category_posts",
            &[&category, key_part(&start), key_part(&end)],
        );
        cached(ctx, "category posts", key, move |client| async move {
            client.category_posts(&category, start, end).await
        })
        .await
    }

    async fn get_category_news(
        &self,
        ctx: &Context<'_>,
        category: Option<String>,
    ) -> GqlResult<Vec<CategoryNews>> {
        let category = required(category, "category")?;
        let key = cache_key("category_news", &[&category]);
        cached(ctx, "category news", key, move |client| async move {
            client.category_news(&category).await
        })
        .await
    }

    async fn get_category_creators(
        &self,
        ctx: &Context<'_>,
        category: Option<String>,
    ) -> GqlResult<Vec<CategoryCreator>> {
        let category = required(category, "category")?;
        let key = cache_key("category_creators", &[&category]);
        cached(ctx, "category creators", key, move |client| async move {
            client.category_creators(&category).await
        })
        .await
    }

    // Creators

    async fn get_creators_list(&self, ctx: &Context<'_>) -> GqlResult<Vec<CreatorListItem>> {
        cached(ctx, "creators list", "creators_list".to_string(), |client| async move {
            client.creators_list().await
        })
        .await
    }

    async fn get_creator(
        &self,
        ctx: &Context<'_>,
        network: Option<String>,
        id: Option<String>,
    ) -> GqlResult<Option<CreatorDetails>> {
        let network = required(network, "network")?;
        let id = required(id, "id")?;
        let key = cache_key("creator", &[&network, &id]);
        cached(ctx, "creator", key, move |client| async move {
            client.creator(&network, &id).await
        })
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn get_creator_time_series(
        &self,
        ctx: &Context<'_>,
        network: Option<String>,
        id: Option<String>,
        bucket: Option<String>,
        interval: Option<String>,
        start: Option<String>,
        end: Option<String>,
    ) -> GqlResult<Vec<CreatorTimeSeriesItem>> {
        let network = required(network, "network")?;
        let id = required(id, "id")?;
        let params = series_params(bucket, interval, start, end)?;
        let key = series_key("creator_time_series", &[&network, &id], &params);
        cached(ctx, "creator time series", key, move |client| async move {
            client.creator_time_series(&network, &id, &params).await
        })
        .await
    }

    async fn get_creator_posts(
        &self,
        ctx: &Context<'_>,
        network: Option<String>,
        id: Option<String>,
        start: Option<String>,
        end: Option<String>,
    ) -> GqlResult<Vec<CreatorPost>> {
        let network = required(network, "network")?;
        let id = required(id, "id")?;
        let (start, end) = (optional(start)?, optional(end)?);
        let key = cache_key(
            "creator_posts",
            &[&network, &id, key_part(&start), key_part(&end)],
        );
        cached(ctx, "creator posts", key, move |client| async move {
            client.creator_posts(&network, &id, start, end).await
        })
        .await
    }

    // Coins

    async fn get_coins_list(
        &self,
        ctx: &Context<'_>,
        sort: Option<String>,
        filter: Option<String>,
        limit: Option<i64>,
        desc: Option<bool>,
        page: Option<i64>,
    ) -> GqlResult<Vec<CoinListItem>> {
        let params = list_params(sort, filter, limit, desc, page)?;
        let key = list_key("coins_list", &params);
        cached(ctx, "coins list", key, move |client| async move {
            client.coins_list(&params).await
        })
        .await
    }

    #[graphql(name = "getCoinsListV2")]
    async fn get_coins_list_v2(
        &self,
        ctx: &Context<'_>,
        sort: Option<String>,
        filter: Option<String>,
        limit: Option<i64>,
        desc: Option<bool>,
        page: Option<i64>,
    ) -> GqlResult<Vec<CoinListItem>> {
        let params = list_params(sort, filter, limit, desc, page)?;
        let key = list_key("coins_list_v2", &params);
        cached(ctx, "coins list", key, move |client| async move {
            client.coins_list_v2(&params).await
        })
        .await
    }

    async fn get_coin(
        &self,
        ctx: &Context<'_>,
        symbol: Option<String>,
    ) -> GqlResult<Option<CoinDetails>> {
        let symbol = required(symbol, "symbol")?;
        let key = cache_key("coin", &[&symbol]);
        cached(ctx, &format!("coin {symbol}"), key, move |client| async move {
            client.coin(&symbol).await
        })
        .await
    }

    async fn get_coin_time_series(
        &self,
        ctx: &Context<'_>,
        symbol: Option<String>,
        bucket: Option<String>,
        interval: Option<String>,
        start: Option<String>,
        end: Option<String>,
    ) -> GqlResult<Vec<CoinTimeSeriesItem>> {
        let symbol = required(symbol, "symbol")?;
        let params = series_params(bucket, interval, start, end)?;
        let key = series_key("coin_time_series", &[&symbol], &params);
        cached(ctx, "coin time series", key, move |client| async move {
            client.coin_time_series(&symbol, &params).await
        })
        .await
    }

    async fn get_coin_meta(
        &self,
        ctx: &Context<'_>,
        symbol: Option<String>,
    ) -> GqlResult<Option<CoinMeta>> {
        let symbol = required(symbol, "symbol")?;
        let key = cache_key("coin_meta", &[&symbol]);
        cached(ctx, "coin meta", key, move |client| async move {
            client.coin_meta(&symbol).await
        })
        .await
    }

    // Stocks

    async fn get_stocks_list(
        &self,
        ctx: &Context<'_>,
        sort: Option<String>,
        limit: Option<i64>,
        desc: Option<bool>,
        page: Option<i64>,
    ) -> GqlResult<Vec<StockListItem>> {
        let params = list_params(sort, None, limit, desc, page)?;
        let key = list_key("stocks_list", &params);
        cached(ctx, "stocks list", key, move |client| async move {
            client.stocks_list(&params).await
        })
        .await
    }

    #[graphql(name = "getStocksListV2")]
    async fn get_stocks_list_v2(
        &self,
        ctx: &Context<'_>,
        sort: Option<String>,
        limit: Option<i64>,
        desc: Option<bool>,
        page: Option<i64>,
    ) -> GqlResult<Vec<StockListItem>> {
        let params = list_params(sort, None, limit, desc, page)?;
        let key = list_key("stocks_list_v2", &params);
        cached(ctx, "stocks list", key, move |client| async move {
            client.stocks_list_v2(&params).await
        })
        .await
    }

    async fn get_stock(
        &self,
        ctx: &Context<'_>,
        symbol: Option<String>,
    ) -> GqlResult<Option<StockDetails>> {
        let symbol = required(symbol, "symbol")?;
        let key = cache_key("stock", &[&symbol]);
        cached(ctx, &format!("stock {symbol}"), key, move |client| async move {
            client.stock(&symbol).await
        })
        .await
    }

    async fn get_stock_time_series(
        &self,
        ctx: &Context<'_>,
        symbol: Option<String>,
        bucket: Option<String>,
        interval: Option<String>,
        start: Option<String>,
        end: Option<String>,
    ) -> GqlResult<Vec<StockTimeSeriesItem>> {
        let symbol = required(symbol, "symbol")?;
        let params = series_params(bucket, interval, start, end)?;
        let key = series_key("stock_time_series", &[&symbol], &params);
        cached(ctx, "stock time series", key, move |client| async move {
            client.stock_time_series(&symbol, &params).await
        })
        .await
    }

    // NFTs

    async fn get_nfts_list(
        &self,
        ctx: &Context<'_>,
        sort: Option<String>,
        limit: Option<i64>,
        desc: Option<bool>,
        page: Option<i64>,
    ) -> GqlResult<Vec<NftListItem>> {
        let params = list_params(sort, None, limit, desc, page)?;
        let key = list_key("nfts_list", &params);
        cached(ctx, "NFTs list", key, move |client| async move {
            client.nfts_list(&params).await
        })
        .await
    }

    #[graphql(name = "getNftsListV2")]
    async fn get_nfts_list_v2(
        &self,
        ctx: &Context<'_>,
        sort: Option<String>,
        limit: Option<i64>,
        desc: Option<bool>,
        page: Option<i64>,
    ) -> GqlResult<Vec<NftListItem>> {
        let params = list_params(sort, None, limit, desc, page)?;
        let key = list_key("nfts_list_v2", &params);
        cached(ctx, "NFTs list", key, move |client| async move {
            client.nfts_list_v2(&params).await
        })
        .await
    }

    async fn get_nft(
        &self,
        ctx: &Context<'_>,
        id: Option<String>,
    ) -> GqlResult<Option<NftDetails>> {
        let id = required(id, "id")?;
        let key = cache_key("nft", &[&id]);
        cached(ctx, &format!("NFT {id}"), key, move |client| async move {
            client.nft(&id).await
        })
        .await
    }

    async fn get_nft_time_series(
        &self,
        ctx: &Context<'_>,
        id: Option<String>,
        bucket: Option<String>,
        interval: Option<String>,
        start: Option<String>,
        end: Option<String>,
    ) -> GqlResult<Vec<NftTimeSeriesItem>> {
        let id = required(id, "id")?;
        let params = series_params(bucket, interval, start, end)?;
        let key = series_key("nft_time_series", &[&id], &params);
        cached(ctx, "NFT time series", key, move |client| async move {
            client.nft_time_series(&id, &params).await
        })
        .await
    }

    #[graphql(name = "getNftTimeSeriesV1")]
    async fn get_nft_time_series_v1(
        &self,
        ctx: &Context<'_>,
        id: Option<String>,
    ) -> GqlResult<Vec<NftTimeSeriesItem>> {
        let id = required(id, "id")?;
        let key = cache_key("nft_time_series_v1", &[&id]);
        cached(ctx, "NFT time series", key, move |client| async move {
            Ok(client.nft_time_series_v1(&id).await)
        })
        .await
    }

    // System and search

    async fn get_system_changes(
        &self,
        ctx: &Context<'_>,
        start: Option<String>,
        end: Option<String>,
    ) -> GqlResult<Vec<SystemChange>> {
        let (start, end) = (optional(start)?, optional(end)?);
        let key = cache_key("system_changes", &[key_part(&start), key_part(&end)]);
        cached(ctx, "system changes", key, move |client| async move {
            client.system_changes(start, end).await
        })
        .await
    }

    async fn get_searches_list(&self, ctx: &Context<'_>) -> GqlResult<Vec<SearchItem>> {
        cached(ctx, "searches list", "searches_list".to_string(), |client| async move {
            client.searches_list().await
        })
        .await
    }

    async fn get_search(&self, ctx: &Context<'_>, id: Option<String>) -> GqlResult<SearchResult> {
        let id = required(id, "id")?;
        let key = cache_key("search", &[&id]);
        cached(ctx, "search", key, move |client| async move {
            Ok(client.search(&id).await)
        })
        .await
    }

    async fn search_posts(
        &self,
        ctx: &Context<'_>,
        term: Option<String>,
        search_json: Option<String>,
    ) -> GqlResult<Vec<SearchPost>> {
        let term = optional(term)?;
        // Raw JSON, sanitizing would mangle it
        let search_json = search_json.filter(|v| !v.trim().is_empty());
        if term.is_none() && search_json.is_none() {
            return Err(ApiError::Validation("term parameter is required".to_string()).extend());
        }
        let key = cache_key("search_posts", &[key_part(&term), key_part(&search_json)]);
        cached(ctx, "search posts", key, move |client| async move {
            Ok(client.search_posts(term, search_json).await)
        })
        .await
    }

    // Posts

    async fn get_post_details(
        &self,
        ctx: &Context<'_>,
        id: Option<String>,
        post_type: Option<String>,
    ) -> GqlResult<PostDetails> {
        let id = required(id, "id")?;
        let post_type = optional(post_type)?.unwrap_or_else(|| DEFAULT_POST_TYPE.to_string());
        let key = cache_key("post_details", &[&post_type, &id]);
        cached(ctx, "post details", key, move |client| async move {
            client.post_details(&post_type, &id).await
        })
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn get_post_time_series(
        &self,
        ctx: &Context<'_>,
        id: Option<String>,
        post_type: Option<String>,
        bucket: Option<String>,
        interval: Option<String>,
        start: Option<String>,
        end: Option<String>,
    ) -> GqlResult<Vec<PostTimeSeriesItem>> {
        let id = required(id, "id")?;
        let post_type = optional(post_type)?.unwrap_or_else(|| DEFAULT_POST_TYPE.to_string());
        let params = series_params(bucket, interval, start, end)?;
        let key = series_key("post_time_series", &[&post_type, &id], &params);
        cached(ctx, "post time series", key, move |client| async move {
            Ok(client.post_time_series(&post_type, &id, &params).await)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        cache::CacheTtl,
        graphql::RequestContext,
        state::testing::{spawn_upstream, state_for},
    };
    use async_graphql::Request;
    use axum::{
        extract::Path,
        http::StatusCode,
        routing::get,
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    async fn upstream(hits: Arc<AtomicUsize>) -> String {
        let app = Router::new()
            .route(
                "/topic/:topic/v1",
                get(move |Path(topic): Path<String>| {
                    let hits = hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        Json(json!({
                            "data": { "topic": topic, "title": "Bitcoin", "topic_rank": 1.0 }
                        }))
                    }
                }),
            )
            .route(
                "/coins/list/v2",
                get(|| async { (StatusCode::FORBIDDEN, "nope") }),
            )
            .route(
                "/coins/:coin/time-series/v2",
                get(|| async {
                    Json(json!({ "data": [
                        { "time": 1717200000, "close": 10.0, "sentiment": 70 },
                        { "time": 1717286400, "close": 12.0, "sentiment": 72 }
                    ]}))
                }),
            );
        spawn_upstream(app).await
    }

    fn data(response: &async_graphql::Response) -> Value {
        response.data.clone().into_json().unwrap()
    }

    fn error_code(response: &async_graphql::Response) -> Option<String> {
        response.errors.first().and_then(|err| {
            err.extensions
                .as_ref()
                .and_then(|ext| ext.get("code"))
                .map(|code| code.to_string().trim_matches('"').to_string())
        })
    }

    #[tokio::test]
    async fn test_get_topic_is_cached() {
        let hits = Arc::new(AtomicUsize::new(0));
        let state = state_for(&upstream(hits.clone()).await);
        let query = r#"{ getTopic(topic: "Bitcoin") { topic title topic_rank } }"#;

        let first = state.schema.execute(query).await;
        assert!(first.errors.is_empty(), "{:?}", first.errors);
        assert_eq!(
            data(&first)["getTopic"],
            json!({ "topic": "bitcoin", "title": "Bitcoin", "topic_rank": 1 })
        );

        let second = state.schema.execute(query).await;
        assert_eq!(data(&second), data(&first));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_bypass_ttl_skips_cache() {
        let hits = Arc::new(AtomicUsize::new(0));
        let state = state_for(&upstream(hits.clone()).await);
        let mut context = RequestContext::anonymous(120);
        context.cache_ttl = CacheTtl::Bypass;

        for _ in 0..2 {
            let request =
                Request::new(r#"{ getTopic(topic: "eth") { topic } }"#).data(context.clone());
            let response = state.schema.execute(request).await;
            assert!(response.errors.is_empty());
        }
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_missing_argument_is_bad_input() {
        let state = state_for(&upstream(Arc::new(AtomicUsize::new(0))).await);
        let response = state.schema.execute("{ getTopic { topic } }").await;
        assert_eq!(response.errors[0].message, "topic parameter is required");
        assert_eq!(error_code(&response).as_deref(), Some("BAD_USER_INPUT"));

        let long = "a".repeat(101);
        let response = state
            .schema
            .execute(format!(r#"{{ getCoin(symbol: "{long}") {{ symbol }} }}"#))
            .await;
        assert_eq!(
            response.errors[0].message,
            "Input too long. Maximum 100 characters allowed"
        );
    }

    #[tokio::test]
    async fn test_upstream_failure_is_reported() {
        let state = state_for(&upstream(Arc::new(AtomicUsize::new(0))).await);
        let response = state.schema.execute("{ getCoinsListV2 { symbol } }").await;
        assert_eq!(
            response.errors[0].message,
            "Failed to fetch coins list: 403 Forbidden: LunarCrush API error: 403 Forbidden"
        );
        assert_eq!(error_code(&response).as_deref(), Some("UPSTREAM_ERROR"));
    }

    #[tokio::test]
    async fn test_generate_chart() {
        let state = state_for(&upstream(Arc::new(AtomicUsize::new(0))).await);
        let response = state
            .schema
            .execute(
                r#"{ generateChart(symbol: "btc", chartType: "sentiment", timeframe: "1w") {
                    chartUrl dataPoints metadata } }"#,
            )
            .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        let chart = &data(&response)["generateChart"];
        assert_eq!(chart["chartUrl"], "/charts/btc/sentiment?timeframe=1w");
        assert_eq!(chart["dataPoints"], 2);
        assert_eq!(chart["metadata"]["colorField"], "sentiment");

        let response = state
            .schema
            .execute(r#"{ generateChart(symbol: "btc", chartType: "pie") { chartUrl } }"#)
            .await;
        assert_eq!(error_code(&response).as_deref(), Some("BAD_USER_INPUT"));
    }

    #[tokio::test]
    async fn test_simple_fields() {
        let state = state_for(&upstream(Arc::new(AtomicUsize::new(0))).await);
        let response = state
            .schema
            .execute("{ healthSimple ping { status } systemHealth { status version } chartTypes }")
            .await;
        let value = data(&response);
        assert_eq!(value["healthSimple"], "OK");
        assert_eq!(value["ping"]["status"], "ok");
        assert_eq!(value["systemHealth"]["version"], env!("CARGO_PKG_VERSION"));
        assert!(value["chartTypes"]["volume"].is_object());

        let response = state.schema.execute("{ health }").await;
        let report: Value =
            serde_json::from_str(data(&response)["health"].as_str().unwrap()).unwrap();
        assert_eq!(report["status"], "healthy");
    }

    #[test]
    fn test_cache_key_parts_cannot_collide() {
        assert_eq!(super::cache_key("topic", &["bitcoin"]), "topic:bitcoin");
        assert_ne!(
            super::cache_key("topic_posts", &["btc:day", "x"]),
            super::cache_key("topic_posts", &["btc", "day:x"])
        );
        assert_ne!(
            super::cache_key("search_posts", &["a b", ""]),
            super::cache_key("search_posts", &["a+b", ""])
        );

        let params = super::TimeSeriesParams {
            bucket: Some("day".into()),
            ..Default::default()
        };
        assert_eq!(
            super::series_key("creator_time_series", &["twitter", "elon:musk"], &params),
            "creator_time_series:twitter:elon%3Amusk:day:::"
        );
    }

    #[tokio::test]
    async fn test_generate_chart_batch_enforces_limit() {
        let state = state_for(&upstream(Arc::new(AtomicUsize::new(0))).await);
        let entry = r#"{ symbol: "btc", chartType: "price" }"#;
        let batch = |count: usize| {
            format!(
                "{{ generateChartBatch(requests: [{}]) {{ success dataPoints error }} }}",
                vec![entry; count].join(", ")
            )
        };

        let response = state.schema.execute(batch(6)).await;
        assert_eq!(
            response.errors[0].message,
            "Maximum 5 charts per batch request"
        );
        assert_eq!(error_code(&response).as_deref(), Some("BAD_USER_INPUT"));

        let response = state.schema.execute(batch(5)).await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        let results = data(&response)["generateChartBatch"].clone();
        assert_eq!(results.as_array().map(Vec::len), Some(5));
        assert_eq!(results[0]["success"], true);
    }
}
