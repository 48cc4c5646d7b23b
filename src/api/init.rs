use crate::{metrics::track_requests, state::AppState, validation::MAX_BODY_BYTES};
use axum::{
    error_handling::HandleErrorLayer,
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware,
    routing::{get, post},
    BoxError, Router,
};
use std::time::Duration;
use tower::{buffer::BufferLayer, limit::RateLimitLayer, ServiceBuilder};
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use super::{
    handlers::*,
    index::{api_spec, index},
    middleware::{
        discard_foreign_request_id, gateway_context, RATE_LIMIT_LIMIT, RATE_LIMIT_REMAINING,
        RATE_LIMIT_RESET,
    },
};

/// Matches an origin against the configured list, `*` matching any run of characters
pub fn origin_allowed(patterns: &[String], origin: &str) -> bool {
    patterns.iter().any(|pattern| match pattern.split_once('*') {
        None => pattern == origin,
        Some((prefix, suffix)) => {
            origin.len() >= prefix.len() + suffix.len()
                && origin.starts_with(prefix)
                && origin.ends_with(suffix)
        }
    })
}

fn cors_layer(origins: Vec<String>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            origin
                .to_str()
                .map(|origin| origin_allowed(&origins, origin))
                .unwrap_or(false)
        }))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            HeaderName::from_static("x-api-key"),
            HeaderName::from_static("x-cache-ttl"),
            HeaderName::from_static("x-client-version"),
            HeaderName::from_static("x-request-id"),
        ])
        .expose_headers([
            HeaderName::from_static(RATE_LIMIT_LIMIT),
            HeaderName::from_static(RATE_LIMIT_REMAINING),
            HeaderName::from_static(RATE_LIMIT_RESET),
            HeaderName::from_static("x-request-id"),
        ])
        .allow_credentials(true)
        .max_age(Duration::from_secs(86400))
}

pub fn initialize_router(state: AppState) -> Router {
    let error_handler = || {
        ServiceBuilder::new().layer(HandleErrorLayer::new(|err: BoxError| async move {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Unhandled error: {}", err),
            )
        }))
    };

    let global_rate_limit = |req_per_sec: u64| {
        ServiceBuilder::new()
            .layer(error_handler())
            .layer(BufferLayer::new(1024))
            .layer(RateLimitLayer::new(req_per_sec, Duration::from_secs(1)))
    };

    let rate_limit_per_ip = |timeout: u64, limit: u32| {
        let config = Box::new(
            GovernorConfigBuilder::default()
                .per_second(timeout)
                .burst_size(limit)
                .use_headers()
                .key_extractor(SmartIpKeyExtractor)
                .finish()
                .expect("governor period and burst are non-zero"),
        );

        ServiceBuilder::new()
            .layer(error_handler())
            .layer(GovernorLayer {
                config: Box::leak(config),
            })
    };

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().include_headers(true))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // GraphQL gets caller identification and the tiered limiter on top of the per-IP guard
    let graphql_routes = Router::new()
        .route("/graphql", get(graphiql).post(graphql_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            gateway_context,
        ));

    Router::new()
        .merge(graphql_routes)
        .route("/auth/demo-token", post(create_demo_token))
        .route("/charts/types", get(get_chart_types))
        .route("/charts/batch", post(generate_chart_batch))
        .route("/charts/preview/:symbol/:chart_type", get(chart_preview))
        .route("/charts/:symbol/:chart_type", get(generate_chart))
        .route(
            "/charts/:symbol/:chart_type/:timeframe",
            get(generate_chart_with_timeframe),
        )
        .route("/api/validate/topic", post(validate_topic))
        .route("/mcp/tools", get(list_tools))
        .route("/mcp/call", post(call_tool))
        .layer(
            global_rate_limit(1000)
                .layer(rate_limit_per_ip(1, 100)),
        )
        // Documentation and probes
        .route("/", get(|| async { index() }))
        .route("/api-spec.json", get(|| async { api_spec() }))
        .route("/health", get(health_check))
        .route("/ready", get(readiness))
        .route("/healthz", get(liveness))
        .route("/ping", get(ping))
        .route("/metrics", get(render_metrics))
        .fallback(not_found)
        // Apply common middleware
        .layer(middleware::from_fn(track_requests))
        .layer(CompressionLayer::new().zstd(true))
        .layer(cors_layer(state.config().cors_origins()))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(trace_layer)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(middleware::from_fn(discard_foreign_request_id))
        .with_state(state)
}
