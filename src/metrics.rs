//! Prometheus metrics for the gateway.
//!
//! The recorder is installed once in `main`. Handlers and services only call
//! the small recording helpers below, so metric names live in one place.

use crate::{errors::ApiError, Result};
use axum::{
    extract::MatchedPath,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION: &str = "http_request_duration_seconds";
pub const UPSTREAM_REQUESTS_TOTAL: &str = "lunarcrush_upstream_requests_total";
pub const CACHE_LOOKUPS_TOTAL: &str = "cache_lookups_total";

/// Installs the global Prometheus recorder and returns the render handle
pub fn install_recorder() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ApiError::Custom(format!("Failed to install Prometheus recorder: {e}")))
}

/// Handle backed by a recorder that is not installed globally
#[cfg(test)]
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}

pub fn record_upstream(endpoint: &str, outcome: &'static str) {
    metrics::counter!(
        UPSTREAM_REQUESTS_TOTAL,
        "endpoint" => endpoint.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_cache(result: &'static str) {
    metrics::counter!(CACHE_LOOKUPS_TOTAL, "result" => result).increment(1);
}

/// Counts every request and records its latency, labelled by route template
pub async fn track_requests<B>(req: Request<B>, next: Next<B>) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;

    let status = response.status().as_u16().to_string();
    metrics::counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status
    )
    .increment(1);
    metrics::histogram!(HTTP_REQUEST_DURATION, "method" => method, "path" => path)
        .record(start.elapsed().as_secs_f64());

    response.into_response()
}
