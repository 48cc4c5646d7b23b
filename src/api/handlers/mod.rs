//! Request handlers for the gateway's REST and GraphQL endpoints.

pub mod auth; // Demo token issuance
pub mod charts; // Chart catalogue and generation
pub mod fallback;
pub mod graphql; // GraphQL execution and GraphiQL
pub mod health; // Liveness, readiness and health reports
pub mod mcp; // Tool discovery and execution for model clients
pub mod metrics;
pub mod validation;

pub(crate) use auth::create_demo_token;
pub(crate) use charts::{
    chart_preview, generate_chart, generate_chart_batch, generate_chart_with_timeframe,
    get_chart_types,
};
pub(crate) use fallback::not_found;
pub(crate) use graphql::{graphiql, graphql_handler};
pub(crate) use health::{health_check, liveness, ping, readiness};
pub(crate) use mcp::{call_tool, list_tools};
pub(crate) use metrics::render_metrics;
pub(crate) use validation::validate_topic;

use crate::{
    errors::{ApiError, ErrorMessages},
    services::auth::{extract_api_key, validate_key},
};
use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::collections::HashMap;

/// Request id set by the request-id layer, or a fresh one when it is
/// missing or not a UUID
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .filter(|value| uuid::Uuid::parse_str(value).is_ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// Error envelope tagged with the request id
pub fn error_response(err: ApiError, request_id: &str) -> Response {
    let status = err.status_code();
    if status.is_server_error() {
        tracing::error!("Request {} failed: {}", request_id, err);
    }
    (status, Json(err.into_envelope(Some(request_id.to_string())))).into_response()
}

/// Flat error body with a caller-facing code
pub fn rejection(status: StatusCode, code: &str, message: String, request_id: &str) -> Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message,
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "requestId": request_id,
        })),
    )
        .into_response()
}

/// Key from the headers or `api_key` query parameter, or the 401 to send back
pub fn require_api_key(
    headers: &HeaderMap,
    query: &HashMap<String, String>,
    request_id: &str,
) -> std::result::Result<String, Response> {
    let Some(key) = extract_api_key(headers, query) else {
        return Err(rejection(
            StatusCode::UNAUTHORIZED,
            "missing_api_key",
            ErrorMessages::MissingApiKey.to_string(),
            request_id,
        ));
    };
    let validation = validate_key(&key);
    if !validation.valid {
        return Err(rejection(
            StatusCode::UNAUTHORIZED,
            "invalid_api_key",
            validation.error.unwrap_or_else(|| "Invalid API key".to_string()),
            request_id,
        ));
    }
    Ok(key)
}
