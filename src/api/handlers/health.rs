use super::request_id;
use crate::{
    services::{auth::client_ip, health::check_cache, perform_health_check},
    state::AppState,
};
use axum::{
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::{net::SocketAddr, time::Instant};

const FEATURES: [&str; 6] = [
    "graphql",
    "caching",
    "rate-limiting",
    "authentication",
    "charts",
    "metrics",
];

/// Full health report with client and request details
pub async fn health_check(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Response {
    let started = Instant::now();
    let services = &state.services;
    let report = perform_health_check(
        &services.config,
        services.cache.store().as_ref(),
        services.started_at,
    )
    .await;

    let mut body = serde_json::to_value(&report).unwrap_or_else(|_| json!({}));
    if let Value::Object(map) = &mut body {
        if !services.config.has_api_key() {
            map.insert("status".into(), json!("degraded"));
            map.insert("error".into(), json!("API key not configured"));
        }
        map.insert("requestId".into(), json!(request_id(&headers)));
        map.insert(
            "responseTime".into(),
            json!(started.elapsed().as_millis() as u64),
        );
        map.insert(
            "client".into(),
            json!({
                "ip": client_ip(&headers, connect_info.map(|info| info.0)),
                "userAgent": headers
                    .get(header::USER_AGENT)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown"),
            }),
        );
        map.insert("features".into(), json!(FEATURES));
    }

    (
        StatusCode::OK,
        [(header::CACHE_CONTROL, "max-age=30")],
        Json(body),
    )
        .into_response()
}

/// Ready once the API key is configured and the cache answers
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let api_key = state.config().has_api_key();
    let cache = check_cache(state.services.cache.store().as_ref())
        .await
        .error
        .is_none();

    let (status, label) = if api_key && cache {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not-ready")
    };

    (
        status,
        Json(json!({
            "status": label,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "checks": { "apiKey": api_key, "cache": cache },
        })),
    )
}

pub async fn liveness() -> Json<Value> {
    Json(json!({
        "status": "alive",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

pub async fn ping() -> &'static str {
    "OK"
}
