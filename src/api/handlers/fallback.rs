use super::request_id;
use axum::{
    http::{HeaderMap, Method, StatusCode, Uri},
    Json,
};
use serde_json::{json, Value};

const SUGGESTIONS: [&str; 4] = [
    "POST /graphql for data queries",
    "GET /graphql for the GraphiQL explorer",
    "GET /health for service status",
    "GET / for the endpoint index",
];

pub async fn not_found(method: Method, uri: Uri, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": {
                "type": "NOT_FOUND",
                "message": format!("Route {} {} not found", method, uri.path()),
                "code": "E404",
                "path": uri.path(),
                "method": method.as_str(),
            },
            "suggestions": SUGGESTIONS,
            "meta": {
                "requestId": request_id(&headers),
                "timestamp": chrono::Utc::now().to_rfc3339(),
            },
        })),
    )
}
