use super::{rejection, request_id};
use crate::validation::validate_topic_fields;
use axum::{
    extract::{rejection::JsonRejection, Query},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

#[derive(Debug, Deserialize, Serialize)]
pub struct TopicPayload {
    pub topic: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn header_problem(headers: &HeaderMap) -> Option<&'static str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer "));
    if !bearer {
        return Some("authorization header must be a Bearer token");
    }

    let json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"));
    if !json {
        return Some("content-type must be application/json");
    }
    None
}

/// Checks body, headers and query of a topic submission in one pass
///
/// # Endpoint: POST /api/validate/topic
pub async fn validate_topic(
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: std::result::Result<Json<TopicPayload>, JsonRejection>,
) -> Response {
    let request_id = request_id(&headers);

    let payload = match body {
        Ok(Json(payload)) => payload,
        Err(err) => {
            return rejection(
                StatusCode::BAD_REQUEST,
                "validation_error",
                err.body_text(),
                &request_id,
            )
        }
    };
    if let Err(err) = validate_topic_fields(&payload.topic, &payload.category) {
        return rejection(
            StatusCode::BAD_REQUEST,
            "validation_error",
            err.to_string(),
            &request_id,
        );
    }
    if let Some(problem) = header_problem(&headers) {
        return rejection(
            StatusCode::BAD_REQUEST,
            "validation_error",
            problem.to_string(),
            &request_id,
        );
    }
    let include_raw = match query.get("includeRaw").map(String::as_str) {
        None | Some("") | Some("false") => false,
        Some("true") => true,
        Some(_) => {
            return (StatusCode::BAD_REQUEST, "includeRaw must be true or false").into_response()
        }
    };

    Json(json!({
        "message": "Multi-target validation successful!",
        "validated": {
            "json": payload,
            "headers": ["authorization", "content-type"],
            "query": { "includeRaw": include_raw },
        },
        "requestId": request_id,
    }))
    .into_response()
}
