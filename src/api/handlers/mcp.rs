use super::{rejection, request_id, require_api_key};
use crate::{
    services::mcp::{tool_catalogue, ToolCall},
    state::AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ToolCallRequest {
    pub name: Option<String>,
    pub arguments: Value,
}

/// # Endpoint: GET /mcp/tools
pub async fn list_tools() -> Json<Value> {
    Json(tool_catalogue())
}

/// Executes one tool against live LunarCrush data
///
/// # Endpoint: POST /mcp/call
pub async fn call_tool(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: std::result::Result<Json<ToolCallRequest>, JsonRejection>,
) -> Response {
    let request_id = request_id(&headers);
    if let Err(rejected) = require_api_key(&headers, &query, &request_id) {
        return rejected;
    }

    let request = match body {
        Ok(Json(request)) => request,
        Err(err) => {
            return rejection(
                StatusCode::BAD_REQUEST,
                "tool_execution_failed",
                err.body_text(),
                &request_id,
            )
        }
    };
    let call = match ToolCall::parse(request.name.as_deref(), &request.arguments) {
        Ok(call) => call,
        Err(err) => {
            return rejection(
                StatusCode::BAD_REQUEST,
                err.code(),
                err.to_string(),
                &request_id,
            )
        }
    };

    match state.services.mcp.execute(&call).await {
        Ok(result) => Json(json!({
            "result": result,
            "success": true,
            "toolName": call.name(),
        }))
        .into_response(),
        Err(err) => {
            tracing::warn!("Tool {} failed: {}", call.name(), err);
            rejection(
                err.status_code(),
                "tool_execution_failed",
                err.public_message(),
                &request_id,
            )
        }
    }
}
