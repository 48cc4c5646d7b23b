use super::{error_response, rejection, request_id, require_api_key};
use crate::{
    models::ChartRequestInput,
    services::charts::{
        supported_chart_types, ChartKind, ChartOverrides, Timeframe, MAX_BATCH_CHARTS,
    },
    state::AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::collections::HashMap;

const PREVIEW_WIDTH: u32 = 400;
const PREVIEW_HEIGHT: u32 = 200;

pub async fn get_chart_types() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": supported_chart_types(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

fn overrides_from(query: &HashMap<String, String>) -> ChartOverrides {
    ChartOverrides {
        title: query.get("title").cloned(),
        width: query.get("width").and_then(|w| w.parse().ok()),
        height: query.get("height").and_then(|h| h.parse().ok()),
    }
}

/// Parses the chart type and timeframe, then renders the chart envelope
async fn render_chart(
    state: &AppState,
    symbol: &str,
    chart_type: &str,
    timeframe: Option<&str>,
    overrides: ChartOverrides,
    request_id: &str,
) -> Response {
    let Ok(kind) = chart_type.parse::<ChartKind>() else {
        return rejection(
            StatusCode::BAD_REQUEST,
            "invalid_chart_type",
            format!(
                "Invalid chart type: {chart_type}. \
                 Supported types: price, volume, social, sentiment"
            ),
            request_id,
        );
    };
    let timeframe = match timeframe.map(str::parse::<Timeframe>) {
        None => Timeframe::default(),
        Some(Ok(tf)) => tf,
        Some(Err(err)) => {
            return rejection(
                StatusCode::BAD_REQUEST,
                "invalid_timeframe",
                err.to_string(),
                request_id,
            )
        }
    };

    match state
        .services
        .charts
        .generate(symbol, kind, timeframe, &overrides)
        .await
    {
        Ok(generated) => Json(json!({
            "success": true,
            "data": generated,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }))
        .into_response(),
        Err(err) => {
            tracing::warn!("Chart generation for {} failed: {}", symbol, err);
            error_response(err, request_id)
        }
    }
}

/// Generates one chart configuration, an API key is mandatory
pub async fn generate_chart(
    State(state): State<AppState>,
    Path((symbol, chart_type)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let request_id = request_id(&headers);
    if let Err(rejected) = require_api_key(&headers, &query, &request_id) {
        return rejected;
    }

    let timeframe = query.get("timeframe").map(String::as_str);
    render_chart(
        &state,
        &symbol,
        &chart_type,
        timeframe,
        overrides_from(&query),
        &request_id,
    )
    .await
}

/// Same as [`generate_chart`] with the timeframe taken from the path
pub async fn generate_chart_with_timeframe(
    State(state): State<AppState>,
    Path((symbol, chart_type, timeframe)): Path<(String, String, String)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let request_id = request_id(&headers);
    if let Err(rejected) = require_api_key(&headers, &query, &request_id) {
        return rejected;
    }

    render_chart(
        &state,
        &symbol,
        &chart_type,
        Some(&timeframe),
        overrides_from(&query),
        &request_id,
    )
    .await
}

/// Thumbnail-sized chart titled after the symbol
pub async fn chart_preview(
    State(state): State<AppState>,
    Path((symbol, chart_type)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let request_id = request_id(&headers);
    if let Err(rejected) = require_api_key(&headers, &query, &request_id) {
        return rejected;
    }

    let overrides = ChartOverrides {
        title: Some(format!("{} {}", symbol.to_uppercase(), chart_type)),
        width: Some(PREVIEW_WIDTH),
        height: Some(PREVIEW_HEIGHT),
    };
    let timeframe = query.get("timeframe").map(String::as_str);
    render_chart(&state, &symbol, &chart_type, timeframe, overrides, &request_id).await
}

fn invalid_batch(message: &str, request_id: &str) -> Response {
    rejection(
        StatusCode::BAD_REQUEST,
        "invalid_batch_request",
        message.to_string(),
        request_id,
    )
}

/// Up to five charts in one call, each entry succeeds or fails on its own
///
/// # Endpoint: POST /charts/batch
pub async fn generate_chart_batch(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Response {
    let request_id = request_id(&headers);
    if let Err(rejected) = require_api_key(&headers, &query, &request_id) {
        return rejected;
    }

    let Ok(Json(mut body)) = body else {
        return invalid_batch("Requests must be an array", &request_id);
    };
    let Some(entries) = body.get_mut("requests").map(Value::take).filter(Value::is_array) else {
        return invalid_batch("Requests must be an array", &request_id);
    };
    if entries.as_array().map_or(0, Vec::len) > MAX_BATCH_CHARTS {
        return rejection(
            StatusCode::BAD_REQUEST,
            "batch_limit_exceeded",
            format!("Maximum {MAX_BATCH_CHARTS} charts per batch request"),
            &request_id,
        );
    }
    let requests: Vec<ChartRequestInput> = match serde_json::from_value(entries) {
        Ok(requests) => requests,
        Err(err) => {
            return invalid_batch(&format!("Invalid chart request: {err}"), &request_id);
        }
    };

    let results = match state.services.charts.generate_many(&requests).await {
        Ok(results) => results,
        Err(err) => return error_response(err, &request_id),
    };
    let batch_results: Vec<Value> = results
        .into_iter()
        .map(|result| match result {
            Ok(generated) => json!({ "success": true, "data": generated }),
            Err(err) => json!({ "success": false, "error": err.public_message() }),
        })
        .collect();

    Json(json!({ "batch_results": batch_results })).into_response()
}
