use super::error_response;
use crate::{
    errors::ApiError,
    graphql::RequestContext,
    state::AppState,
    validation::{validate_content_type, validate_graphql_request},
};
use askama::Template;
use async_graphql_axum::GraphQLResponse;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method},
    response::{Html, IntoResponse, Response},
    Extension,
};
use serde_json::{json, Value};
use std::time::Instant;

fn extension(value: Value) -> async_graphql::Value {
    async_graphql::Value::from_json(value).unwrap_or_default()
}

/// Executes a GraphQL POST after the transport-level checks
pub async fn graphql_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let started = Instant::now();
    let request_id = context.request_id.clone();

    if let Err(err) = validate_content_type(&Method::POST, &headers) {
        return error_response(err, &request_id);
    }
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(_) => {
            return error_response(
                ApiError::Validation("Invalid GraphQL request: body must be valid JSON".into()),
                &request_id,
            )
        }
    };
    if let Err(err) = validate_graphql_request(&payload) {
        return error_response(err, &request_id);
    }
    let request: async_graphql::Request = match serde_json::from_value(payload) {
        Ok(request) => request,
        Err(err) => return error_response(ApiError::from(err), &request_id),
    };

    let rate_limit = context.rate_limit.as_ref().map(|decision| {
        json!({
            "limit": decision.limit,
            "remaining": decision.remaining,
            "resetTime": decision.reset_at.to_rfc3339(),
        })
    });
    let mut response = state.schema.execute(request.data(context)).await;

    response.extensions.insert(
        "performance".to_string(),
        extension(json!({ "responseTime": started.elapsed().as_millis() as u64 })),
    );
    response.extensions.insert(
        "gateway".to_string(),
        extension(json!({ "requestId": request_id, "rateLimit": rate_limit })),
    );

    GraphQLResponse::from(response).into_response()
}

#[derive(Template)]
#[template(path = "graphiql.html")]
struct GraphiqlPage {
    tier: String,
    limit: u64,
    request_id: String,
}

/// GraphiQL explorer, annotated with the caller's tier
pub async fn graphiql(Extension(context): Extension<RequestContext>) -> Response {
    let page = GraphiqlPage {
        tier: context.caller.kind.to_string(),
        limit: context.caller.kind.request_limit(),
        request_id: context.request_id.clone(),
    };
    match page.render() {
        Ok(html) => Html(html).into_response(),
        Err(err) => error_response(
            ApiError::Custom(format!("Failed to render GraphiQL: {err}")),
            &context.request_id,
        ),
    }
}
