use super::handlers::{error_response, request_id};
use crate::{
    cache::CacheTtl,
    graphql::RequestContext,
    services::{auth::header_str, auth::client_ip, identify_caller, RateLimitDecision},
    state::AppState,
};
use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use uuid::Uuid;

pub const RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";
pub const REQUEST_ID: &str = "x-request-id";

/// Drops an inbound request id that is not a UUID so a fresh one is minted
pub async fn discard_foreign_request_id<B>(mut req: Request<B>, next: Next<B>) -> Response {
    let foreign = req
        .headers()
        .get(REQUEST_ID)
        .map(|value| {
            value
                .to_str()
                .ok()
                .and_then(|id| Uuid::parse_str(id).ok())
                .is_none()
        })
        .unwrap_or(false);
    if foreign {
        tracing::debug!("Discarding malformed inbound request id");
        req.headers_mut().remove(REQUEST_ID);
    }
    next.run(req).await
}

fn apply_rate_limit_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(decision.remaining));
    if let Ok(reset) = HeaderValue::from_str(&decision.reset_at.to_rfc3339()) {
        headers.insert(RATE_LIMIT_RESET, reset);
    }
}

/// Identifies the caller, applies the tiered rate limit and hands the
/// resulting [`RequestContext`] to the GraphQL handlers
pub async fn gateway_context<B>(
    State(state): State<AppState>,
    mut req: Request<B>,
    next: Next<B>,
) -> Response
where
    B: Send,
{
    let connect_info = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let headers = req.headers();
    let ip = client_ip(headers, connect_info);
    let caller = identify_caller(req.method(), headers, &ip, state.config());
    let request_id = request_id(headers);
    let cache_ttl = CacheTtl::from_header(
        header_str(headers, "x-cache-ttl"),
        state.config().cache_default_ttl,
    );

    // The limiter fails open: a cache outage must not take the API down
    let decision = match state.rate_limiter.check(&caller, chrono::Utc::now()).await {
        Ok(decision) => Some(decision),
        Err(err) => {
            tracing::warn!("Rate limit check failed, allowing request: {}", err);
            None
        }
    };

    if let Some(decision) = decision.as_ref().filter(|d| !d.allowed) {
        tracing::info!("Rate limit exceeded for {}", caller.id);
        let mut response = error_response(decision.rejection(caller.kind), &request_id);
        apply_rate_limit_headers(response.headers_mut(), decision);
        return response;
    }

    req.extensions_mut().insert(RequestContext {
        request_id,
        client_ip: ip,
        caller,
        cache_ttl,
        rate_limit: decision.clone(),
    });

    let mut response = next.run(req).await;
    if let Some(decision) = &decision {
        apply_rate_limit_headers(response.headers_mut(), decision);
    }
    response
}
