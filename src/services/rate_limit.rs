use crate::{
    cache::CacheStore,
    errors::ApiError,
    services::auth::{Caller, CallerKind},
    Result,
};
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Length of one rate limit window
pub const WINDOW_SECS: i64 = 15 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub limit: u64,
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
    pub allowed: bool,
}

impl RateLimitDecision {
    /// Message shown when the caller is over the limit
    pub fn rejection(&self, kind: CallerKind) -> ApiError {
        let message = match kind {
            CallerKind::Demo => "Demo rate limit exceeded. Sign up for higher limits!",
            _ => "Rate limit exceeded. Please slow down.",
        };
        ApiError::RateLimited {
            message: message.to_string(),
            limit: self.limit,
        }
    }
}

/// Fixed window counter per caller, stored in the shared cache
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CacheStore>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    pub fn window_key(caller: &Caller, now: DateTime<Utc>) -> String {
        format!("ratelimit:{}:{}", caller.id, now.timestamp() / WINDOW_SECS)
    }

    fn window_reset(now: DateTime<Utc>) -> DateTime<Utc> {
        let next = (now.timestamp() / WINDOW_SECS + 1) * WINDOW_SECS;
        Utc.timestamp_opt(next, 0).single().unwrap_or(now)
    }

    /// Counts this request against the caller's current window
    pub async fn check(&self, caller: &Caller, now: DateTime<Utc>) -> Result<RateLimitDecision> {
        let limit = caller.kind.request_limit();
        let key = Self::window_key(caller, now);
        let count = self.store.incr(&key, WINDOW_SECS as u64).await?;
        let count = count.max(0) as u64;

        Ok(RateLimitDecision {
            limit,
            remaining: limit.saturating_sub(count),
            reset_at: Self::window_reset(now),
            allowed: count <= limit,
        })
    }
}
