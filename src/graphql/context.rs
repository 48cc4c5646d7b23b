use crate::{
    cache::CacheTtl,
    services::{Caller, RateLimitDecision},
};

/// Per-request data handed to resolvers alongside the shared services
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub client_ip: String,
    pub caller: Caller,
    pub cache_ttl: CacheTtl,
    pub rate_limit: Option<RateLimitDecision>,
}

impl RequestContext {
    /// Context for executions that did not come through the HTTP layer
    pub fn anonymous(default_ttl: u64) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            client_ip: "unknown".to_string(),
            caller: Caller::demo("unknown"),
            cache_ttl: CacheTtl::Ttl(default_ttl),
            rate_limit: None,
        }
    }
}
