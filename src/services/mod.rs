pub mod auth;
pub mod charts;
pub mod health;
pub mod lunarcrush;
pub mod mcp;
pub mod rate_limit;

pub use auth::{identify_caller, Caller, CallerKind};
pub use charts::ChartService;
pub use health::perform_health_check;
pub use lunarcrush::LunarCrushClient;
pub use mcp::McpService;
pub use rate_limit::{RateLimitDecision, RateLimiter};
