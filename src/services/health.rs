use crate::{cache::CacheStore, config::Config};
use serde::Serialize;
use std::time::Instant;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckResult {
    fn healthy(started: Instant) -> Self {
        Self {
            status: HealthStatus::Healthy,
            response_time: Some(started.elapsed().as_millis() as u64),
            error: None,
        }
    }

    fn unhealthy(started: Instant, error: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            response_time: Some(started.elapsed().as_millis() as u64),
            error: Some(error.into()),
        }
    }

    fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Dependencies {
    pub lunarcrush: CheckResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthChecks {
    pub api: CheckResult,
    pub database: CheckResult,
    pub cache: CheckResult,
    pub dependencies: Dependencies,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: String,
    pub uptime: u64,
    pub version: String,
    pub environment: String,
    pub checks: HealthChecks,
}

fn check_lunarcrush(config: &Config) -> CheckResult {
    let started = Instant::now();
    if config.lunarcrush_api_key.trim().chars().count() < 10 {
        return CheckResult::unhealthy(started, "Invalid API key");
    }
    CheckResult::healthy(started)
}

fn check_database(config: &Config) -> CheckResult {
    let mut result = CheckResult::healthy(Instant::now());
    if config.database_url.is_none() {
        result.error = Some("Database not configured (optional)".to_string());
    }
    result
}

pub async fn check_cache(store: &dyn CacheStore) -> CheckResult {
    let started = Instant::now();
    match store.ping().await {
        Ok(()) => CheckResult::healthy(started),
        Err(err) => {
            tracing::warn!("Cache health check failed: {}", err);
            CheckResult::unhealthy(started, format!("{} cache unreachable", store.backend()))
        }
    }
}

/// Runs every check and folds them into one verdict
pub async fn perform_health_check(
    config: &Config,
    store: &dyn CacheStore,
    started_at: Instant,
) -> HealthReport {
    let api = CheckResult::healthy(Instant::now());
    let database = check_database(config);
    let cache = check_cache(store).await;
    let lunarcrush = check_lunarcrush(config);

    // A missing key or a dead cache degrades the service, anything else takes it down
    let status = if [&api, &database, &cache, &lunarcrush]
        .iter()
        .all(|check| check.is_healthy())
    {
        HealthStatus::Healthy
    } else if api.is_healthy() && database.is_healthy() {
        HealthStatus::Degraded
    } else {
        HealthStatus::Unhealthy
    };

    HealthReport {
        status,
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime: started_at.elapsed().as_secs(),
        version: VERSION.to_string(),
        environment: config.environment.clone(),
        checks: HealthChecks {
            api,
            database,
            cache,
            dependencies: Dependencies { lunarcrush },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cache::MemoryCache, cache::RedisCache};

    fn config_with_key(key: &str) -> Config {
        Config {
            lunarcrush_api_key: key.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_healthy_with_key_and_cache() {
        let report = perform_health_check(
            &config_with_key("abcdefghij123"),
            &MemoryCache::new(),
            Instant::now(),
        )
        .await;
        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.version, VERSION);
        assert_eq!(
            report.checks.database.error.as_deref(),
            Some("Database not configured (optional)")
        );
    }

    #[tokio::test]
    async fn test_missing_key_degrades() {
        let report =
            perform_health_check(&config_with_key(""), &MemoryCache::new(), Instant::now()).await;
        assert_eq!(report.status, HealthStatus::Degraded);
        assert_eq!(
            report.checks.dependencies.lunarcrush.status,
            HealthStatus::Unhealthy
        );
    }

    #[tokio::test]
    async fn test_dead_cache_degrades() {
        let store = RedisCache::new("redis://127.0.0.1:1/");
        let report =
            perform_health_check(&config_with_key("abcdefghij123"), &store, Instant::now()).await;
        assert_eq!(report.status, HealthStatus::Degraded);
        assert_eq!(
            report.checks.cache.error.as_deref(),
            Some("redis cache unreachable")
        );
    }

    #[test]
    fn test_report_serializes_lowercase() {
        let json = serde_json::to_value(HealthStatus::Degraded).unwrap();
        assert_eq!(json, serde_json::json!("degraded"));
    }
}
