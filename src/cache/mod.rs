//! Key-value cache with per-entry TTL.
//!
//! `RedisCache` is used when `REDIS_URL` is configured, `MemoryCache` otherwise.
//! Callers go through [`CacheService`], which owns the key prefix and the
//! fail-open policy.

pub mod memory;
pub mod redis;
pub mod service;

pub use self::memory::MemoryCache;
pub use self::redis::RedisCache;
pub use self::service::{CacheService, CacheTtl};

use crate::{config::Config, Result};
use async_trait::async_trait;
use std::{sync::Arc, time::Duration};

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Short name reported by health checks
    fn backend(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Increments a counter, creating it with the given TTL, and returns the new value
    async fn incr(&self, key: &str, ttl_secs: u64) -> Result<i64>;

    async fn ping(&self) -> Result<()>;
}

/// Picks the store for the configured environment
pub fn store_from_config(config: &Config) -> Arc<dyn CacheStore> {
    match config.redis_url.as_deref().filter(|url| !url.trim().is_empty()) {
        Some(url) => Arc::new(RedisCache::new(url)),
        None => {
            let cache = MemoryCache::new();
            if tokio::runtime::Handle::try_current().is_ok() {
                cache.spawn_sweeper(SWEEP_INTERVAL);
            }
            Arc::new(cache)
        }
    }
}
