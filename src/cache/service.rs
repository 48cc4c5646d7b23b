use super::CacheStore;
use crate::{metrics::record_cache, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::{future::Future, sync::Arc};

/// Namespace for cached upstream responses, bump it when payload shapes change
const KEY_PREFIX: &str = "v2";

const MIN_TTL_SECS: u64 = 60;
const MAX_TTL_SECS: u64 = 1800;

/// How long a response may be cached for a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTtl {
    Bypass,
    Ttl(u64),
}

impl CacheTtl {
    /// Reads the `x-cache-ttl` header. Values under a minute skip the cache,
    /// values above half an hour fall back to the default.
    pub fn from_header(header: Option<&str>, default: u64) -> Self {
        let Some(requested) = header.and_then(|value| value.trim().parse::<i64>().ok()) else {
            return CacheTtl::Ttl(default);
        };
        match requested {
            v if v <= 0 => CacheTtl::Ttl(default),
            v if (v as u64) < MIN_TTL_SECS => CacheTtl::Bypass,
            v if (v as u64) <= MAX_TTL_SECS => CacheTtl::Ttl(v as u64),
            _ => CacheTtl::Ttl(default),
        }
    }
}

/// JSON caching on top of a [`CacheStore`]. Cache failures are logged and
/// never fail the caller.
#[derive(Clone)]
pub struct CacheService {
    store: Arc<dyn CacheStore>,
}

impl CacheService {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn full_key(key: &str) -> String {
        format!("{KEY_PREFIX}:{key}")
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.store.get(&Self::full_key(key)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.store.set(&Self::full_key(key), &raw, ttl_secs).await
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        self.store.delete(&Self::full_key(key)).await
    }

    pub async fn has(&self, key: &str) -> Result<bool> {
        Ok(self.store.get(&Self::full_key(key)).await?.is_some())
    }

    /// Returns the cached value for `key` or runs `fetch` and stores its result
    pub async fn get_or_fetch<T, F, Fut>(&self, key: &str, ttl: CacheTtl, fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let ttl_secs = match ttl {
            CacheTtl::Bypass => {
                record_cache("bypass");
                return fetch().await;
            }
            CacheTtl::Ttl(secs) => secs,
        };

        match self.get_json::<T>(key).await {
            Ok(Some(cached)) => {
                record_cache("hit");
                tracing::debug!("Cache hit: {}", key);
                return Ok(cached);
            }
            Ok(None) => record_cache("miss"),
            Err(err) => {
                record_cache("error");
                tracing::warn!("Cache read failed for {}: {}", key, err);
            }
        }

        let value = fetch().await?;

        if let Err(err) = self.set_json(key, &value, ttl_secs).await {
            tracing::warn!("Cache write failed for {}: {}", key, err);
        }

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cache::MemoryCache, errors::ApiError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store whose every operation fails
    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        fn backend(&self) -> &'static str {
            "broken"
        }
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(ApiError::Custom("down".into()))
        }
        async fn set(&self, _key: &str, _value: &str, _ttl: u64) -> Result<()> {
            Err(ApiError::Custom("down".into()))
        }
        async fn delete(&self, _key: &str) -> Result<()> {
            Err(ApiError::Custom("down".into()))
        }
        async fn incr(&self, _key: &str, _ttl: u64) -> Result<i64> {
            Err(ApiError::Custom("down".into()))
        }
        async fn ping(&self) -> Result<()> {
            Err(ApiError::Custom("down".into()))
        }
    }

    #[test]
    fn test_ttl_from_header() {
        assert_eq!(CacheTtl::from_header(None, 120), CacheTtl::Ttl(120));
        assert_eq!(CacheTtl::from_header(Some("abc"), 120), CacheTtl::Ttl(120));
        assert_eq!(CacheTtl::from_header(Some("0"), 120), CacheTtl::Ttl(120));
        assert_eq!(CacheTtl::from_header(Some("-5"), 120), CacheTtl::Ttl(120));
        assert_eq!(CacheTtl::from_header(Some("30"), 120), CacheTtl::Bypass);
        assert_eq!(CacheTtl::from_header(Some("59"), 120), CacheTtl::Bypass);
        assert_eq!(CacheTtl::from_header(Some("60"), 120), CacheTtl::Ttl(60));
        assert_eq!(CacheTtl::from_header(Some(" 600 "), 120), CacheTtl::Ttl(600));
        assert_eq!(CacheTtl::from_header(Some("1800"), 120), CacheTtl::Ttl(1800));
        assert_eq!(CacheTtl::from_header(Some("1801"), 120), CacheTtl::Ttl(120));
    }

    #[tokio::test]
    async fn test_get_or_fetch_caches_under_prefix() {
        let store = Arc::new(MemoryCache::new());
        let cache = CacheService::new(store.clone());
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value: Vec<String> = cache
                .get_or_fetch("topics_list", CacheTtl::Ttl(60), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec!["bitcoin".to_string()])
                })
                .await
                .unwrap();
            assert_eq!(value, vec!["bitcoin".to_string()]);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(store.get("v2:topics_list").await.unwrap().is_some());
        assert!(cache.has("topics_list").await.unwrap());
    }

    #[tokio::test]
    async fn test_bypass_skips_store() {
        let store = Arc::new(MemoryCache::new());
        let cache = CacheService::new(store.clone());

        let value: u32 = cache
            .get_or_fetch("coin:btc", CacheTtl::Bypass, || async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_fetch_error_is_not_cached() {
        let cache = CacheService::new(Arc::new(MemoryCache::new()));

        let result: Result<u32> = cache
            .get_or_fetch("coin:btc", CacheTtl::Ttl(60), || async {
                Err(ApiError::Upstream {
                    status: 500,
                    status_text: "Internal Server Error".into(),
                })
            })
            .await;
        assert!(result.is_err());
        assert!(!cache.has("coin:btc").await.unwrap());
    }

    #[tokio::test]
    async fn test_broken_store_fails_open() {
        let cache = CacheService::new(Arc::new(BrokenStore));

        let value: String = cache
            .get_or_fetch("topic:eth", CacheTtl::Ttl(120), || async { Ok("fresh".to_string()) })
            .await
            .unwrap();
        assert_eq!(value, "fresh");
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = CacheService::new(Arc::new(MemoryCache::new()));
        cache.set_json("prefs:auth:abc", &vec![1, 2], 60).await.unwrap();
        assert_eq!(
            cache.get_json::<Vec<u8>>("prefs:auth:abc").await.unwrap(),
            Some(vec![1, 2])
        );
        cache.delete("prefs:auth:abc").await.unwrap();
        assert_eq!(cache.get_json::<Vec<u8>>("prefs:auth:abc").await.unwrap(), None);
    }
}
