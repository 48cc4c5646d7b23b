use super::CacheStore;
use crate::Result;
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// In-process store used when no Redis is configured
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every expired entry and returns how many were dropped
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    /// Purges expired entries on a fixed interval until the runtime shuts down
    pub fn spawn_sweeper(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let purged = cache.purge_expired().await;
                if purged > 0 {
                    tracing::debug!("Purged {} expired cache entries", purged);
                }
            }
        })
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        // Expired, drop it
        self.entries.write().await.remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: Instant::now() + Duration::from_secs(ttl_secs),
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn incr(&self, key: &str, ttl_secs: u64) -> Result<i64> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let current = entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .and_then(|entry| entry.value.parse::<i64>().ok());

        let (count, expires_at) = match (current, entries.get(key)) {
            (Some(count), Some(entry)) => (count + 1, entry.expires_at),
            _ => (1, now + Duration::from_secs(ttl_secs)),
        };
        entries.insert(
            key.to_string(),
            Entry {
                value: count.to_string(),
                expires_at,
            },
        );
        Ok(count)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("v2:topic:bitcoin").await.unwrap(), None);

        cache.set("v2:topic:bitcoin", "{}", 60).await.unwrap();
        assert_eq!(cache.get("v2:topic:bitcoin").await.unwrap().as_deref(), Some("{}"));

        cache.delete("v2:topic:bitcoin").await.unwrap();
        assert_eq!(cache.get("v2:topic:bitcoin").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_entries_are_dropped() {
        let cache = MemoryCache::new();
        cache.set("gone", "1", 0).await.unwrap();
        cache.set("kept", "2", 60).await.unwrap();

        assert_eq!(cache.get("gone").await.unwrap(), None);
        cache.set("gone-too", "3", 0).await.unwrap();
        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_incr_counts_within_window() {
        let cache = MemoryCache::new();
        assert_eq!(cache.incr("ratelimit:demo:1", 900).await.unwrap(), 1);
        assert_eq!(cache.incr("ratelimit:demo:1", 900).await.unwrap(), 2);
        assert_eq!(cache.incr("ratelimit:demo:2", 900).await.unwrap(), 1);

        // An expired counter starts over
        cache.incr("short", 0).await.unwrap();
        assert_eq!(cache.incr("short", 0).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sweeper_purges_in_background() {
        let cache = MemoryCache::new();
        cache.set("stale", "1", 0).await.unwrap();
        let sweeper = cache.spawn_sweeper(Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(cache.len().await, 0);
        sweeper.abort();
    }
}
