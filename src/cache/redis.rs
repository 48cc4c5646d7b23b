use super::CacheStore;
use crate::Result;
use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Redis backed store sharing one lazily opened multiplexed connection
#[derive(Clone)]
pub struct RedisCache {
    async_redis_conn: Arc<Mutex<Option<MultiplexedConnection>>>,
    redis_url: String,
}

impl RedisCache {
    pub fn new(redis_url: &str) -> Self {
        Self {
            async_redis_conn: Arc::new(Mutex::new(None)),
            redis_url: redis_url.to_string(),
        }
    }

    /// Get async Redis connection (creates one if it doesn't exist)
    pub async fn get_async_redis_conn(
        &self,
    ) -> std::result::Result<MultiplexedConnection, redis::RedisError> {
        let mut conn_guard = self.async_redis_conn.lock().await;

        if let Some(conn) = conn_guard.as_ref() {
            return Ok(conn.clone());
        }

        let client = redis::Client::open(self.redis_url.as_str())?;
        let multiplexed_conn = client.get_multiplexed_async_connection().await?;
        *conn_guard = Some(multiplexed_conn.clone());
        tracing::info!("Redis connection established");
        Ok(multiplexed_conn)
    }

    /// Drops the cached connection so the next call reconnects
    async fn reset(&self) {
        *self.async_redis_conn.lock().await = None;
    }

    async fn conn(&self) -> Result<MultiplexedConnection> {
        self.get_async_redis_conn().await.map_err(|err| {
            tracing::error!("Redis connection error: {}", err);
            err.into()
        })
    }

    async fn on_error(&self, op: &str, err: redis::RedisError) -> crate::errors::ApiError {
        tracing::error!("Redis {} failed: {}", op, err);
        if err.is_connection_dropped() || err.is_io_error() {
            self.reset().await;
        }
        err.into()
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn().await?;
        match conn.get::<_, Option<String>>(key).await {
            Ok(value) => Ok(value),
            Err(err) => Err(self.on_error("GET", err).await),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let mut conn = self.conn().await?;
        match conn.set_ex::<_, _, ()>(key, value, ttl_secs).await {
            Ok(()) => Ok(()),
            Err(err) => Err(self.on_error("SET", err).await),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        match conn.del::<_, ()>(key).await {
            Ok(()) => Ok(()),
            Err(err) => Err(self.on_error("DEL", err).await),
        }
    }

    async fn incr(&self, key: &str, ttl_secs: u64) -> Result<i64> {
        let mut conn = self.conn().await?;
        let result: std::result::Result<(i64,), redis::RedisError> = redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, ttl_secs as i64)
            .ignore()
            .query_async(&mut conn)
            .await;
        match result {
            Ok((count,)) => Ok(count),
            Err(err) => Err(self.on_error("INCR", err).await),
        }
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn().await?;
        match redis::cmd("PING").query_async::<String>(&mut conn).await {
            Ok(_) => Ok(()),
            Err(err) => Err(self.on_error("PING", err).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cache() -> Option<RedisCache> {
        dotenv::dotenv().ok();
        std::env::var("TEST_REDIS_URL")
            .ok()
            .map(|url| RedisCache::new(&url))
    }

    #[tokio::test]
    async fn test_redis_roundtrip() {
        let Some(cache) = test_cache() else {
            return;
        };

        assert!(cache.ping().await.is_ok());

        let key = format!("test:{}", uuid::Uuid::new_v4());
        cache.set(&key, "{\"ok\":true}", 30).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some("{\"ok\":true}"));

        cache.delete(&key).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_redis_incr() {
        let Some(cache) = test_cache() else {
            return;
        };

        let key = format!("test:counter:{}", uuid::Uuid::new_v4());
        assert_eq!(cache.incr(&key, 30).await.unwrap(), 1);
        assert_eq!(cache.incr(&key, 30).await.unwrap(), 2);
        cache.delete(&key).await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_redis_errors() {
        let cache = RedisCache::new("redis://127.0.0.1:1/");
        assert!(cache.ping().await.is_err());
        assert!(cache.get("anything").await.is_err());
    }
}
