//! Redis-backed key cache.
//!
//! The connection is opened and checked once, at construction, and the
//! resulting client is passed explicitly to whoever needs it. There is no
//! process-wide lazily-initialized connection.
//!
//! `MultiplexedConnection` is cheap to clone and safe to use concurrently, so
//! each operation clones it instead of locking.

use super::{CacheError, KeyCache};
use async_trait::async_trait;
use common::config::RedisConfig;
use common::secret::ExposeSecret;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, IntoConnectionInfo};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

/// Key cache stored in Redis with `SET key value EX ttl`.
#[derive(Clone)]
pub struct RedisKeyCache {
    connection: MultiplexedConnection,
}

impl RedisKeyCache {
    /// Connect to Redis and verify the connection with a single `PING`.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Connection` if the URL is invalid, the server is
    /// unreachable, or the `PING` fails.
    pub async fn connect(config: &RedisConfig) -> Result<Self, CacheError> {
        // Do NOT log config.url: it may embed credentials.
        let mut info = config.url.as_str().into_connection_info().map_err(|e| {
            error!(target: "keygate.cache.redis", error = %e, "Invalid Redis URL");
            CacheError::Connection(format!("Invalid Redis URL: {e}"))
        })?;
        if let Some(username) = &config.username {
            info.redis.username = Some(username.clone());
        }
        if let Some(password) = &config.password {
            info.redis.password = Some(password.expose_secret().to_string());
        }

        let client = Client::open(info).map_err(|e| {
            error!(target: "keygate.cache.redis", error = %e, "Failed to open Redis client");
            CacheError::Connection(format!("Failed to open Redis client: {e}"))
        })?;

        let mut connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                error!(target: "keygate.cache.redis", error = %e, "Failed to connect to Redis");
                CacheError::Connection(format!("Failed to connect to Redis: {e}"))
            })?;

        let _: String = redis::cmd("PING")
            .query_async(&mut connection)
            .await
            .map_err(|e| {
                error!(target: "keygate.cache.redis", error = %e, "Redis PING failed");
                CacheError::Connection(format!("Redis PING failed: {e}"))
            })?;

        debug!(target: "keygate.cache.redis", "Redis connection established");
        Ok(Self { connection })
    }
}

#[async_trait]
impl KeyCache for RedisKeyCache {
    #[instrument(skip_all, fields(key = %key))]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.connection.clone();
        conn.get(key).await.map_err(|e| {
            warn!(target: "keygate.cache.redis", error = %e, "Failed to read cache entry");
            CacheError::Command(format!("GET failed: {e}"))
        })
    }

    #[instrument(skip_all, fields(key = %key, ttl_secs = ttl.as_secs()))]
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        // EX rejects 0
        let seconds = ttl.as_secs().max(1);

        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(seconds)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                warn!(target: "keygate.cache.redis", error = %e, "Failed to write cache entry");
                CacheError::Command(format!("SET failed: {e}"))
            })?;

        Ok(())
    }

    #[instrument(skip_all, fields(key = %key))]
    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        let removed: i64 = conn.del(key).await.map_err(|e| {
            warn!(target: "keygate.cache.redis", error = %e, "Failed to delete cache entry");
            CacheError::Command(format!("DEL failed: {e}"))
        })?;

        debug!(target: "keygate.cache.redis", removed, "Cache entry deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_rejects_invalid_url() {
        let config = RedisConfig::new("not-a-redis-url");
        let result = RedisKeyCache::connect(&config).await;
        assert!(matches!(result, Err(CacheError::Connection(_))));
    }

    #[tokio::test]
    async fn test_connect_fails_when_unreachable() {
        // Port 1 is reserved and never has a listener in test environments.
        let config = RedisConfig::new("redis://127.0.0.1:1");
        let result = RedisKeyCache::connect(&config).await;
        assert!(matches!(result, Err(CacheError::Connection(_))));
    }

    #[test]
    fn test_connection_error_message_omits_url() {
        let err = CacheError::Connection("Failed to connect to Redis: refused".to_string());
        assert!(!err.to_string().contains("redis://"));
    }
}
