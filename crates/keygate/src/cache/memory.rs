//! Process-local key cache.
//!
//! Used when no Redis is configured (local development) and in tests. Entries
//! expire on read once their TTL has elapsed.

use super::{CacheError, KeyCache};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Expiry used when `now + ttl` is not representable (about 30 years).
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// In-memory [`KeyCache`] honouring per-entry TTLs.
#[derive(Clone, Default)]
pub struct InMemoryKeyCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl InMemoryKeyCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyCache for InMemoryKeyCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Ok(Some(entry.value.clone()));
                }
                Some(_) => {}
            }
        }

        // Expired: evict so the map does not grow with dead entries.
        let mut entries = self.entries.write().await;
        if entries
            .get(key)
            .is_some_and(|entry| entry.expires_at <= Instant::now())
        {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at: expiry_after(ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

fn expiry_after(ttl: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(ttl)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_missing_key_is_miss() {
        let cache = InMemoryKeyCache::new();
        assert_eq!(cache.get("absent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = InMemoryKeyCache::new();
        cache
            .set("svc:dev:jwksResponse", b"{\"keys\":[]}", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(
            cache.get("svc:dev:jwksResponse").await.unwrap(),
            Some(b"{\"keys\":[]}".to_vec())
        );
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let cache = InMemoryKeyCache::new();
        cache.set("k", b"old", Duration::from_secs(60)).await.unwrap();
        cache.set("k", b"new", Duration::from_secs(60)).await.unwrap();

        assert_eq!(cache.get("k").await.unwrap(), Some(b"new".to_vec()));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_miss_and_evicted() {
        let cache = InMemoryKeyCache::new();
        cache.set("k", b"v", Duration::ZERO).await.unwrap();

        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_unrepresentable_ttl_does_not_expire() {
        let cache = InMemoryKeyCache::new();
        cache
            .set("k", b"v", Duration::from_secs(u64::MAX))
            .await
            .unwrap();
        cache.set("k2", b"v", Duration::MAX).await.unwrap();

        assert_eq!(cache.get("k").await.unwrap(), Some(b"v".to_vec()));
        assert_eq!(cache.get("k2").await.unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn test_expiry_after_saturates() {
        assert!(expiry_after(Duration::MAX) > Instant::now() + Duration::from_secs(86_400));
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = InMemoryKeyCache::new();
        cache.set("k", b"v", Duration::from_secs(60)).await.unwrap();
        cache.delete("k").await.unwrap();

        assert_eq!(cache.get("k").await.unwrap(), None);
        // Deleting again is fine
        cache.delete("k").await.unwrap();
    }
}
