//! `KeyCache` test doubles.

use async_trait::async_trait;
use keygate::cache::{CacheError, InMemoryKeyCache, KeyCache};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// In-memory cache that counts every call.
#[derive(Default)]
pub struct CountingKeyCache {
    inner: InMemoryKeyCache,
    gets: AtomicUsize,
    sets: AtomicUsize,
    deletes: AtomicUsize,
}

impl CountingKeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Write directly, bypassing the counters.
    pub async fn preload(&self, key: &str, value: &[u8]) {
        self.inner
            .set(key, value, Duration::from_secs(3600))
            .await
            .expect("in-memory set cannot fail");
    }

    /// Read directly, bypassing the counters.
    pub async fn peek(&self, key: &str) -> Option<Vec<u8>> {
        self.inner
            .get(key)
            .await
            .expect("in-memory get cannot fail")
    }
}

#[async_trait]
impl KeyCache for CountingKeyCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(key).await
    }
}

/// Cache whose backend is unreachable: every call fails.
#[derive(Default)]
pub struct FailingKeyCache {
    calls: AtomicUsize,
}

impl FailingKeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail(&self) -> CacheError {
        self.calls.fetch_add(1, Ordering::SeqCst);
        CacheError::Connection("connection refused".to_string())
    }
}

#[async_trait]
impl KeyCache for FailingKeyCache {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Err(self.fail())
    }

    async fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> Result<(), CacheError> {
        Err(self.fail())
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(self.fail())
    }
}
