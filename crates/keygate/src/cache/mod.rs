//! Look-aside cache for the published key set.
//!
//! The cache is an optimization over the authoritative JWKS endpoint. Every
//! error surfaced here is logged by the caller and treated as a miss (on
//! read) or a skipped write (on write); a resolution never fails because
//! the cache did.
//!
//! # Backends
//!
//! - [`RedisKeyCache`] - shared Redis, used in deployed environments
//! - [`InMemoryKeyCache`] - process-local, used when no Redis is configured

pub mod memory;
pub mod redis;

pub use self::memory::InMemoryKeyCache;
pub use self::redis::RedisKeyCache;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors from a cache backend.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Could not reach the backend (startup connectivity check or lost connection).
    #[error("Cache connection failed: {0}")]
    Connection(String),

    /// The backend rejected or failed a command.
    #[error("Cache command failed: {0}")]
    Command(String),
}

/// Key/value store holding serialized key sets.
///
/// Values are opaque bytes; the resolver owns their encoding.
#[async_trait]
pub trait KeyCache: Send + Sync {
    /// Read a value. `Ok(None)` is a miss.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Write a value that expires after `ttl`.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError>;

    /// Remove a value. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}
