//! Common configuration types for Keygate components.

use crate::secret::SecretString;
use std::fmt;

/// Redis connection settings.
///
/// `url` may carry an address only; ACL credentials are kept separately so
/// they can be held as secrets and never appear in logs.
#[derive(Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g. `redis://cache.internal:6379`).
    pub url: String,
    /// Optional ACL username.
    pub username: Option<String>,
    /// Optional ACL password.
    pub password: Option<SecretString>,
}

impl RedisConfig {
    /// Settings for an unauthenticated Redis at `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
        }
    }
}

impl fmt::Debug for RedisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisConfig")
            .field("url", &"[REDACTED]")
            .field("username", &self.username)
            .field(
                "password",
                &self.password.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}
