//! Key resolution with a look-aside cache.
//!
//! Resolving a `kid` reads the serialized key set from the [`KeyCache`],
//! falls back to the publication endpoint on a miss or a corrupt entry, writes
//! a fresh fetch back with a fixed TTL, and PEM-wraps the matching key's
//! certificate.
//!
//! # Cache consistency
//!
//! Concurrent misses may each fetch and write the same set. All writers
//! converge on the same value, so no lock is taken around the refill.
//!
//! A `kid` missing from a *cached* set triggers one live refresh (rate
//! limited by the refresh cooldown). A rotated key therefore becomes usable
//! without waiting for the TTL or an operator cache-bust, and an unknown-kid
//! result is never cached.

use crate::auth::error::AuthError;
use crate::auth::jwks::JwkSet;
use crate::cache::{CacheError, KeyCache};
use crate::observability::metrics;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::instrument;

/// Default cache entry TTL (24 hours).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(86_400);

/// Default minimum spacing between kid-miss refreshes.
pub const DEFAULT_REFRESH_COOLDOWN: Duration = Duration::from_secs(30);

/// Fixed suffix of every key-set cache key.
pub const CACHE_KEY_SUFFIX: &str = "jwksResponse";

/// Timeout for one HTTP fetch of the key set.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// How the cache key for the key set is derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheKeyScheme {
    /// `{service}:{environment}:jwksResponse`
    Service {
        /// Service name segment.
        service: String,
        /// Environment segment.
        environment: String,
    },
    /// `jwksResponse:{jwks_url}`, shared by every service reading the same URL.
    Url,
}

impl CacheKeyScheme {
    /// Compute the cache key for a key set published at `jwks_url`.
    pub fn cache_key(&self, jwks_url: &str) -> String {
        match self {
            CacheKeyScheme::Service {
                service,
                environment,
            } => format!("{service}:{environment}:{CACHE_KEY_SUFFIX}"),
            CacheKeyScheme::Url => format!("{CACHE_KEY_SUFFIX}:{jwks_url}"),
        }
    }
}

/// Settings for a [`KeyResolver`].
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Key set publication URL.
    pub jwks_url: String,
    /// Cache key derivation.
    pub cache_key_scheme: CacheKeyScheme,
    /// TTL applied to cache writes.
    pub cache_ttl: Duration,
    /// Minimum spacing of kid-miss refreshes. Zero disables the limit.
    pub refresh_cooldown: Duration,
}

impl ResolverConfig {
    /// Settings with the default TTL and refresh cooldown.
    pub fn new(jwks_url: impl Into<String>, cache_key_scheme: CacheKeyScheme) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            cache_key_scheme,
            cache_ttl: DEFAULT_CACHE_TTL,
            refresh_cooldown: DEFAULT_REFRESH_COOLDOWN,
        }
    }

    /// Override the cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Override the kid-miss refresh cooldown.
    pub fn with_refresh_cooldown(mut self, cooldown: Duration) -> Self {
        self.refresh_cooldown = cooldown;
        self
    }
}

/// Resolves a token's `kid` to a PEM certificate.
pub struct KeyResolver {
    jwks_url: String,
    cache_key: String,
    cache_ttl: Duration,
    refresh_cooldown: Duration,
    http_client: reqwest::Client,
    cache: Arc<dyn KeyCache>,
    last_live_fetch: Mutex<Option<Instant>>,
}

impl KeyResolver {
    /// Create a resolver over `cache`.
    pub fn new(config: ResolverConfig, cache: Arc<dyn KeyCache>) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "keygate.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        let cache_key = config.cache_key_scheme.cache_key(&config.jwks_url);

        Self {
            jwks_url: config.jwks_url,
            cache_key,
            cache_ttl: config.cache_ttl,
            refresh_cooldown: config.refresh_cooldown,
            http_client,
            cache,
            last_live_fetch: Mutex::new(None),
        }
    }

    /// The cache key this resolver reads and writes.
    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    /// Resolve `kid` to a PEM-wrapped certificate.
    ///
    /// Idempotent and safe to retry. May perform one network fetch and one
    /// cache write.
    ///
    /// # Errors
    ///
    /// - `KeySetFetchFailed` - cache miss and the endpoint failed or returned
    ///   something that is not a key set
    /// - `UnknownKeyId` - no key matches `kid`, even after a refresh
    /// - `MissingCertificate` - the matching key has no `x5c`
    #[instrument(skip(self), fields(kid = %kid))]
    pub async fn resolve(&self, kid: &str) -> Result<String, AuthError> {
        if let Some(cached) = self.load_cached().await {
            if let Some(key) = cached.find(kid) {
                tracing::debug!(target: "keygate.auth.jwks", "Key found in cached key set");
                return key.certificate_pem();
            }

            if !self.refresh_allowed().await {
                tracing::debug!(
                    target: "keygate.auth.jwks",
                    "Key not in cached key set, refresh cooling down"
                );
                return Err(AuthError::UnknownKeyId);
            }
            tracing::info!(
                target: "keygate.auth.jwks",
                "Key not in cached key set, refreshing"
            );
        }

        let fresh = self.refresh().await?;
        match fresh.find(kid) {
            Some(key) => key.certificate_pem(),
            None => {
                tracing::warn!(target: "keygate.auth.jwks", "Key not found in key set after refresh");
                Err(AuthError::UnknownKeyId)
            }
        }
    }

    /// Delete the cached key set so the next resolution fetches live.
    ///
    /// # Errors
    ///
    /// Returns the backend's `CacheError`; the caller decides whether an
    /// operator should see it.
    #[instrument(skip_all)]
    pub async fn invalidate(&self) -> Result<(), CacheError> {
        self.cache.delete(&self.cache_key).await.map_err(|e| {
            tracing::error!(target: "keygate.auth.jwks", error = %e, "Failed to invalidate key set cache");
            e
        })?;
        tracing::info!(target: "keygate.auth.jwks", "Key set cache invalidated");
        Ok(())
    }

    /// Read and parse the cached set. Every failure is a miss.
    async fn load_cached(&self) -> Option<JwkSet> {
        let bytes = match self.cache.get(&self.cache_key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::debug!(target: "keygate.auth.jwks", "Key set cache miss");
                metrics::record_cache_lookup("miss");
                return None;
            }
            Err(e) => {
                tracing::warn!(target: "keygate.auth.jwks", error = %e, "Key set cache read failed, treating as miss");
                metrics::record_cache_lookup("error");
                return None;
            }
        };

        match serde_json::from_slice::<JwkSet>(&bytes) {
            Ok(set) => {
                metrics::record_cache_lookup("hit");
                Some(set)
            }
            Err(e) => {
                tracing::warn!(target: "keygate.auth.jwks", error = %e, "Cached key set is corrupt, treating as miss");
                metrics::record_cache_lookup("corrupt");
                None
            }
        }
    }

    async fn refresh_allowed(&self) -> bool {
        if self.refresh_cooldown.is_zero() {
            return true;
        }
        let last = self.last_live_fetch.lock().await;
        !last.is_some_and(|at| at.elapsed() < self.refresh_cooldown)
    }

    /// Fetch live and write back. A failed write is logged and ignored.
    async fn refresh(&self) -> Result<JwkSet, AuthError> {
        *self.last_live_fetch.lock().await = Some(Instant::now());

        let (set, body) = self.fetch().await?;

        if let Err(e) = self.cache.set(&self.cache_key, &body, self.cache_ttl).await {
            tracing::warn!(target: "keygate.auth.jwks", error = %e, "Failed to write key set to cache");
        }

        Ok(set)
    }

    /// GET the publication URL and parse the body.
    async fn fetch(&self) -> Result<(JwkSet, Vec<u8>), AuthError> {
        tracing::debug!(target: "keygate.auth.jwks", url = %self.jwks_url, "Fetching key set");
        let started = Instant::now();

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "keygate.auth.jwks", error = %e, "Failed to fetch key set");
                metrics::record_jwks_fetch("error", started.elapsed());
                AuthError::KeySetFetchFailed(format!("request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(target: "keygate.auth.jwks", status = %status, "Key set endpoint returned error");
            metrics::record_jwks_fetch("error", started.elapsed());
            return Err(AuthError::KeySetFetchFailed(format!("status {status}")));
        }

        let body = response.bytes().await.map_err(|e| {
            tracing::error!(target: "keygate.auth.jwks", error = %e, "Failed to read key set body");
            metrics::record_jwks_fetch("error", started.elapsed());
            AuthError::KeySetFetchFailed(format!("body read failed: {e}"))
        })?;

        let set: JwkSet = serde_json::from_slice(&body).map_err(|e| {
            tracing::error!(target: "keygate.auth.jwks", error = %e, "Failed to parse key set response");
            metrics::record_jwks_fetch("invalid", started.elapsed());
            AuthError::KeySetFetchFailed(format!("invalid key set: {e}"))
        })?;

        metrics::record_jwks_fetch("success", started.elapsed());
        tracing::info!(
            target: "keygate.auth.jwks",
            key_count = set.keys.len(),
            "Key set fetched"
        );

        Ok((set, body.to_vec()))
    }
}
