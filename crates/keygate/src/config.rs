//! Keygate configuration.
//!
//! Configuration is loaded from environment variables. Redis credentials are
//! held as secrets and redacted in Debug output.

use crate::auth::authorization::DEFAULT_USER_JOURNEY_SCOPE;
use crate::auth::{Authorizer, CacheKeyScheme, ResolverConfig, ScopeMatching, ValidatorConfig};
use common::config::RedisConfig;
use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default environment name.
pub const DEFAULT_ENVIRONMENT: &str = "dev";

/// Default deployment region.
pub const DEFAULT_REGION: &str = "ap-south-1";

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:5000";

/// Default key set cache TTL in seconds (24 hours).
pub const DEFAULT_JWKS_CACHE_TTL_SECONDS: u64 = 86_400;

/// Maximum key set cache TTL in seconds (30 days).
pub const MAX_JWKS_CACHE_TTL_SECONDS: u64 = 30 * 86_400;

/// Default minimum spacing of kid-miss refreshes in seconds.
pub const DEFAULT_JWKS_REFRESH_COOLDOWN_SECONDS: u64 = 30;

/// Default key resolution budget in seconds.
pub const DEFAULT_KEY_RESOLUTION_TIMEOUT_SECONDS: u64 = 10;

/// Default scope required by the cache-bust endpoint.
pub const DEFAULT_ADMIN_SCOPE: &str = "keygate:admin";

/// Default graceful shutdown drain period in seconds.
pub const DEFAULT_DRAIN_SECONDS: u64 = 30;

/// Keygate configuration.
///
/// Loaded from environment variables with sensible defaults.
#[derive(Clone)]
pub struct Config {
    /// Service segment of the cache key.
    pub service_name: String,

    /// Environment name (default: "dev").
    pub environment: String,

    /// Deployment region (default: "ap-south-1").
    pub region: String,

    /// Key set publication URL (from `JWKS_URL` or the expanded template).
    pub jwks_url: String,

    /// Expected `aud`.
    pub jwks_audience: String,

    /// Expected `iss`.
    pub jwks_issuer: String,

    /// Cache entry TTL in seconds (default: 86400).
    pub jwks_cache_ttl_seconds: u64,

    /// Cache key derivation (default: service).
    pub cache_key_scheme: CacheKeyScheme,

    /// Minimum spacing of kid-miss refreshes in seconds (default: 30).
    pub jwks_refresh_cooldown_seconds: u64,

    /// Key resolution budget in seconds (default: 10).
    pub key_resolution_timeout_seconds: u64,

    /// Leeway for `exp`/`nbf` in seconds (default: 300).
    pub jwt_clock_skew_seconds: u64,

    /// Redis settings. `None` selects the in-process cache.
    pub redis: Option<RedisConfig>,

    /// Scope marking a customer token (default: "user_journey").
    pub user_journey_scope: String,

    /// Scope matching rule for `validate_scope` (default: exact).
    pub scope_matching: ScopeMatching,

    /// Scope required by `DELETE /v1/admin/jwks-cache`.
    pub admin_scope: String,

    /// HTTP bind address (default: "0.0.0.0:5000").
    pub bind_address: String,

    /// Graceful shutdown drain period in seconds (default: 30).
    pub drain_seconds: u64,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("service_name", &self.service_name)
            .field("environment", &self.environment)
            .field("region", &self.region)
            .field("jwks_url", &self.jwks_url)
            .field("jwks_audience", &self.jwks_audience)
            .field("jwks_issuer", &self.jwks_issuer)
            .field("jwks_cache_ttl_seconds", &self.jwks_cache_ttl_seconds)
            .field("cache_key_scheme", &self.cache_key_scheme)
            .field(
                "jwks_refresh_cooldown_seconds",
                &self.jwks_refresh_cooldown_seconds,
            )
            .field(
                "key_resolution_timeout_seconds",
                &self.key_resolution_timeout_seconds,
            )
            .field("jwt_clock_skew_seconds", &self.jwt_clock_skew_seconds)
            .field("redis", &self.redis)
            .field("user_journey_scope", &self.user_journey_scope)
            .field("scope_matching", &self.scope_matching)
            .field("admin_scope", &self.admin_scope)
            .field("bind_address", &self.bind_address)
            .field("drain_seconds", &self.drain_seconds)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let service_name = required(vars, "SERVICE_NAME")?;
        let environment =
            optional(vars, "ENVIRONMENT").unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());
        let region = optional(vars, "REGION").unwrap_or_else(|| DEFAULT_REGION.to_string());

        let jwks_url = match (optional(vars, "JWKS_URL"), optional(vars, "JWKS_URL_TEMPLATE")) {
            (Some(url), _) => url,
            (None, Some(template)) => template
                .replace("{environment}", &environment)
                .replace("{region}", &region),
            (None, None) => return Err(ConfigError::MissingEnvVar("JWKS_URL".to_string())),
        };

        let jwks_audience = required(vars, "JWKS_AUDIENCE")?;
        let jwks_issuer = required(vars, "JWKS_ISSUER")?;

        let jwks_cache_ttl_seconds =
            positive_seconds(vars, "JWKS_CACHE_TTL_SECONDS", DEFAULT_JWKS_CACHE_TTL_SECONDS)?;
        if jwks_cache_ttl_seconds > MAX_JWKS_CACHE_TTL_SECONDS {
            return Err(ConfigError::InvalidValue(format!(
                "JWKS_CACHE_TTL_SECONDS must not exceed {} seconds, got {}",
                MAX_JWKS_CACHE_TTL_SECONDS, jwks_cache_ttl_seconds
            )));
        }

        let cache_key_scheme = match optional(vars, "JWKS_CACHE_KEY_SCHEME").as_deref() {
            None | Some("service") => CacheKeyScheme::Service {
                service: service_name.clone(),
                environment: environment.clone(),
            },
            Some("url") => CacheKeyScheme::Url,
            Some(other) => {
                return Err(ConfigError::InvalidValue(format!(
                    "JWKS_CACHE_KEY_SCHEME must be 'service' or 'url', got '{other}'"
                )))
            }
        };

        let jwks_refresh_cooldown_seconds = match optional(vars, "JWKS_REFRESH_COOLDOWN_SECONDS") {
            Some(value_str) => parse_u64("JWKS_REFRESH_COOLDOWN_SECONDS", &value_str)?,
            None => DEFAULT_JWKS_REFRESH_COOLDOWN_SECONDS,
        };

        let key_resolution_timeout_seconds = positive_seconds(
            vars,
            "KEY_RESOLUTION_TIMEOUT_SECONDS",
            DEFAULT_KEY_RESOLUTION_TIMEOUT_SECONDS,
        )?;

        // Parse JWT clock skew tolerance with validation
        let jwt_clock_skew_seconds =
            positive_seconds(vars, "JWT_CLOCK_SKEW_SECONDS", DEFAULT_CLOCK_SKEW.as_secs())?;
        if jwt_clock_skew_seconds > MAX_CLOCK_SKEW.as_secs() {
            return Err(ConfigError::InvalidValue(format!(
                "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                MAX_CLOCK_SKEW.as_secs(),
                jwt_clock_skew_seconds
            )));
        }

        let redis = optional(vars, "REDIS_URL").map(|url| RedisConfig {
            url,
            username: optional(vars, "REDIS_USER"),
            password: optional(vars, "REDIS_PASSWORD").map(SecretString::from),
        });

        let user_journey_scope = optional(vars, "USER_JOURNEY_SCOPE")
            .unwrap_or_else(|| DEFAULT_USER_JOURNEY_SCOPE.to_string());

        let scope_matching = match optional(vars, "SCOPE_MATCHING").as_deref() {
            None | Some("exact") => ScopeMatching::Exact,
            Some("substring") => ScopeMatching::Substring,
            Some(other) => {
                return Err(ConfigError::InvalidValue(format!(
                    "SCOPE_MATCHING must be 'exact' or 'substring', got '{other}'"
                )))
            }
        };

        let admin_scope =
            optional(vars, "ADMIN_SCOPE").unwrap_or_else(|| DEFAULT_ADMIN_SCOPE.to_string());

        let bind_address =
            optional(vars, "BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let drain_seconds = match optional(vars, "KEYGATE_DRAIN_SECONDS") {
            Some(value_str) => parse_u64("KEYGATE_DRAIN_SECONDS", &value_str)?,
            None => DEFAULT_DRAIN_SECONDS,
        };

        Ok(Config {
            service_name,
            environment,
            region,
            jwks_url,
            jwks_audience,
            jwks_issuer,
            jwks_cache_ttl_seconds,
            cache_key_scheme,
            jwks_refresh_cooldown_seconds,
            key_resolution_timeout_seconds,
            jwt_clock_skew_seconds,
            redis,
            user_journey_scope,
            scope_matching,
            admin_scope,
            bind_address,
            drain_seconds,
        })
    }

    /// Settings for the key resolver.
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig::new(self.jwks_url.clone(), self.cache_key_scheme.clone())
            .with_cache_ttl(Duration::from_secs(self.jwks_cache_ttl_seconds))
            .with_refresh_cooldown(Duration::from_secs(self.jwks_refresh_cooldown_seconds))
    }

    /// Settings for the token validator.
    pub fn validator_config(&self) -> ValidatorConfig {
        ValidatorConfig {
            audience: self.jwks_audience.clone(),
            issuer: self.jwks_issuer.clone(),
            clock_skew: Duration::from_secs(self.jwt_clock_skew_seconds),
            resolution_timeout: Duration::from_secs(self.key_resolution_timeout_seconds),
        }
    }

    /// Authorization helpers configured for this deployment.
    pub fn authorizer(&self) -> Authorizer {
        Authorizer::new(self.user_journey_scope.clone(), self.scope_matching)
    }
}

/// Non-empty value of `name`, if set.
fn optional(vars: &HashMap<String, String>, name: &str) -> Option<String> {
    vars.get(name).filter(|v| !v.trim().is_empty()).cloned()
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    optional(vars, name).ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn parse_u64(name: &str, value_str: &str) -> Result<u64, ConfigError> {
    value_str.trim().parse().map_err(|e| {
        ConfigError::InvalidValue(format!(
            "{name} must be a valid non-negative integer, got '{value_str}': {e}"
        ))
    })
}

fn positive_seconds(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    let Some(value_str) = optional(vars, name) else {
        return Ok(default);
    };
    let value = parse_u64(name, &value_str)?;
    if value == 0 {
        return Err(ConfigError::InvalidValue(format!(
            "{name} must be greater than 0"
        )));
    }
    Ok(value)
}
