//! Bearer token validation.
//!
//! Validates inbound tokens against the published key set.
//!
//! # Security Checks
//!
//! 1. Size and three-segment shape, before any decoding
//! 2. `aud` and `iss` compared against configuration (library-parsed,
//!    signature not yet verified) so foreign tokens never cause a key fetch
//! 3. Header algorithm must be RS256
//! 4. Signing key resolved by `kid`, bounded by a time budget
//! 5. RS256 signature verified against the resolved certificate, with `exp`
//!    required, `nbf` honoured, and `aud`/`iss` re-checked
//!
//! Every failure is an [`AuthError`] naming the step. The HTTP layer turns
//! all of them into the same unauthorized response.

use crate::auth::claims::OneOrMany;
use crate::auth::error::AuthError;
use crate::auth::resolver::KeyResolver;
use crate::observability::metrics;
use common::jwt::{extract_kid, split_token, DEFAULT_CLOCK_SKEW};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Default budget for one key resolution.
pub const DEFAULT_RESOLUTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for a [`TokenValidator`].
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Expected `aud`.
    pub audience: String,
    /// Expected `iss`.
    pub issuer: String,
    /// Leeway for `exp` and `nbf`.
    pub clock_skew: Duration,
    /// Budget for key resolution; on expiry the request fails closed.
    pub resolution_timeout: Duration,
}

impl ValidatorConfig {
    /// Settings with default clock skew and resolution timeout.
    pub fn new(audience: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            audience: audience.into(),
            issuer: issuer.into(),
            clock_skew: DEFAULT_CLOCK_SKEW,
            resolution_timeout: DEFAULT_RESOLUTION_TIMEOUT,
        }
    }
}

/// The parts of a verified token that handlers may rely on.
///
/// The `subject` field is redacted in Debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    /// Subject. May be empty.
    pub subject: String,
    /// Issuer (equals the configured issuer).
    pub issuer: String,
    /// Audience values (contain the configured audience).
    pub audience: Vec<String>,
    /// Expiration timestamp (Unix epoch seconds).
    pub expires_at: i64,
}

impl fmt::Debug for VerifiedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifiedToken")
            .field("subject", &"[REDACTED]")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Deserialize)]
struct UnverifiedClaims {
    #[serde(default)]
    iss: Option<String>,
    #[serde(default)]
    aud: Option<OneOrMany>,
}

#[derive(Deserialize)]
struct VerifiedClaims {
    #[serde(default)]
    sub: Option<String>,
    iss: String,
    aud: OneOrMany,
    exp: i64,
}

/// RS256 token validator backed by a [`KeyResolver`].
pub struct TokenValidator {
    resolver: Arc<KeyResolver>,
    audience: String,
    issuer: String,
    leeway_seconds: u64,
    resolution_timeout: Duration,
}

impl TokenValidator {
    /// Create a validator.
    pub fn new(config: ValidatorConfig, resolver: Arc<KeyResolver>) -> Self {
        Self {
            resolver,
            audience: config.audience,
            issuer: config.issuer,
            leeway_seconds: config.clock_skew.as_secs(),
            resolution_timeout: config.resolution_timeout,
        }
    }

    /// Validate `token` and return its verified claims.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] of the first failing check.
    #[instrument(skip_all)]
    pub async fn validate(&self, token: &str) -> Result<VerifiedToken, AuthError> {
        let result = self.validate_inner(token).await;
        match &result {
            Ok(_) => {
                tracing::debug!(target: "keygate.auth.validator", "Token validated successfully");
                metrics::record_token_validation("valid");
            }
            Err(e) => {
                tracing::debug!(target: "keygate.auth.validator", reason = e.as_label(), "Token rejected");
                metrics::record_token_validation(e.as_label());
            }
        }
        result
    }

    async fn validate_inner(&self, token: &str) -> Result<VerifiedToken, AuthError> {
        split_token(token)?;

        self.check_unverified_claims(token)?;

        let header = decode_header(token).map_err(|e| {
            tracing::debug!(target: "keygate.auth.validator", error = %e, "Failed to decode token header");
            AuthError::MalformedToken
        })?;
        if header.alg != Algorithm::RS256 {
            tracing::debug!(target: "keygate.auth.validator", alg = ?header.alg, "Unexpected token algorithm");
            return Err(AuthError::SignatureInvalid);
        }

        let kid = extract_kid(token)?;

        let pem = tokio::time::timeout(self.resolution_timeout, self.resolver.resolve(&kid))
            .await
            .map_err(|_| {
                tracing::warn!(
                    target: "keygate.auth.validator",
                    timeout_secs = self.resolution_timeout.as_secs(),
                    "Key resolution timed out"
                );
                AuthError::ResolutionTimedOut
            })??;

        self.verify_signature(token, &pem)
    }

    /// Compare `aud` and `iss` before any key is fetched.
    fn check_unverified_claims(&self, token: &str) -> Result<(), AuthError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let unverified =
            decode::<UnverifiedClaims>(token, &DecodingKey::from_secret(&[]), &validation)
                .map_err(|e| {
                    tracing::debug!(target: "keygate.auth.validator", error = %e, "Failed to parse token claims");
                    AuthError::MalformedClaims
                })?
                .claims;

        let audience_matches = unverified
            .aud
            .map(OneOrMany::into_vec)
            .is_some_and(|aud| aud.iter().any(|a| *a == self.audience));
        if !audience_matches {
            tracing::debug!(target: "keygate.auth.validator", "Token audience mismatch");
            return Err(AuthError::ClaimMismatch("aud"));
        }

        if unverified.iss.as_deref() != Some(self.issuer.as_str()) {
            tracing::debug!(target: "keygate.auth.validator", "Token issuer mismatch");
            return Err(AuthError::ClaimMismatch("iss"));
        }

        Ok(())
    }

    fn verify_signature(&self, token: &str, pem: &str) -> Result<VerifiedToken, AuthError> {
        let decoding_key = DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| {
            tracing::error!(target: "keygate.auth.validator", error = %e, "Resolved certificate is not a usable RSA key");
            AuthError::SignatureInvalid
        })?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = self.leeway_seconds;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "aud", "iss"]);

        let data = decode::<VerifiedClaims>(token, &decoding_key, &validation).map_err(|e| {
            tracing::debug!(target: "keygate.auth.validator", error = %e, "Token verification failed");
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidAudience => AuthError::ClaimMismatch("aud"),
                ErrorKind::InvalidIssuer => AuthError::ClaimMismatch("iss"),
                ErrorKind::ImmatureSignature => AuthError::ClaimMismatch("nbf"),
                ErrorKind::MissingRequiredClaim(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_)
                | ErrorKind::Base64(_) => AuthError::MalformedClaims,
                _ => AuthError::SignatureInvalid,
            }
        })?;

        let claims = data.claims;
        Ok(VerifiedToken {
            subject: claims.sub.unwrap_or_default(),
            issuer: claims.iss,
            audience: claims.aud.into_vec(),
            expires_at: claims.exp,
        })
    }
}
