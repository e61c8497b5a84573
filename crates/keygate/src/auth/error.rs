//! Token authentication error taxonomy.
//!
//! Each variant names the step that failed. The distinction exists for logs
//! and metrics only: the HTTP layer collapses every variant into the same
//! unauthorized response, and the authorization helpers collapse every
//! variant into `false`.

use common::jwt::JwtValidationError;
use thiserror::Error;

/// Why a token was rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Token is oversized or is not three dot-separated segments.
    #[error("malformed token")]
    MalformedToken,

    /// Payload segment is not valid base64url or not a JSON claims object.
    #[error("malformed claims")]
    MalformedClaims,

    /// Scope claim is absent, empty, or neither a string nor an array of strings.
    #[error("unresolvable scope")]
    UnresolvableScope,

    /// The key set could not be fetched or decoded.
    #[error("key set fetch failed: {0}")]
    KeySetFetchFailed(String),

    /// No key in the key set matches the token's `kid`.
    #[error("unknown key id")]
    UnknownKeyId,

    /// The matching key has no certificate chain to build a PEM from.
    #[error("key has no certificate")]
    MissingCertificate,

    /// Cryptographic verification failed, or the algorithm is not RS256.
    #[error("signature invalid")]
    SignatureInvalid,

    /// A claim did not match (`"aud"` or `"iss"` against configuration, or a
    /// future `"nbf"`).
    #[error("claim mismatch: {0}")]
    ClaimMismatch(&'static str),

    /// The `exp` claim is in the past (beyond leeway).
    #[error("token expired")]
    TokenExpired,

    /// Key resolution did not finish within its time budget.
    #[error("key resolution timed out")]
    ResolutionTimedOut,
}

impl AuthError {
    /// Stable label for metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            AuthError::MalformedToken => "malformed_token",
            AuthError::MalformedClaims => "malformed_claims",
            AuthError::UnresolvableScope => "unresolvable_scope",
            AuthError::KeySetFetchFailed(_) => "key_set_fetch_failed",
            AuthError::UnknownKeyId => "unknown_key_id",
            AuthError::MissingCertificate => "missing_certificate",
            AuthError::SignatureInvalid => "signature_invalid",
            AuthError::ClaimMismatch(_) => "claim_mismatch",
            AuthError::TokenExpired => "token_expired",
            AuthError::ResolutionTimedOut => "resolution_timed_out",
        }
    }
}

impl From<JwtValidationError> for AuthError {
    fn from(_: JwtValidationError) -> Self {
        AuthError::MalformedToken
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_errors_map_to_malformed_token() {
        for err in [
            JwtValidationError::TokenTooLarge,
            JwtValidationError::MalformedToken,
            JwtValidationError::MissingKid,
        ] {
            assert_eq!(AuthError::from(err), AuthError::MalformedToken);
        }
    }

    #[test]
    fn test_labels_are_distinct() {
        let labels = [
            AuthError::MalformedToken.as_label(),
            AuthError::MalformedClaims.as_label(),
            AuthError::UnresolvableScope.as_label(),
            AuthError::KeySetFetchFailed(String::new()).as_label(),
            AuthError::UnknownKeyId.as_label(),
            AuthError::MissingCertificate.as_label(),
            AuthError::SignatureInvalid.as_label(),
            AuthError::ClaimMismatch("aud").as_label(),
            AuthError::TokenExpired.as_label(),
            AuthError::ResolutionTimedOut.as_label(),
        ];
        let unique: std::collections::HashSet<_> = labels.iter().collect();
        assert_eq!(unique.len(), labels.len());
    }
}
