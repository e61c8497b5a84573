//! Claims decoding for raw bearer tokens.
//!
//! Decodes the payload segment of a token WITHOUT verifying its signature.
//! Callers use this for business-level authorization on requests that have
//! already passed the token validator.
//!
//! The issuing authority writes a single scope as a JSON string and several
//! scopes as a JSON array of strings. Both shapes decode to the same ordered
//! sequence. A missing or empty scope is a decode failure, never an empty
//! grant.

use crate::auth::error::AuthError;
use common::jwt::{decode_segment, split_token};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A claim that is either one string or an array of strings on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    /// Bare JSON string.
    One(String),
    /// JSON array of strings.
    Many(Vec<String>),
}

impl OneOrMany {
    /// Normalize to an ordered sequence.
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

/// Payload as it appears on the wire, before scope resolution.
#[derive(Deserialize)]
struct RawClaims {
    sub: Option<String>,
    iss: Option<String>,
    aud: Option<OneOrMany>,
    exp: Option<i64>,
    scope: Option<serde_json::Value>,
}

/// Decoded token claims.
///
/// The `sub` field is redacted in Debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject. May be empty.
    pub sub: String,
    /// Issuer, if present.
    pub iss: Option<String>,
    /// Audience values, in token order.
    pub aud: Vec<String>,
    /// Expiration timestamp (Unix epoch seconds), if present.
    pub exp: Option<i64>,
    scopes: Vec<String>,
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("sub", &"[REDACTED]")
            .field("iss", &self.iss)
            .field("aud", &self.aud)
            .field("exp", &self.exp)
            .field("scopes", &self.scopes)
            .finish()
    }
}

impl Claims {
    /// Scopes in token order.
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Whether any scope equals `scope`, ignoring ASCII case.
    pub fn has_scope_ignore_case(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s.eq_ignore_ascii_case(scope))
    }
}

/// Decode the claims of `token` without verifying its signature.
///
/// # Errors
///
/// - `MalformedToken` - oversized, or not exactly three segments
/// - `MalformedClaims` - payload is not base64url, not JSON, or has
///   wrongly-typed standard claims
/// - `UnresolvableScope` - scope is absent, null, an empty string, or any
///   shape other than a string or an array of strings
pub fn decode_claims(token: &str) -> Result<Claims, AuthError> {
    let segments = split_token(token)?;

    let payload = decode_segment(segments.payload).map_err(|e| {
        tracing::debug!(target: "keygate.auth.claims", error = %e, "Failed to decode payload base64");
        AuthError::MalformedClaims
    })?;

    let raw: RawClaims = serde_json::from_slice(&payload).map_err(|e| {
        tracing::debug!(target: "keygate.auth.claims", error = %e, "Failed to parse payload JSON");
        AuthError::MalformedClaims
    })?;

    let scopes = resolve_scopes(raw.scope)?;

    Ok(Claims {
        sub: raw.sub.unwrap_or_default(),
        iss: raw.iss,
        aud: raw.aud.map(OneOrMany::into_vec).unwrap_or_default(),
        exp: raw.exp,
        scopes,
    })
}

fn resolve_scopes(raw: Option<serde_json::Value>) -> Result<Vec<String>, AuthError> {
    let value = match raw {
        None | Some(serde_json::Value::Null) => {
            tracing::warn!(target: "keygate.auth.claims", "Scope claim is absent");
            return Err(AuthError::UnresolvableScope);
        }
        Some(value) => value,
    };

    match OneOrMany::deserialize(value) {
        Ok(OneOrMany::One(scope)) if scope.is_empty() => {
            tracing::warn!(target: "keygate.auth.claims", "Scope claim is empty");
            Err(AuthError::UnresolvableScope)
        }
        Ok(scope) => Ok(scope.into_vec()),
        Err(e) => {
            tracing::warn!(
                target: "keygate.auth.claims",
                error = %e,
                "Scope claim is neither a string nor an array of strings"
            );
            Err(AuthError::UnresolvableScope)
        }
    }
}
