//! Token-shape utilities shared across Keygate components.
//!
//! This module provides the checks every consumer runs before any
//! cryptographic work happens:
//! - Size limits for DoS prevention
//! - Three-segment shape validation
//! - Padding-tolerant base64url segment decoding
//! - Key ID extraction from token headers
//! - Clock skew constants for `exp`/`nbf` leeway
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - A token that does not split into exactly three segments is rejected
//!   before any segment is decoded
//! - Generic error messages prevent information leakage
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{split_token, decode_segment, extract_kid};
//!
//! let segments = split_token(token)?;
//! let payload = decode_segment(segments.payload)?;
//! let kid = extract_kid(token)?;
//! ```

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed token size in bytes (8KB).
///
/// Tokens larger than this are rejected BEFORE any base64 decode or
/// signature verification.
///
/// # Rationale
///
/// - Typical RS256 bearer tokens are 700-1500 bytes (the signature alone is
///   342 characters for a 2048-bit key)
/// - 8KB leaves room for large scope arrays while bounding allocation
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default clock skew tolerance applied to `exp` and `nbf` (5 minutes).
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum allowed clock skew tolerance (10 minutes).
///
/// Configuration above this value is rejected at startup.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

/// Number of dot-separated segments in a compact token.
pub const TOKEN_SEGMENT_COUNT: usize = 3;

/// Base64url decoder that accepts both padded and unpadded input.
///
/// Issuers disagree on whether segments carry `=` padding; a single engine
/// that is indifferent to padding replaces ad-hoc padding fixes at call sites.
const SEGMENT_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while inspecting a token's shape.
///
/// Note: Error messages are intentionally generic to prevent information leakage.
/// Detailed information is logged at debug level for troubleshooting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token format is invalid (not a valid three-segment structure).
    #[error("The access token is invalid or expired")]
    MalformedToken,

    /// Token is missing required `kid` header.
    #[error("The access token is invalid or expired")]
    MissingKid,
}

// =============================================================================
// Types
// =============================================================================

/// The three raw (still base64url-encoded) segments of a compact token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSegments<'a> {
    /// Header segment.
    pub header: &'a str,
    /// Payload (claims) segment.
    pub payload: &'a str,
    /// Signature segment.
    pub signature: &'a str,
}

// =============================================================================
// Functions
// =============================================================================

/// Split a compact token into its three segments.
///
/// The size limit is checked first, then the segment count. Nothing is
/// decoded here.
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - Token does not have exactly three segments
pub fn split_token(token: &str) -> Result<TokenSegments<'_>, JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    let mut parts = token.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(payload), Some(signature), None) => Ok(TokenSegments {
            header,
            payload,
            signature,
        }),
        _ => {
            tracing::debug!(
                target: "common.jwt",
                parts = token.split('.').count(),
                expected = TOKEN_SEGMENT_COUNT,
                "Token rejected: invalid segment count"
            );
            Err(JwtValidationError::MalformedToken)
        }
    }
}

/// Decode one token segment.
///
/// Accepts the URL-safe alphabet and the standard alphabet (`+`, `/`), with
/// or without `=` padding.
///
/// # Errors
///
/// Returns `base64::DecodeError` if the segment is not valid base64.
pub fn decode_segment(segment: &str) -> Result<Vec<u8>, base64::DecodeError> {
    if segment.contains(['+', '/']) {
        let normalized: String = segment
            .chars()
            .map(|c| match c {
                '+' => '-',
                '/' => '_',
                other => other,
            })
            .collect();
        return SEGMENT_ENGINE.decode(normalized);
    }
    SEGMENT_ENGINE.decode(segment)
}

/// Extract the `kid` (key ID) from a token header without verifying the signature.
///
/// This is used to look up the correct signing key in the published key set.
///
/// # Security
///
/// - Token size and shape are checked BEFORE any decoding
/// - This function does NOT validate the token signature
/// - The token MUST still be verified after resolving the key
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds size limit
/// - `MalformedToken` - Wrong structure, bad base64, or invalid JSON header
/// - `MissingKid` - Header has no `kid`, or `kid` is not a non-empty string
pub fn extract_kid(token: &str) -> Result<String, JwtValidationError> {
    let segments = split_token(token)?;

    let header_bytes = decode_segment(segments.header).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode token header base64");
        JwtValidationError::MalformedToken
    })?;

    let header: serde_json::Value = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse token header JSON");
        JwtValidationError::MalformedToken
    })?;

    header
        .get("kid")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or(JwtValidationError::MissingKid)
}

// =============================================================================
// Tests
// =============================================================================
