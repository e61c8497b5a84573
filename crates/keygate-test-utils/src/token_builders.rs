//! Builder patterns for test token construction.

use crate::keys::TestKeypair;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};

/// Audience the test server is configured with.
pub const TEST_AUDIENCE: &str = "keygate-test-api";

/// Issuer the test server is configured with.
pub const TEST_ISSUER: &str = "https://auth.keygate.test/";

/// Builder for test token claims.
///
/// Defaults to a token the test server accepts: test issuer and audience,
/// one hour of validity, no scope claim.
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .for_subject("3f2504e0-4f89-11d3-9a0c-0305e82c3301")
///     .with_scopes(&["read", "user_journey"])
///     .signed_by(&TestKeypair::primary());
/// ```
pub struct TestTokenBuilder {
    claims: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults.
    pub fn new() -> Self {
        let now = Utc::now();
        let mut claims = Map::new();
        claims.insert("sub".to_string(), json!("test-subject"));
        claims.insert("iss".to_string(), json!(TEST_ISSUER));
        claims.insert("aud".to_string(), json!(TEST_AUDIENCE));
        claims.insert("iat".to_string(), json!(now.timestamp()));
        claims.insert(
            "exp".to_string(),
            json!((now + Duration::seconds(3600)).timestamp()),
        );
        Self { claims }
    }

    /// Set the subject.
    pub fn for_subject(self, subject: &str) -> Self {
        self.with_claim("sub", json!(subject))
    }

    /// Set the scope as a single string.
    pub fn with_scope(self, scope: &str) -> Self {
        self.with_claim("scope", json!(scope))
    }

    /// Set the scope as an array of strings.
    pub fn with_scopes(self, scopes: &[&str]) -> Self {
        self.with_claim("scope", json!(scopes))
    }

    /// Set the audience (string or array).
    pub fn with_audience(self, audience: Value) -> Self {
        self.with_claim("aud", audience)
    }

    /// Set the issuer.
    pub fn with_issuer(self, issuer: &str) -> Self {
        self.with_claim("iss", json!(issuer))
    }

    /// Set expiration in seconds from now (negative for the past).
    pub fn expires_in(self, seconds: i64) -> Self {
        self.with_claim("exp", json!((Utc::now() + Duration::seconds(seconds)).timestamp()))
    }

    /// Set not-before in seconds from now.
    pub fn not_before_in(self, seconds: i64) -> Self {
        self.with_claim("nbf", json!((Utc::now() + Duration::seconds(seconds)).timestamp()))
    }

    /// Set an arbitrary claim.
    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    /// Remove a claim.
    pub fn without_claim(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    /// Build the claims as a JSON value.
    pub fn build(self) -> Value {
        Value::Object(self.claims)
    }

    /// Build and sign with `key`.
    pub fn signed_by(self, key: &TestKeypair) -> String {
        key.sign(&self.build())
    }

    /// Build with a placeholder signature, for claims decoding only.
    pub fn unsigned(self) -> String {
        unsigned_token(&self.build())
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A token with an RS256 header, `payload` as claims, and a bogus signature.
pub fn unsigned_token(payload: &Value) -> String {
    unsigned_token_raw(&payload.to_string())
}

/// Like [`unsigned_token`] but with the payload text as given.
pub fn unsigned_token_raw(payload: &str) -> String {
    format!(
        "{}.{}.{}",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT","kid":"unsigned"}"#),
        URL_SAFE_NO_PAD.encode(payload),
        URL_SAFE_NO_PAD.encode("not-a-signature")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let claims = TestTokenBuilder::new().build();
        assert_eq!(claims["sub"], "test-subject");
        assert_eq!(claims["iss"], TEST_ISSUER);
        assert_eq!(claims["aud"], TEST_AUDIENCE);
        assert!(claims.get("scope").is_none());
        assert!(claims["exp"].as_i64().unwrap() > Utc::now().timestamp());
    }

    #[test]
    fn test_builder_scope_shapes() {
        let single = TestTokenBuilder::new().with_scope("read").build();
        assert_eq!(single["scope"], "read");

        let many = TestTokenBuilder::new().with_scopes(&["read", "write"]).build();
        assert_eq!(many["scope"], json!(["read", "write"]));
    }

    #[test]
    fn test_without_claim() {
        let claims = TestTokenBuilder::new().without_claim("exp").build();
        assert!(claims.get("exp").is_none());
    }

    #[test]
    fn test_unsigned_token_has_three_segments() {
        let token = TestTokenBuilder::new().unsigned();
        assert_eq!(token.split('.').count(), 3);
    }
}
