//! Token validation against signed tokens and a mock key set endpoint.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use jsonwebtoken::{Algorithm, Header};
use keygate::auth::{
    AuthError, CacheKeyScheme, KeyResolver, ResolverConfig, TokenValidator, ValidatorConfig,
};
use keygate::cache::InMemoryKeyCache;
use keygate_test_utils::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn validator_for(jwks: &MockJwksServer) -> TokenValidator {
    let resolver = Arc::new(KeyResolver::new(
        ResolverConfig::new(jwks.url(), CacheKeyScheme::Url)
            .with_refresh_cooldown(Duration::ZERO),
        Arc::new(InMemoryKeyCache::new()),
    ));
    let mut config = ValidatorConfig::new(TEST_AUDIENCE, TEST_ISSUER);
    config.clock_skew = Duration::from_secs(30);
    config.resolution_timeout = Duration::from_secs(1);
    TokenValidator::new(config, resolver)
}

#[tokio::test]
async fn test_valid_token() {
    let key = TestKeypair::primary();
    let jwks = MockJwksServer::start().await;
    jwks.serve_keys(&[&key], 1).await;
    let validator = validator_for(&jwks);

    let token = TestTokenBuilder::new()
        .for_subject("alice")
        .with_scopes(&["read", "user_journey"])
        .signed_by(&key);

    let verified = validator.validate(&token).await.unwrap();
    assert_eq!(verified.subject, "alice");
    assert_eq!(verified.issuer, TEST_ISSUER);
    assert_eq!(verified.audience, vec![TEST_AUDIENCE.to_string()]);
}

#[tokio::test]
async fn test_audience_array_containing_expected_value() {
    let key = TestKeypair::primary();
    let jwks = MockJwksServer::start().await;
    jwks.serve_keys(&[&key], 1).await;
    let validator = validator_for(&jwks);

    let token = TestTokenBuilder::new()
        .with_audience(json!(["other-api", TEST_AUDIENCE]))
        .signed_by(&key);

    let verified = validator.validate(&token).await.unwrap();
    assert_eq!(verified.audience.len(), 2);
}

#[tokio::test]
async fn test_second_validation_does_not_fetch() {
    let key = TestKeypair::primary();
    let jwks = MockJwksServer::start().await;
    jwks.serve_keys(&[&key], 1).await;
    let validator = validator_for(&jwks);

    let token = TestTokenBuilder::new().signed_by(&key);
    validator.validate(&token).await.unwrap();
    validator.validate(&token).await.unwrap();
}

#[tokio::test]
async fn test_foreign_audience_or_issuer_never_fetches() {
    let key = TestKeypair::primary();
    let jwks = MockJwksServer::start().await;
    jwks.serve_keys(&[&key], 0).await;
    let validator = validator_for(&jwks);

    let wrong_aud = TestTokenBuilder::new()
        .with_audience(json!("other-api"))
        .signed_by(&key);
    assert_eq!(
        validator.validate(&wrong_aud).await,
        Err(AuthError::ClaimMismatch("aud"))
    );

    let wrong_iss = TestTokenBuilder::new()
        .with_issuer("https://evil.example.com/")
        .signed_by(&key);
    assert_eq!(
        validator.validate(&wrong_iss).await,
        Err(AuthError::ClaimMismatch("iss"))
    );

    let no_aud = TestTokenBuilder::new().without_claim("aud").signed_by(&key);
    assert_eq!(
        validator.validate(&no_aud).await,
        Err(AuthError::ClaimMismatch("aud"))
    );
}

#[tokio::test]
async fn test_expired_token() {
    let key = TestKeypair::primary();
    let jwks = MockJwksServer::start().await;
    jwks.serve_keys(&[&key], 1).await;
    let validator = validator_for(&jwks);

    let token = TestTokenBuilder::new().expires_in(-3600).signed_by(&key);
    assert_eq!(
        validator.validate(&token).await,
        Err(AuthError::TokenExpired)
    );
}

#[tokio::test]
async fn test_expiry_within_clock_skew_is_accepted() {
    let key = TestKeypair::primary();
    let jwks = MockJwksServer::start().await;
    jwks.serve_keys(&[&key], 1).await;
    let validator = validator_for(&jwks);

    let token = TestTokenBuilder::new().expires_in(-5).signed_by(&key);
    assert!(validator.validate(&token).await.is_ok());
}

#[tokio::test]
async fn test_missing_exp_is_rejected() {
    let key = TestKeypair::primary();
    let jwks = MockJwksServer::start().await;
    jwks.serve_keys(&[&key], 1).await;
    let validator = validator_for(&jwks);

    let token = TestTokenBuilder::new().without_claim("exp").signed_by(&key);
    assert_eq!(
        validator.validate(&token).await,
        Err(AuthError::MalformedClaims)
    );
}

#[tokio::test]
async fn test_not_yet_valid_token() {
    let key = TestKeypair::primary();
    let jwks = MockJwksServer::start().await;
    jwks.serve_keys(&[&key], 1).await;
    let validator = validator_for(&jwks);

    let token = TestTokenBuilder::new().not_before_in(3600).signed_by(&key);
    assert!(validator.validate(&token).await.is_err());
}

#[tokio::test]
async fn test_signature_from_other_key_is_invalid() {
    // The rotated key signs, but the key set publishes the primary
    // certificate under the rotated kid.
    let impostor = TestKeypair::rotated();
    let published = TestKeypair::primary().with_kid(impostor.kid());
    let jwks = MockJwksServer::start().await;
    jwks.serve_keys(&[&published], 1).await;
    let validator = validator_for(&jwks);

    let token = TestTokenBuilder::new().signed_by(&impostor);
    assert_eq!(
        validator.validate(&token).await,
        Err(AuthError::SignatureInvalid)
    );
}

#[tokio::test]
async fn test_tampered_payload_is_invalid() {
    let key = TestKeypair::primary();
    let jwks = MockJwksServer::start().await;
    jwks.serve_keys(&[&key], 1).await;
    let validator = validator_for(&jwks);

    let genuine = TestTokenBuilder::new().for_subject("alice").signed_by(&key);
    let forged_payload = TestTokenBuilder::new().for_subject("mallory").unsigned();

    let genuine_parts: Vec<&str> = genuine.split('.').collect();
    let forged_parts: Vec<&str> = forged_payload.split('.').collect();
    let tampered = format!(
        "{}.{}.{}",
        genuine_parts[0], forged_parts[1], genuine_parts[2]
    );

    assert_eq!(
        validator.validate(&tampered).await,
        Err(AuthError::SignatureInvalid)
    );
}

#[tokio::test]
async fn test_non_rs256_algorithm_is_rejected_before_fetch() {
    let key = TestKeypair::primary();
    let jwks = MockJwksServer::start().await;
    jwks.serve_keys(&[&key], 0).await;
    let validator = validator_for(&jwks);

    let mut header = Header::new(Algorithm::RS512);
    header.kid = Some(key.kid().to_string());
    let token = key.sign_with_header(&header, &TestTokenBuilder::new().build());

    assert_eq!(
        validator.validate(&token).await,
        Err(AuthError::SignatureInvalid)
    );
}

#[tokio::test]
async fn test_unknown_kid() {
    let key = TestKeypair::primary();
    let jwks = MockJwksServer::start().await;
    jwks.serve_keys(&[&key], 1).await;
    let validator = validator_for(&jwks);

    let token = TestTokenBuilder::new().signed_by(&TestKeypair::rotated());
    assert_eq!(
        validator.validate(&token).await,
        Err(AuthError::UnknownKeyId)
    );
}

#[tokio::test]
async fn test_malformed_tokens() {
    let jwks = MockJwksServer::start().await;
    jwks.serve_status(500, 0).await;
    let validator = validator_for(&jwks);

    for token in ["", "a.b", "a.b.c.d", "not a token"] {
        assert_eq!(
            validator.validate(token).await,
            Err(AuthError::MalformedToken),
            "{token:?}"
        );
    }

    let oversized = format!("{}.b.c", "a".repeat(9000));
    assert_eq!(
        validator.validate(&oversized).await,
        Err(AuthError::MalformedToken)
    );
}

#[tokio::test]
async fn test_endpoint_down_fails_closed() {
    let key = TestKeypair::primary();
    let jwks = MockJwksServer::start().await;
    jwks.serve_status(502, 1).await;
    let validator = validator_for(&jwks);

    let token = TestTokenBuilder::new().signed_by(&key);
    assert!(matches!(
        validator.validate(&token).await,
        Err(AuthError::KeySetFetchFailed(_))
    ));
}

#[tokio::test]
async fn test_slow_endpoint_times_out() {
    let key = TestKeypair::primary();
    let jwks = MockJwksServer::start().await;
    jwks.serve_keys_delayed(&[&key], Duration::from_secs(3)).await;
    let validator = validator_for(&jwks);

    let token = TestTokenBuilder::new().signed_by(&key);
    assert_eq!(
        validator.validate(&token).await,
        Err(AuthError::ResolutionTimedOut)
    );
}
