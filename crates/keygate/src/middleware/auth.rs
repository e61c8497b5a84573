//! Authentication middleware for protected routes.
//!
//! Extracts the Bearer token from the Authorization header, validates it
//! with the [`TokenValidator`], and injects the verified token into request
//! extensions.

use crate::auth::TokenValidator;
use crate::errors::KeygateError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use common::secret::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::instrument;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    /// Token validator backed by the key resolver.
    pub validator: Arc<TokenValidator>,
}

/// The raw bearer token of an authenticated request.
///
/// Kept for the authorization helpers, which work on the raw token.
#[derive(Clone)]
pub struct BearerToken(pub SecretString);

impl BearerToken {
    /// The raw token.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

/// Authentication middleware that validates bearer tokens.
///
/// # Authorization Header Format
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// # Response
///
/// - Returns 401 Unauthorized with WWW-Authenticate header if the token is
///   missing or fails any validation step
/// - Continues to the next handler with
///   [`VerifiedToken`](crate::auth::VerifiedToken) and [`BearerToken`] in
///   extensions if the token is valid
#[instrument(skip(state, req, next), name = "keygate.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, KeygateError> {
    let token = bearer_token(&req)?;

    let verified = state.validator.validate(&token).await?;

    req.extensions_mut().insert(verified);
    req.extensions_mut()
        .insert(BearerToken(SecretString::from(token)));

    Ok(next.run(req).await)
}

fn bearer_token(req: &Request) -> Result<String, KeygateError> {
    let auth_header = req
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::debug!(target: "keygate.middleware.auth", "Missing Authorization header");
            KeygateError::Unauthorized
        })?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            tracing::debug!(target: "keygate.middleware.auth", "Invalid Authorization header format");
            KeygateError::Unauthorized
        })?;

    Ok(token.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with_auth(value: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/v1/me");
        if let Some(v) = value {
            builder = builder.header("authorization", v);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_auth_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AuthState>();
    }

    #[test]
    fn test_bearer_token_extracted() {
        let req = request_with_auth(Some("Bearer a.b.c"));
        assert_eq!(bearer_token(&req).unwrap(), "a.b.c");
    }

    #[test]
    fn test_bearer_token_missing_header() {
        let req = request_with_auth(None);
        assert!(matches!(bearer_token(&req), Err(KeygateError::Unauthorized)));
    }

    #[test]
    fn test_bearer_token_wrong_scheme() {
        for value in ["Basic dXNlcjpwYXNz", "bearer a.b.c", "Bearer ", "a.b.c"] {
            let req = request_with_auth(Some(value));
            assert!(
                matches!(bearer_token(&req), Err(KeygateError::Unauthorized)),
                "{value} should be rejected"
            );
        }
    }

    #[test]
    fn test_bearer_token_exposes_raw_value() {
        let bearer = BearerToken(SecretString::from("a.b.c".to_string()));
        assert_eq!(bearer.expose(), "a.b.c");
    }
}
