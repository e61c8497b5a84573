//! Current caller handler.
//!
//! Returns the verified subject and the decoded scopes of the bearer token.

use crate::auth::{decode_claims, VerifiedToken};
use crate::middleware::BearerToken;
use axum::{Extension, Json};
use serde::Serialize;
use tracing::instrument;

/// Response for `/v1/me` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    /// Subject (customer or client ID).
    pub sub: String,

    /// Token scopes. Empty when the scope claim is absent.
    pub scopes: Vec<String>,

    /// Token expiration timestamp.
    pub exp: i64,
}

/// Handler for GET /v1/me
///
/// Requires valid authentication via the auth middleware.
///
/// ## Response
///
/// ```json
/// {
///   "sub": "3f2504e0-4f89-11d3-9a0c-0305e82c3301",
///   "scopes": ["read", "user_journey"],
///   "exp": 1234567890
/// }
/// ```
#[instrument(skip_all, name = "keygate.handlers.me")]
pub async fn get_me(
    Extension(verified): Extension<VerifiedToken>,
    Extension(bearer): Extension<BearerToken>,
) -> Json<MeResponse> {
    let scopes = match decode_claims(bearer.expose()) {
        Ok(claims) => claims.scopes().to_vec(),
        Err(e) => {
            tracing::debug!(target: "keygate.handlers.me", error = %e, "Token has no usable scope claim");
            Vec::new()
        }
    };

    Json(MeResponse {
        sub: verified.subject,
        scopes,
        exp: verified.expires_at,
    })
}
