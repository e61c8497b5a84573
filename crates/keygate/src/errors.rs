//! Keygate HTTP error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl. Every
//! token validation failure becomes the same 401 response; the specific
//! reason is logged server-side only.

use crate::auth::AuthError;
use crate::cache::CacheError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Value of the `WWW-Authenticate` header on 401 responses.
pub const WWW_AUTHENTICATE_VALUE: &str = "Bearer realm=\"keygate\", error=\"invalid_token\"";

/// Keygate error type.
///
/// Maps to HTTP status codes:
/// - Unauthorized: 401 Unauthorized
/// - Forbidden: 403 Forbidden
/// - ServiceUnavailable: 503 Service Unavailable
#[derive(Debug, Error)]
pub enum KeygateError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for KeygateError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            KeygateError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Unauthorized".to_string(),
            ),
            KeygateError::Forbidden(reason) => {
                (StatusCode::FORBIDDEN, "FORBIDDEN", reason.clone())
            }
            KeygateError::ServiceUnavailable(reason) => {
                tracing::warn!(target: "keygate.availability", reason = %reason, "Service unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Service temporarily unavailable".to_string(),
                )
            }
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) = WWW_AUTHENTICATE_VALUE.parse() {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}

/// Collapse every validation failure into the uniform 401.
impl From<AuthError> for KeygateError {
    fn from(err: AuthError) -> Self {
        tracing::debug!(
            target: "keygate.auth",
            reason = err.as_label(),
            error = %err,
            "Token rejected"
        );
        KeygateError::Unauthorized
    }
}

impl From<CacheError> for KeygateError {
    fn from(err: CacheError) -> Self {
        KeygateError::ServiceUnavailable(err.to_string())
    }
}
