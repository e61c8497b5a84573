//! Administrative key set cache handler.

use crate::errors::KeygateError;
use crate::middleware::BearerToken;
use crate::routes::AppState;
use axum::{extract::State, http::StatusCode, Extension};
use std::sync::Arc;
use tracing::instrument;

/// Handler for DELETE /v1/admin/jwks-cache
///
/// Deletes the cached key set so the next validation fetches it live.
/// The caller's token must carry the configured admin scope exactly; the
/// configured scope matching mode does not apply here.
///
/// # Response
///
/// - 204 No Content: entry deleted (or was already absent)
/// - 401 Unauthorized: invalid or missing token
/// - 403 Forbidden: admin scope missing
/// - 503 Service Unavailable: the cache backend failed
#[instrument(skip_all, name = "keygate.handlers.bust_jwks_cache")]
pub async fn bust_jwks_cache(
    State(state): State<Arc<AppState>>,
    Extension(bearer): Extension<BearerToken>,
) -> Result<StatusCode, KeygateError> {
    if !state
        .authorizer
        .has_exact_scope(bearer.expose(), &state.config.admin_scope)
    {
        tracing::debug!(target: "keygate.handlers.cache", "Cache bust denied: admin scope missing");
        return Err(KeygateError::Forbidden(
            "Missing required scope".to_string(),
        ));
    }

    state.resolver.invalidate().await?;

    tracing::info!(
        target: "keygate.handlers.cache",
        cache_key = %state.resolver.cache_key(),
        "Key set cache busted"
    );
    Ok(StatusCode::NO_CONTENT)
}
