//! Health check handler.

use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

/// Response for `/health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always "healthy" while the process serves requests.
    pub status: String,

    /// Configured service name.
    pub service: String,
}

/// Liveness check.
///
/// Does not touch the key cache or the publication endpoint.
///
/// ## Example Response
///
/// ```json
/// {
///   "status": "healthy",
///   "service": "orders"
/// }
/// ```
#[instrument(skip_all, name = "keygate.health.check")]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: state.config.service_name.clone(),
    })
}
