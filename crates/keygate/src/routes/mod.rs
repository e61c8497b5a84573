//! HTTP routes for Keygate.
//!
//! Defines the Axum router and application state.

use crate::auth::{Authorizer, KeyResolver, TokenValidator};
use crate::config::Config;
use crate::handlers;
use crate::middleware::{propagate_correlation_id, require_auth, AuthState};
use axum::{
    middleware,
    routing::{delete, get},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

pub use crate::observability::metrics::init_metrics_recorder;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Key resolver (shared with the validator).
    pub resolver: Arc<KeyResolver>,

    /// Token validator used by the auth middleware.
    pub validator: Arc<TokenValidator>,

    /// Business authorization helpers.
    pub authorizer: Authorizer,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness probe - public
/// - `/metrics` - Prometheus metrics endpoint - public
/// - `/v1/me` - Current caller - requires authentication
/// - `/v1/admin/jwks-cache` (DELETE) - Key set cache bust - requires
///   authentication and the admin scope
/// - Correlation id propagation
/// - TraceLayer for request logging
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let auth_state = Arc::new(AuthState {
        validator: state.validator.clone(),
    });

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .with_state(state.clone());

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/v1/me", get(handlers::get_me))
        .route("/v1/admin/jwks-cache", delete(handlers::bust_jwks_cache))
        .route_layer(middleware::from_fn_with_state(auth_state, require_auth))
        .with_state(state);

    // Layer order (innermost first):
    // 1. TraceLayer - Log request details
    // 2. TimeoutLayer - Timeout the request
    // 3. propagate_correlation_id - Tag request and response (outermost)
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(propagate_correlation_id))
}
