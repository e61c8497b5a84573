//! Prometheus metrics endpoint handler.
//!
//! The endpoint is unauthenticated so Prometheus can scrape it. Labels are
//! bounded outcome names; no token material or subject appears in metrics.

use axum::{extract::State, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

/// Handler for GET /metrics
///
/// ```text
/// # TYPE keygate_token_validations_total counter
/// keygate_token_validations_total{outcome="valid"} 42
/// ```
#[tracing::instrument(skip_all, name = "keygate.metrics.scrape")]
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}
