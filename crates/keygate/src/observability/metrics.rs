//! Metrics definitions for Keygate.
//!
//! All metrics follow Prometheus naming conventions:
//! - `keygate_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Every label value comes from a fixed set in code:
//! - `outcome` (cache lookups): hit, miss, corrupt, error
//! - `status` (fetches): success, error, invalid
//! - `outcome` (validations): valid, or an `AuthError` label

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus recorder and return the handle used by
/// `/metrics`.
///
/// Must be called before any metrics are recorded. Fetch buckets cover the
/// 10 second HTTP client timeout.
///
/// # Errors
///
/// Returns an error if the recorder cannot be installed (e.g. already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("keygate_jwks_fetch".to_string()),
            &[
                0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set JWKS fetch buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

/// Record a key-set cache lookup.
///
/// Metric: `keygate_jwks_cache_lookups_total`
/// Labels: `outcome`
pub fn record_cache_lookup(outcome: &'static str) {
    counter!("keygate_jwks_cache_lookups_total", "outcome" => outcome).increment(1);
}

/// Record a live key-set fetch.
///
/// Metric: `keygate_jwks_fetch_total`, `keygate_jwks_fetch_duration_seconds`
/// Labels: `status`
pub fn record_jwks_fetch(status: &'static str, duration: Duration) {
    histogram!("keygate_jwks_fetch_duration_seconds", "status" => status)
        .record(duration.as_secs_f64());
    counter!("keygate_jwks_fetch_total", "status" => status).increment(1);
}

/// Record a token validation outcome.
///
/// Metric: `keygate_token_validations_total`
/// Labels: `outcome`
pub fn record_token_validation(outcome: &'static str) {
    counter!("keygate_token_validations_total", "outcome" => outcome).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    // No recorder is installed in unit tests; the metrics facade drops
    // everything. These only check that recording never panics.

    #[test]
    fn test_record_cache_lookup() {
        for outcome in ["hit", "miss", "corrupt", "error"] {
            record_cache_lookup(outcome);
        }
    }

    #[test]
    fn test_record_jwks_fetch() {
        record_jwks_fetch("success", Duration::from_millis(40));
        record_jwks_fetch("error", Duration::from_secs(10));
        record_jwks_fetch("invalid", Duration::ZERO);
    }

    #[test]
    fn test_record_token_validation() {
        record_token_validation("valid");
        record_token_validation("unknown_key_id");
    }

    #[test]
    fn test_token_validation_renders_outcome_label() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            record_token_validation("valid");
            record_token_validation("valid");
            record_token_validation("token_expired");
        });

        let rendered = handle.render();
        assert!(rendered.contains(r#"keygate_token_validations_total{outcome="valid"} 2"#));
        assert!(rendered.contains(r#"keygate_token_validations_total{outcome="token_expired"} 1"#));
    }
}
