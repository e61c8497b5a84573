//! Observability for Keygate.
//!
//! # Components
//!
//! - `metrics` - Prometheus metrics for key resolution and token validation

pub mod metrics;
