//! HTTP middleware for Keygate.
//!
//! # Components
//!
//! - `auth` - Bearer token authentication for protected routes
//! - `correlation` - `X-Correlation-ID` propagation

pub mod auth;
pub mod correlation;

pub use auth::{require_auth, AuthState, BearerToken};
pub use correlation::{propagate_correlation_id, CorrelationId};
