//! HTTP request handlers for Keygate.

pub mod cache;
pub mod health;
pub mod me;
pub mod metrics;

pub use cache::bust_jwks_cache;
pub use health::health_check;
pub use me::get_me;
pub use metrics::metrics_handler;
