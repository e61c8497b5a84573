//! # Keygate Test Utilities
//!
//! Shared test utilities for Keygate.
//!
//! This crate provides:
//! - Fixed RSA signing keys with self-signed certificates
//! - Token builders (signed and unsigned)
//! - A wiremock-backed key set endpoint (MockJwksServer)
//! - Instrumented and failing `KeyCache` doubles
//! - Server test harness (TestKeygateServer for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use keygate_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let key = TestKeypair::primary();
//!     let jwks = MockJwksServer::start().await;
//!     jwks.serve_keys(&[&key], 1).await;
//!
//!     let token = TestTokenBuilder::new()
//!         .for_subject("alice")
//!         .with_scope("read")
//!         .signed_by(&key);
//! }
//! ```

pub mod cache_doubles;
pub mod fixtures;
pub mod jwks_server;
pub mod keys;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use cache_doubles::*;
pub use jwks_server::*;
pub use keys::*;
pub use server_harness::*;
pub use token_builders::*;
