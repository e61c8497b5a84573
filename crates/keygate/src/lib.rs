//! Keygate Service Library
//!
//! Bearer token authentication and key resolution for HTTP services:
//!
//! - RS256 token validation against a remotely published key set (JWKS)
//! - Look-aside caching of the key set (Redis or in-process)
//! - Claims decoding where `scope` may be a string or an array of strings
//! - Customer and scope authorization predicates on raw tokens
//!
//! # Architecture
//!
//! ```text
//! request -> middleware::require_auth -> TokenValidator -> KeyResolver -> KeyCache
//!                                                                      -> JWKS endpoint (on miss)
//! ```
//!
//! # Modules
//!
//! - `auth` - Claims, key resolution, validation, authorization
//! - `cache` - Key cache trait and backends
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Authentication and correlation id middleware
//! - `observability` - Prometheus metrics
//! - `routes` - Axum router setup

pub mod auth;
pub mod cache;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod routes;
