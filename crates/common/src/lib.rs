//! Common utilities and types shared across Keygate components.

#![warn(clippy::pedantic)]

/// Module for common configuration
pub mod config;

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for token-shape utilities (size limit, segment split, `kid` extraction)
pub mod jwt;
