//! Wiremock-backed key set publication endpoint.
//!
//! Expectations set with `expected_fetches` are verified when the server is
//! dropped, so a test fails if the resolver fetched more (or fewer) times
//! than it should have.

use crate::keys::{jwks_json, TestKeypair};
use serde_json::Value;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate, Times};

/// Path the key set is published at.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// A mock key set publication endpoint.
///
/// # Example
/// ```rust,ignore
/// let jwks = MockJwksServer::start().await;
/// jwks.serve_keys(&[&TestKeypair::primary()], 1).await;
/// let resolver = KeyResolver::new(ResolverConfig::new(jwks.url(), scheme), cache);
/// ```
pub struct MockJwksServer {
    server: MockServer,
}

impl MockJwksServer {
    /// Start a server with nothing mounted (every request gets 404).
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Full key set URL.
    pub fn url(&self) -> String {
        format!("{}{}", self.server.uri(), JWKS_PATH)
    }

    /// Publish `keys`, expecting exactly `expected_fetches` requests.
    pub async fn serve_keys(&self, keys: &[&TestKeypair], expected_fetches: impl Into<Times>) {
        self.respond(
            ResponseTemplate::new(200).set_body_json(jwks_json(keys)),
            expected_fetches,
        )
        .await;
    }

    /// Publish an arbitrary JSON body.
    pub async fn serve_json(&self, body: Value, expected_fetches: impl Into<Times>) {
        self.respond(
            ResponseTemplate::new(200).set_body_json(body),
            expected_fetches,
        )
        .await;
    }

    /// Respond with a bare status code.
    pub async fn serve_status(&self, status: u16, expected_fetches: impl Into<Times>) {
        self.respond(ResponseTemplate::new(status), expected_fetches)
            .await;
    }

    /// Publish `keys` after `delay`.
    pub async fn serve_keys_delayed(&self, keys: &[&TestKeypair], delay: Duration) {
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(jwks_json(keys))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    /// Remove every mounted response and recorded request.
    pub async fn reset(&self) {
        self.server.reset().await;
    }

    async fn respond(&self, template: ResponseTemplate, expected_fetches: impl Into<Times>) {
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(template)
            .expect(expected_fetches)
            .mount(&self.server)
            .await;
    }
}
