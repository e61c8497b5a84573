//! Test server harness for E2E testing
//!
//! Provides TestKeygateServer for spawning real Keygate server instances in
//! tests.

use crate::token_builders::{TEST_AUDIENCE, TEST_ISSUER};
use keygate::auth::{KeyResolver, TokenValidator};
use keygate::cache::KeyCache;
use keygate::config::Config;
use keygate::routes::{self, init_metrics_recorder, AppState};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Service name the test server is configured with.
pub const TEST_SERVICE_NAME: &str = "keygate-test";

/// Admin scope the test server is configured with.
pub const TEST_ADMIN_SCOPE: &str = "keygate:admin";

/// Test harness for spawning a Keygate server in E2E tests.
///
/// # Example
/// ```rust,ignore
/// let jwks = MockJwksServer::start().await;
/// jwks.serve_keys(&[&TestKeypair::primary()], 1).await;
/// let server = TestKeygateServer::spawn(&jwks.url(), Arc::new(InMemoryKeyCache::new())).await?;
///
/// let response = reqwest::Client::new()
///     .get(format!("{}/v1/me", server.url()))
///     .bearer_auth(token)
///     .send()
///     .await?;
/// ```
pub struct TestKeygateServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    _handle: JoinHandle<()>,
}

impl TestKeygateServer {
    /// Spawn a server validating against `jwks_url` with the default test
    /// configuration.
    pub async fn spawn(jwks_url: &str, cache: Arc<dyn KeyCache>) -> Result<Self, anyhow::Error> {
        Self::spawn_with_vars(jwks_url, cache, HashMap::new()).await
    }

    /// Spawn a server with extra configuration variables layered over the
    /// test defaults.
    pub async fn spawn_with_vars(
        jwks_url: &str,
        cache: Arc<dyn KeyCache>,
        overrides: HashMap<String, String>,
    ) -> Result<Self, anyhow::Error> {
        let mut vars = HashMap::from([
            ("SERVICE_NAME".to_string(), TEST_SERVICE_NAME.to_string()),
            ("ENVIRONMENT".to_string(), "test".to_string()),
            ("JWKS_URL".to_string(), jwks_url.to_string()),
            ("JWKS_AUDIENCE".to_string(), TEST_AUDIENCE.to_string()),
            ("JWKS_ISSUER".to_string(), TEST_ISSUER.to_string()),
            ("ADMIN_SCOPE".to_string(), TEST_ADMIN_SCOPE.to_string()),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("KEYGATE_DRAIN_SECONDS".to_string(), "0".to_string()),
        ]);
        vars.extend(overrides);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Invalid test configuration: {}", e))?;

        let resolver = Arc::new(KeyResolver::new(config.resolver_config(), cache));
        let validator = Arc::new(TokenValidator::new(
            config.validator_config(),
            resolver.clone(),
        ));
        let authorizer = config.authorizer();

        let state = Arc::new(AppState {
            config,
            resolver,
            validator,
            authorizer,
        });

        // The global recorder can only be installed once per process; later
        // servers get a standalone handle.
        let metrics_handle = match init_metrics_recorder() {
            Ok(handle) => handle,
            Err(_) => {
                use metrics_exporter_prometheus::PrometheusBuilder;
                PrometheusBuilder::new().build_recorder().handle()
            }
        };

        let app = routes::build_routes(state.clone(), metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            state,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// The running server's key resolver.
    pub fn resolver(&self) -> &KeyResolver {
        &self.state.resolver
    }
}

impl Drop for TestKeygateServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
