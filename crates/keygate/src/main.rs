//! Keygate
//!
//! Validates bearer tokens against a published key set and serves the
//! key-set cache administration endpoints.

use keygate::auth::{KeyResolver, TokenValidator};
use keygate::cache::{InMemoryKeyCache, KeyCache, RedisKeyCache};
use keygate::config::Config;
use keygate::routes::{self, init_metrics_recorder, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting Keygate");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        service = %config.service_name,
        environment = %config.environment,
        bind_address = %config.bind_address,
        jwt_clock_skew_seconds = config.jwt_clock_skew_seconds,
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to install metrics recorder: {}", e);
        e
    })?;

    // Select the key cache backend
    let cache: Arc<dyn KeyCache> = match &config.redis {
        Some(redis_config) => {
            info!("Connecting to Redis...");
            let redis = RedisKeyCache::connect(redis_config).await.map_err(|e| {
                error!("Failed to connect to Redis: {}", e);
                e
            })?;
            info!("Redis connection established");
            Arc::new(redis)
        }
        None => {
            warn!("REDIS_URL not set, using in-process key cache");
            Arc::new(InMemoryKeyCache::new())
        }
    };

    let resolver = Arc::new(KeyResolver::new(config.resolver_config(), cache));
    let validator = Arc::new(TokenValidator::new(
        config.validator_config(),
        resolver.clone(),
    ));

    info!(
        jwks_url = %config.jwks_url,
        cache_key = %resolver.cache_key(),
        "Key resolver ready"
    );

    let bind_address = config.bind_address.clone();
    let drain_seconds = config.drain_seconds;
    let authorizer = config.authorizer();

    let state = Arc::new(AppState {
        config,
        resolver,
        validator,
        authorizer,
    });

    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Keygate listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(drain_seconds))
    .await?;

    info!("Keygate shutdown complete");

    Ok(())
}

/// Install the global subscriber. `LOG_FORMAT=json` selects JSON output.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "keygate=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    if matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Returns when a shutdown signal is received and drain period is complete.
async fn shutdown_signal(drain_seconds: u64) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    if drain_seconds > 0 {
        warn!("Draining connections for {} seconds...", drain_seconds);
        tokio::time::sleep(Duration::from_secs(drain_seconds)).await;
        info!("Drain period complete");
    } else {
        info!("Skipping drain period (KEYGATE_DRAIN_SECONDS=0)");
    }
}
