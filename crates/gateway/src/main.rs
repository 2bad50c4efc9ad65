//! Global South Research Repository API Gateway
//!
//! Binary entry point: loads configuration, connects the Postgres store
//! and object storage, then serves the router from the library crate.

use anyhow::Context;
use backoff::{future::retry, ExponentialBackoff};
use gsr_common::{
    config::{AppConfig, DatabaseConfig, ObservabilityConfig},
    db::DbPool,
    metrics::{self, LATENCY_BUCKETS},
    ObjectStorage, ObjectStoreBackend, PaperStore, Repository,
};
use gsr_gateway::{
    create_router, middleware::rate_limit::spawn_pruner, spawn_listing_purger, AppState,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// How often idle rate-limit buckets are dropped
const RATE_LIMIT_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// How often expired listing memos are dropped
const LISTING_PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    init_tracing(&config.observability);

    info!(
        version = gsr_common::VERSION,
        service = %config.observability.service_name,
        "Starting research repository gateway"
    );

    let config = Arc::new(config);

    // Initialize metrics
    install_metrics_exporter(&config.observability)?;
    metrics::register_metrics();

    // Initialize database connection
    let db = connect_with_retry(&config.database).await?;
    if config.database.run_migrations {
        db.migrate().await?;
    }

    let store: Arc<dyn PaperStore> = Arc::new(Repository::new(db));
    let storage: Arc<dyn ObjectStorage> = Arc::new(ObjectStoreBackend::from_config(&config.storage)?);

    // Create app state
    let state = AppState::new(config.clone(), store, storage)?;
    if let Some(limiter) = &state.rate_limiter {
        spawn_pruner(limiter.clone(), RATE_LIMIT_PRUNE_INTERVAL);
    }
    spawn_listing_purger(state.catalog.clone(), LISTING_PURGE_INTERVAL);

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server.host / server.port")?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// JSON or human-readable logs; `RUST_LOG` overrides the configured level
fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

/// Prometheus scrape endpoint on its own port (0 disables it)
fn install_metrics_exporter(config: &ObservabilityConfig) -> anyhow::Result<()> {
    if config.metrics_port == 0 {
        info!("Metrics exporter disabled");
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], config.metrics_port))
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            LATENCY_BUCKETS,
        )?
        .install()
        .context("Failed to install Prometheus exporter")?;

    info!(port = config.metrics_port, "Metrics exporter listening");
    Ok(())
}

/// The database may come up after the gateway; keep trying for a minute
async fn connect_with_retry(config: &DatabaseConfig) -> anyhow::Result<DbPool> {
    let policy = ExponentialBackoff {
        max_elapsed_time: Some(Duration::from_secs(60)),
        ..Default::default()
    };

    let pool = retry(policy, || async {
        DbPool::new(config).await.map_err(|e| {
            warn!(error = %e, "Database not reachable, retrying");
            backoff::Error::transient(e)
        })
    })
    .await
    .context("Failed to connect to database")?;

    Ok(pool)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
