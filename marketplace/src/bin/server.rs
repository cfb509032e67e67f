//! Marketplace HTTP server.
//!
//! This binary:
//! - Lists the seed catalog in the in-memory store
//! - Starts the order services and the lifecycle driver
//! - Re-arms lifecycle jobs that were pending at the last stop
//! - Serves the HTTP API and the WebSocket channel
//!
//! # Usage
//!
//! ```bash
//! CATALOG_PATH=marketplace/fixtures/catalog.json LIFECYCLE_STEP_SECS=10 \
//!   cargo run --bin server
//! ```

use axum::http::HeaderValue;
use librix_core::environment::SystemClock;
use librix_runtime::{metrics::MetricsServer, RunnerError};
use librix_web::RoomHub;
use marketplace::{
    app::{LocalImageStore, Services},
    config::Config,
    notifications::RoomFanOut,
    server::{build_router, AppState},
    store::{CatalogSeed, Repositories},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.server.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        addr = %config.bind_addr(),
        step_secs = config.lifecycle.step_secs,
        metrics = config.server.metrics_enabled,
        "Configuration loaded"
    );

    if config.server.metrics_enabled {
        let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.metrics_port).parse()?;
        MetricsServer::new(addr).start()?;
    }

    let repos = Repositories::in_memory();
    if let Some(path) = &config.storage.catalog_path {
        let listed = CatalogSeed::from_path(path)
            .await?
            .install(repos.catalog.as_ref())
            .await?;
        info!(path = %path.display(), listed, "Catalog seeded");
    }

    let hub = RoomHub::new();
    let services = Arc::new(Services::start(
        repos,
        Arc::new(RoomFanOut::new(hub.clone())),
        Arc::new(SystemClock),
        config.lifecycle_timings(),
        Arc::new(LocalImageStore::new(
            &config.storage.upload_dir,
            config.storage.upload_public_base.clone(),
        )),
    ));

    // A no-op with in-memory repositories; persistent ones carry jobs over.
    let recovered = services.scheduler.recover().await?;
    if recovered > 0 {
        info!(recovered, "Pending lifecycle jobs re-armed");
    }

    let state = AppState::new(
        services.clone(),
        Arc::new(config.token_keys()),
        hub,
        config.storage.upload_dir.clone(),
    );
    let app = build_router(state).layer(cors_layer(&config.server.cors_allowed_origins));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    match services.shutdown(config.shutdown_timeout()).await {
        Ok(()) => {},
        Err(RunnerError::TimersAbandoned(count)) => {
            warn!(count, "Lifecycle timers abandoned; their jobs resume at next start");
        },
        Err(e) => error!(error = %e, "Runner shutdown failed"),
    }

    info!("Server stopped");
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            },
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Graceful shutdown signal handler.
///
/// Waits for:
/// - Ctrl+C (SIGINT)
/// - SIGTERM (in production environments)
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
            },
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
