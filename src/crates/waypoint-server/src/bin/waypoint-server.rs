//! Waypoint server binary
//!
//! Standalone server exposing the execution registry, the confirmation
//! workflow and the checkpoint store over HTTP and WebSocket.

use clap::Parser;
use std::sync::Arc;

use waypoint_core::{EventHub, ExecutionRegistry};
use waypoint_server::api::routes::{create_router, AppState};
use waypoint_server::config::ServerConfig;
use waypoint_server::flow::TravelBookingFlow;
use waypoint_store::{CheckpointStore, OverlayStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing/logging
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(rust_log).init();

    let config = ServerConfig::parse();
    tracing::info!("Data directory: {}", config.data_dir.display());

    // File stores share one directory; checkpoints and overlays are told
    // apart by suffix.
    let checkpoints = CheckpointStore::new(&config.data_dir)?;
    let overlays = OverlayStore::new(&config.data_dir)?;

    let registry = ExecutionRegistry::new(EventHub::new());
    let flow = Arc::new(TravelBookingFlow::new(checkpoints.clone(), overlays.clone()));

    tracing::info!("Building API router");
    let app = create_router(AppState {
        registry,
        checkpoints,
        overlays,
        flow,
    });

    let addr = config.bind_addr();
    tracing::info!("Starting waypoint server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Waypoint server shut down gracefully");
    Ok(())
}

/// Signal for graceful shutdown (Ctrl-C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL-C signal handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl-C, shutting down");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}
