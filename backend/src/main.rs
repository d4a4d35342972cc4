//! EvePlanner Backend
//!
//! A REST API for an event-planning site: users, their events and files
//! uploaded for those events, plus statistics and a health check.

use eveplanner_backend::config::Config;
use eveplanner_backend::router::build_router;
use eveplanner_backend::services::UploadStorage;
use eveplanner_backend::state::AppState;
use eveplanner_backend::store::{EventStore, SqliteStore};
use eveplanner_backend::workers::upload_reconcile_worker;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load configuration
    let config = Config::from_env();
    info!("Configuration loaded: {:?}", config);

    // Open the database and upload directory
    let store: Arc<dyn EventStore> =
        Arc::new(SqliteStore::new(&config.persistence.database_path).await?);
    info!(
        "Database ready at {}",
        config.persistence.database_path.display()
    );

    let uploads = UploadStorage::new(config.persistence.upload_dir.clone());
    uploads.init().await?;
    info!("Upload directory ready at {}", uploads.root().display());

    // Background sweep of unreferenced upload objects
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let reconcile_handle = tokio::spawn(upload_reconcile_worker(
        store.clone(),
        uploads.clone(),
        config.reconcile.interval_secs,
        shutdown_rx,
    ));

    let app_state = AppState::from_config(store, uploads, &config);
    let app = build_router(app_state, config.server.static_dir.clone());

    // Bind to address from config
    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid server address: {}", e))?;

    info!("🚀 Server running on http://{}", addr);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    // Setup graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The worker may already have exited when periodic sweeps are disabled
    let _ = shutdown_tx.send(());
    if let Err(e) = reconcile_handle.await {
        warn!("Reconcile worker ended abnormally: {}", e);
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Handle graceful shutdown signals (Ctrl+C, SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}
