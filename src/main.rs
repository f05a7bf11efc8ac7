//! PDF Utilities Backend
//!
//! An HTTP service that merges multiple PDFs into one or compresses a single
//! PDF, for a browser front end. Compression prefers an external Ghostscript
//! binary and falls back to in-process lossless recompression.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::time::MissedTickBehavior;
use tracing::info;

use pdf_utilities_backend::api;
use pdf_utilities_backend::config::{Config, ScratchConfig};
use pdf_utilities_backend::state::{AppState, SharedState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load configuration
    let config = Config::from_env();
    info!("Configuration loaded: {:?}", config);

    // Initialize application state (scratch dir + backend probe)
    let state = Arc::new(AppState::initialize(&config).await?);

    // Remove anything a previous run left behind, then sweep periodically.
    let removed = state.scratch.sweep(config.scratch.retention()).await;
    if removed > 0 {
        info!(removed, "Startup sweep removed stale scratch files");
    }
    tokio::spawn(sweep_loop(state.clone(), config.scratch.clone()));

    // Build our application with routes
    let app = api::router(state, &config);

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

    info!("Server shutdown complete");
    Ok(())
}

/// Background retention sweep for the scratch directory.
///
/// Runs forever; deletion eligibility is keyed on both file age and the
/// store's active set, so it never races with an in-flight request.
async fn sweep_loop(state: SharedState, scratch: ScratchConfig) {
    let mut interval = tokio::time::interval(scratch.sweep_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately and the startup sweep already ran.
    interval.tick().await;

    loop {
        interval.tick().await;
        let removed = state.scratch.sweep(scratch.retention()).await;
        if removed > 0 {
            info!(removed, "Scratch sweep removed stale files");
        }
    }
}

/// Handle graceful shutdown signals (Ctrl+C, SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
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
