//! CloudDisk server.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use clouddisk_core::config::AppConfig;
use clouddisk_core::error::AppError;
use clouddisk_core::traits::mirror::FilesystemMirror;
use clouddisk_database::{DatabasePool, run_migrations};
use clouddisk_storage::LocalFilesystem;

#[tokio::main]
async fn main() {
    let env = std::env::var("CLOUDDISK_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!(kind = %e.kind, "Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting CloudDisk v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Storage root ─────────────────────────────────────
    let mirror = LocalFilesystem::new(&config.storage.root_path).await?;
    tracing::info!(root = %mirror.root().display(), "Storage root ready");
    let mirror: Arc<dyn FilesystemMirror> = Arc::new(mirror);

    // ── Step 2: Catalog connection + migrations ──────────────────
    tracing::info!("Connecting to catalog...");
    let db = DatabasePool::connect(&config.database).await?;

    run_migrations(db.pool()).await?;
    tracing::info!("Catalog migrations complete");

    // ── Step 3: Build and start HTTP server ──────────────────────
    let addr = config.server.bind_addr();
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);

    let state = clouddisk_api::build_state(config, db.clone(), mirror);
    let app = clouddisk_api::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("CloudDisk server listening on {}", addr);

    // ── Step 4: Graceful shutdown ────────────────────────────────
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
            })
            .await
    });

    let served = tokio::select! {
        result = &mut server => Some(result),
        _ = shutdown_signal() => None,
    };

    let result = match served {
        Some(result) => result,
        None => {
            tracing::info!("Shutdown signal received, starting graceful shutdown...");
            let _ = shutdown_tx.send(true);
            match tokio::time::timeout(grace, &mut server).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        grace_seconds = grace.as_secs(),
                        "Grace period elapsed, aborting open connections"
                    );
                    server.abort();
                    Ok(Ok(()))
                }
            }
        }
    };

    db.close().await;

    match result {
        Ok(Ok(())) => {
            tracing::info!("CloudDisk server shut down gracefully");
            Ok(())
        }
        Ok(Err(e)) => Err(AppError::internal(format!("Server error: {e}"))),
        Err(e) => Err(AppError::internal(format!("Server task failed: {e}"))),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
