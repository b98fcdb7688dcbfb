//! Application entry point and server initialization
//!
//! This module contains the main function that:
//! - Loads environment configuration
//! - Opens the catalog database and seeds it when empty
//! - Starts the backup scheduler
//! - Starts the HTTP server with graceful shutdown support

use std::sync::Arc;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use storefront::backup::{BackupJob, BackupScheduler};
use storefront::config::Config;
use storefront::database::{AppState, CatalogStore};
use storefront::retry::{with_retry, RetryConfig};
use storefront::route::create_app;

/// Application entry point
///
/// See [`Config`] for the environment variables that are read.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if it exists
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("storefront=debug,tower_http=debug")),
        )
        .init();

    let config = Config::load();

    let catalog = with_retry(&RetryConfig::default(), || async {
        CatalogStore::open(&config.database_path)
    })
    .await?;
    info!("Using database: {}", config.database_path.display());

    let seeded = catalog.seed_if_empty()?;

    let job = Arc::new(
        BackupJob::new(&config.backup_dir, &config.database_path)
            .with_retention(config.backup_retention),
    );
    if seeded {
        // Failures are logged by the job; the server starts regardless
        let _ = job.backup_products(Some(&catalog)).await;
    }
    let scheduler = BackupScheduler::new(
        job,
        catalog.clone(),
        config.backup_check_interval,
        config.backup_interval,
    )
    .spawn();

    let port = config.port;
    let state = AppState::new(catalog, config)?;
    let app = create_app(state).layer(TraceLayer::new_for_http());

    // Bind to all network interfaces on the specified port
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server running at http://localhost:{}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.abort();
    Ok(())
}

/// Handles graceful shutdown signals
///
/// Returns when SIGINT (Ctrl+C) or, on Unix, SIGTERM is received. Open
/// connections are allowed to complete before the process exits.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    // On non-Unix systems (Windows), only handle Ctrl+C
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping server.");
}
