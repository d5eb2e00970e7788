//! CallHub Server: real-time signaling and presence for voice/video calls.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

use callhub_api::{AppState, build_router};
use callhub_auth::JwtCredentialService;
use callhub_core::config::{AppConfig, DatabaseProvider};
use callhub_core::error::AppError;
use callhub_core::traits::{CallStore, UserDirectory};
use callhub_database::{
    DatabasePool, MemoryCallStore, MemoryUserDirectory, PgCallStore, PgUserDirectory,
};
use callhub_realtime::RealtimeEngine;

#[tokio::main]
async fn main() {
    let env = std::env::var("CALLHUB_ENV").unwrap_or_else(|_| "development".to_string());

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
        tracing::error!("Server error: {}", e);
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
    tracing::info!("Starting CallHub v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Persistence adapters ─────────────────────────────
    let (directory, store, pool) = build_adapters(&config).await?;

    // ── Step 2: Credential verification ──────────────────────────
    let credentials = Arc::new(JwtCredentialService::new(&config.auth));

    // ── Step 3: Signaling engine ─────────────────────────────────
    let engine = Arc::new(RealtimeEngine::new(&config, directory, store));
    engine.start().await;

    // ── Step 4: HTTP server ──────────────────────────────────────
    let address = config.server.bind_address();
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let state = AppState::new(Arc::new(config), engine.clone(), credentials);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("HTTP server listening on {}", address);

    let shutdown_engine = engine.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            if let Err(e) = shutdown_engine.shutdown().await {
                tracing::error!("Engine shutdown failed: {}", e);
            }
        })
        .await?;

    // ── Step 5: Drain ────────────────────────────────────────────
    if let Some(pool) = pool {
        if tokio::time::timeout(grace, pool.close()).await.is_err() {
            tracing::warn!("Database pool did not close within the grace period");
        }
    }

    tracing::info!("CallHub server stopped");
    Ok(())
}

/// Selects the directory and call store implementations.
async fn build_adapters(
    config: &AppConfig,
) -> Result<
    (
        Arc<dyn UserDirectory>,
        Arc<dyn CallStore>,
        Option<DatabasePool>,
    ),
    AppError,
> {
    match config.database.provider {
        DatabaseProvider::Memory => {
            tracing::warn!("Using in-memory persistence; data is lost on restart");
            Ok((
                Arc::new(MemoryUserDirectory::new()),
                Arc::new(MemoryCallStore::new()),
                None,
            ))
        }
        DatabaseProvider::Postgres => {
            let pool = DatabasePool::connect(&config.database).await?;
            if config.database.run_migrations {
                callhub_database::migration::run_migrations(pool.pool()).await?;
            }
            Ok((
                Arc::new(PgUserDirectory::new(pool.pool().clone())),
                Arc::new(PgCallStore::new(pool.pool().clone())),
                Some(pool),
            ))
        }
    }
}

/// Waits for Ctrl+C (and SIGTERM on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to listen for SIGTERM: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
