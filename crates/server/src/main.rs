//! AgriCraft marketplace API server.
//!
//! Serves the farmer/buyer marketplace REST API.
//!
//! # Architecture
//!
//! - Axum web framework with a JSON-only surface
//! - JWT bearer authentication with rotating refresh tokens
//! - Pluggable persistence: `PostgreSQL` or a single-file JSON store,
//!   selected by `AGRICRAFT_STORE`

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use chrono::Duration;

use agricraft_server::config::{ServerConfig, StoreBackendConfig};
use agricraft_server::services::tokens::TokenService;
use agricraft_server::state::AppState;
use agricraft_server::store::{Store, json::JsonStore, postgres};

#[tokio::main]
async fn main() {
    // Load configuration from environment
    let config = ServerConfig::from_env().expect("Failed to load configuration");

    // Initialize tracing with EnvFilter
    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "agricraft_server=info,tower_http=debug".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    // Select and open the persistence backend
    let store: Arc<dyn Store> = match &config.store {
        StoreBackendConfig::Postgres { database_url } => {
            let pool = postgres::create_pool(database_url)
                .await
                .expect("Failed to create database pool");
            tracing::info!("Database pool created");
            // NOTE: Migrations are NOT run automatically on startup.
            // Run them explicitly via: cargo run -p agricraft-cli -- migrate
            Arc::new(postgres::PgStore::new(pool))
        }
        StoreBackendConfig::Json { path } => {
            let store = JsonStore::open(path.clone())
                .await
                .expect("Failed to open JSON store");
            tracing::info!(path = %path.display(), "JSON store opened");
            Arc::new(store)
        }
    };

    let tokens = TokenService::new(
        &config.access_secret,
        &config.refresh_secret,
        Duration::seconds(config.access_ttl_secs),
        Duration::seconds(config.refresh_ttl_secs),
    );

    let addr = config.socket_addr();
    let state = AppState::new(store, tokens);
    let app = agricraft_server::app(state);

    tracing::info!("agricraft listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
