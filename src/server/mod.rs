use std::{sync::Arc, time::Duration};

use axum::{routing::get, Router};
use dotenvy::dotenv;
use thiserror::Error;
use tokio::{net::TcpListener, sync::Mutex};
use tower_http::{
    catch_panic::CatchPanicLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer,
};

use crate::config::{ConfigError, ServerConfig};
use crate::store::{self, StoreError};
use handlers::{health_check, project_query_get, project_query_post, query_get, query_post};

pub mod handlers;
pub mod models;

/// Query documents are small; anything larger is refused outright.
const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    /// The engine is synchronous, so requests take turns on one connection.
    pub db: Arc<Mutex<rusqlite::Connection>>,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(conn: rusqlite::Connection, config: ServerConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            config,
        }
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to open graph store: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to bind HTTP listener to {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("HTTP server error: {0}")]
    Serve(std::io::Error),
}

pub fn router(state: Arc<AppState>) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs);
    Router::new()
        .route("/health", get(health_check))
        .route("/api/1/query", get(query_get).post(query_post))
        .route(
            "/api/1/projects/{slug}/query",
            get(project_query_get).post(project_query_post),
        )
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(timeout))
        .layer(CatchPanicLayer::new())
        .with_state(state)
}

/// Run with configuration read from `GRANO_QL_*` variables (and `.env`).
pub async fn run() -> Result<(), ServerError> {
    dotenv().ok();
    let config = ServerConfig::from_env()?;
    run_with_config(config).await
}

pub async fn run_with_config(config: ServerConfig) -> Result<(), ServerError> {
    log::info!(
        "Server configuration: http={}:{}, database={}, timeout={}s",
        config.http_host,
        config.http_port,
        config.database_path,
        config.request_timeout_secs
    );

    let conn = store::open(&config.database_path)?;
    store::migrate(&conn)?;

    let address = format!("{}:{}", config.http_host, config.http_port);
    let state = Arc::new(AppState::new(conn, config));

    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| ServerError::Bind {
            address: address.clone(),
            source,
        })?;
    log::info!("Listening on http://{}", address);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)?;

    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Received shutdown signal, shutting down...");
}
