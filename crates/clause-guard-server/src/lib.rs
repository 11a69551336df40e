//! HTTP service for Clause Guard: accounts, document uploads and analysis history.

pub mod auth;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod settings;
pub mod state;
pub mod upload;

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use db::Database;
pub use error::ApiError;
pub use settings::Settings;
pub use state::{build_scorer, AppState};

/// Multipart framing overhead allowed on top of the document size limit.
const MULTIPART_OVERHEAD_BYTES: usize = 16 * 1024;

pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state
        .settings
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route("/dashboard", get(handlers::dashboard))
        .route("/analyze", post(handlers::analyze))
        .route("/delete-log/:id", post(handlers::delete_log))
        .route("/admin", get(handlers::admin))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until `shutdown` resolves.
pub async fn serve<F>(state: Arc<AppState>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = state.settings.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(
        addr = %listener.local_addr()?,
        phrases = state.scorer.phrases().len(),
        "clause-guard server listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}
