//! HTTP surface of the RAG chat backend.
//!
//! - `POST /api/chat`   streaming chat (UI message stream over SSE)
//! - `POST /api/rag`    similarity search
//! - `POST /api/upload` multipart PDF ingestion
//! - `GET  /health`     store and provider status

use std::{env, sync::Arc};

pub mod core;
pub mod error_handler;
pub mod middleware_layer;
pub mod routes;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::{
    core::app_state::AppState,
    error_handler::AppError,
    middleware_layer::{json_extractor::json_error_mapper, request_id::ensure_request_id},
    routes::{
        chat::chat_route::chat_route, health::health_route, rag::search_route::search_route,
        upload::upload_route::upload_route,
    },
};

pub const DEFAULT_API_ADDRESS: &str = "0.0.0.0:3000";

/// Builds the router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let upload_limit = state.upload_max_bytes;

    Router::new()
        .route("/api/chat", post(chat_route))
        .route("/api/rag", post(search_route))
        .route(
            "/api/upload",
            post(upload_route).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/health", get(health_route))
        .layer(middleware::from_fn(json_error_mapper))
        .layer(middleware::from_fn(ensure_request_id))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Loads state from the environment and serves until Ctrl+C.
pub async fn start() -> Result<(), AppError> {
    let host_url = env::var("API_ADDRESS").unwrap_or_else(|_| DEFAULT_API_ADDRESS.to_string());

    let state = Arc::new(AppState::from_env().await?);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&host_url)
        .await
        .map_err(AppError::Bind)?;
    info!(address = %host_url, "api: listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    info!("api: stopped");
    Ok(())
}

/// Resolves when Ctrl+C is pressed.
async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
