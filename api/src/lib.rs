//! HTTP front for the RAG chat: proxies `/v1/qa`, `/v1/qa/stream` and
//! `/v1/transcribe` to the backend and serves the chat page.

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use tokio::{net::TcpListener, signal};
use tracing::{error, info};

pub mod core;
pub mod error_handler;
mod middleware_layer;
mod routes;

use crate::{
    core::app_state::{AppState, ProxyConfig},
    error_handler::{AppError, AppResult},
    middleware_layer::request_trace::trace_requests,
    routes::{
        chat_page_route::chat_page_route,
        health_route::health_route,
        qa::{qa_route::qa_route, qa_stream_route::qa_stream_route},
        transcribe::transcribe_route::transcribe_route,
    },
};

/// Builds the full router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_upload_bytes;
    Router::new()
        .route("/", get(chat_page_route))
        .route("/chat", get(chat_page_route))
        .route("/health", get(health_route))
        .route("/v1/qa", post(qa_route))
        .route("/v1/qa/stream", post(qa_stream_route))
        .route(
            "/v1/transcribe",
            post(transcribe_route).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .layer(middleware::from_fn(trace_requests))
        .with_state(state)
}

/// Binds `config.bind_addr` and serves until Ctrl+C.
pub async fn start(config: ProxyConfig) -> AppResult<()> {
    let addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config)?);

    let listener = TcpListener::bind(&addr).await.map_err(AppError::Bind)?;
    info!(%addr, backend = %state.config.backend_base, "proxy listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    info!("proxy stopped");
    Ok(())
}

/// Resolves on Ctrl+C. If the handler cannot be installed the server just
/// runs until killed.
async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
