// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Router assembly and server startup.

use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::handlers;
use crate::rag::{QuizGenerator, RagService, SessionManager};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub rag: Arc<RagService>,
    pub sessions: Arc<SessionManager>,
    pub quiz: Arc<QuizGenerator>,
    pub corpus_dir: PathBuf,
    pub embedding_model: String,
    pub generation_model: String,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route("/query", post(handlers::query_handler))
        .route("/query_full", post(handlers::query_full_handler))
        .route("/upload", post(handlers::upload_handler))
        .route("/temp_query", post(handlers::temp_query_handler))
        .route("/clear_temp", get(handlers::clear_temp_handler))
        .route("/check_temp_status", get(handlers::check_temp_status_handler))
        .route("/quiz", post(handlers::quiz_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(
    state: AppState,
    listen_addr: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_router(state);

    let addr = listen_addr.parse::<SocketAddr>()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("RAG node listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install shutdown handler");
    }
    info!("shutdown signal received");
}
