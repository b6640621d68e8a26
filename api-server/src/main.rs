//! API Server for Tasktrack
//!
//! Serves the task REST API and runs the background worker that completes
//! submitted tasks.

mod config;
mod routes;
mod state;

use anyhow::Context;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tasktrack_core::pipeline::{self, PipelineStats, Worker};
use tasktrack_core::task::SqliteTaskStore;

use crate::config::ServerConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "tasktrack_server=debug,tasktrack_core=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    tracing::info!("Using database: {:?}", config.db_path);

    let task_store = Arc::new(
        SqliteTaskStore::open(&config.db_path)
            .with_context(|| format!("failed to open database {:?}", config.db_path))?,
    );

    // Single worker for the lifetime of the process
    let stats = Arc::new(PipelineStats::new());
    let (dispatcher, receiver) = pipeline::channel(config.queue_capacity, Arc::clone(&stats));
    let _worker = Worker::new(task_store.clone(), receiver, Arc::clone(&stats))
        .with_delay(config.processing_delay)
        .spawn();
    match config.queue_capacity {
        Some(capacity) => tracing::info!("Dispatch queue bounded to {} tasks", capacity),
        None => tracing::info!("Dispatch queue unbounded"),
    }

    let app_state = AppState::new(task_store, dispatcher, stats);

    let app = Router::new()
        .merge(routes::health::router())
        .merge(routes::task::router())
        .with_state(app_state)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("Server running on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
