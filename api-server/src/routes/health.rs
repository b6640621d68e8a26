//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use tasktrack_core::pipeline::PipelineStatsSnapshot;

use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: String,
    version: String,
    bounded_queue: bool,
    pipeline: PipelineStatsSnapshot,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        bounded_queue: state.dispatcher().is_bounded(),
        pipeline: state.stats().snapshot(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
