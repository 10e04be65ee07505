//! Liveness endpoint.

use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Tokens with a published image.
    pub cached_tokens: usize,
    /// Tokens currently being rendered.
    pub renders_in_flight: usize,
}

/// GET /health - Liveness and a summary of pipeline state.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        cached_tokens: state.orchestrator.cache().len().await,
        renders_in_flight: state.orchestrator.in_flight(),
    })
}
