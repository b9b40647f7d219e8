//! Liveness endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use order_store::Backend;
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Open WebSocket connections.
    pub connections: usize,
}

/// GET /health
pub async fn check<S: Backend>(State(state): State<Arc<AppState<S>>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        connections: state.hub.connection_count(),
    })
}
