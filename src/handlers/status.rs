use axum::{extract::State, Json};
use std::sync::Arc;

use crate::metrics::StatusSnapshot;
use crate::AppState;

// ─── GET /health ─────────────────────────────────────────────────

pub async fn health() -> &'static str {
    "ok"
}

// ─── GET /version ────────────────────────────────────────────────

pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// ─── GET /api/status ─────────────────────────────────────────────

/// Counters, poll latency quantiles and the last cycle's outcome.
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusSnapshot> {
    Json(state.status.snapshot())
}
