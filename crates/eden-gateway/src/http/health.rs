use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health — liveness probe, returns server metadata.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "viewers": state.registry.len(),
        "max_viewers": state.registry.max_connections(),
        "devices": state.catalog.len(),
        "delivery": state.dispatcher.counters(),
    }))
}
