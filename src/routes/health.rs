use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let scheduler = if state.scheduler.is_running() {
        "running"
    } else {
        "stopped"
    };

    Json(json!({
        "status": "ok",
        "service": "neon-casino-backend",
        "version": env!("CARGO_PKG_VERSION"),
        "scheduler": scheduler
    }))
}
