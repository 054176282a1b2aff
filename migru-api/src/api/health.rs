//! Health check endpoint

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use crate::AppState;

/// GET /health
///
/// Liveness check for monitoring; no authentication.
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "agents": {
            "voice_analysis": "active",
            "pattern_recognition": "active",
            "intervention": "active",
            "hume_integration": "active"
        }
    }))
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
