//! Liveness handlers.

use axum::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

pub async fn root() -> Json<Value> {
    Json(json!({ "ok": true, "msg": "malfit api" }))
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}
