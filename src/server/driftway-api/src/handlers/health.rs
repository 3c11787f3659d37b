//! Liveness and backend status.

use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::proxy::ServicesHealth;
use crate::AppState;

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "api-gateway",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// `GET /health/services`
pub async fn services(State(state): State<AppState>) -> Json<ServicesHealth> {
    Json(state.proxy.health_status().await)
}
