use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::service::timestamp;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/health", get(health))
}

/// Liveness only; never touches the stores.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: timestamp(),
    })
}
