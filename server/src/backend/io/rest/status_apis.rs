//! # REST API for Service Status

use axum::{response::Json, routing::get, Router};
use tracing::info;

use crate::backend::AppState;
use shared::StatusResponse;

/// Create a router for the status API
pub fn router() -> Router<AppState> {
    Router::new().route("/status", get(get_status))
}

/// Liveness probe
pub async fn get_status() -> Json<StatusResponse> {
    info!("GET /api/v1/status");
    Json(StatusResponse {
        status: "OK".to_string(),
    })
}
