//! Health check handler

use crate::api::types::HealthResponse;
use axum::Json;

/// Liveness probe; does not touch Azure
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
