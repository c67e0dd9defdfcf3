//! Health check endpoint handlers

use axum::Json;

use crate::api::models::health::HealthResponse;

/// Liveness probe
///
/// GET /api/health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::current())
}
