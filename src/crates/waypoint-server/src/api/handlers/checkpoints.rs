//! Checkpoint endpoint handlers

use axum::{
    extract::{Path, State},
    Json,
};

use crate::api::{error::ApiResult, models::checkpoint::CheckpointDeleted};

/// List all persisted checkpoints, newest first
///
/// GET /api/checkpoints
pub async fn list_checkpoints(
    State(app_state): State<crate::api::routes::AppState>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let summaries = app_state.checkpoints.list().await?;
    Ok(Json(summaries))
}

/// Delete a checkpoint and any companion overlay
///
/// DELETE /api/checkpoints/:id
pub async fn delete_checkpoint(
    State(app_state): State<crate::api::routes::AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl axum::response::IntoResponse> {
    app_state.checkpoints.delete(&id).await?;
    app_state.overlays.remove(&id).await?;

    tracing::info!("Deleted checkpoint: {}", id);
    Ok(Json(CheckpointDeleted { id, deleted: true }))
}
