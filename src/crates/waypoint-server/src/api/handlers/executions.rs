//! Execution endpoint handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::api::{
    error::{ApiError, ApiResult},
    models::execution::{ExecuteRequest, ExecutionView, StageLogView, StateView},
};

/// Create a booking execution and start driving it
///
/// POST /api/execute
pub async fn execute(
    State(app_state): State<crate::api::routes::AppState>,
    Json(req): Json<ExecuteRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    req.validate()?;

    let checkpoint_key = Uuid::new_v4().to_string();
    let input = serde_json::to_value(&req)?;
    let record = app_state
        .registry
        .create(app_state.flow.clone(), checkpoint_key, input)
        .await;
    let record = app_state.registry.run(&record.id).await?;

    tracing::info!("Started execution: {}", record.id);
    Ok((StatusCode::CREATED, Json(ExecutionView::from_record(record))))
}

/// Resume an interrupted execution
///
/// POST /api/execute/:id/resume
pub async fn resume(
    State(app_state): State<crate::api::routes::AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let record = app_state.registry.run(&id).await?;

    tracing::info!("Resumed execution: {}", id);
    Ok(Json(ExecutionView::from_record(record)))
}

/// List all executions, newest first
///
/// GET /api/executions
pub async fn list_executions(
    State(app_state): State<crate::api::routes::AppState>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let views: Vec<ExecutionView> = app_state
        .registry
        .list()
        .await
        .into_iter()
        .map(ExecutionView::from_record)
        .collect();

    Ok(Json(views))
}

/// Fetch a single execution
///
/// GET /api/executions/:id
pub async fn get_execution(
    State(app_state): State<crate::api::routes::AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let record = app_state
        .registry
        .get(&id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Execution not found: {}", id)))?;

    Ok(Json(ExecutionView::from_record(record)))
}

/// Fetch the condensed state of an execution, including any tool calls
/// awaiting confirmation
///
/// GET /api/state/:id
pub async fn get_state(
    State(app_state): State<crate::api::routes::AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let record = app_state
        .registry
        .get(&id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Execution not found: {}", id)))?;

    Ok(Json(StateView::from_record(&record)))
}

/// Fetch the stage-by-stage progress log of an execution
///
/// GET /api/logs/:id
pub async fn get_logs(
    State(app_state): State<crate::api::routes::AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let record = app_state
        .registry
        .get(&id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Execution not found: {}", id)))?;

    Ok(Json(StageLogView {
        execution_id: record.id,
        entries: record.stage_log,
    }))
}
