//! Confirmation endpoint handlers
//!
//! A confirmation writes the overlay the resumed run will consume. On
//! `confirm` the suspended snapshot is approved as-is; on `reject` the
//! pending tool call's arguments are replaced first, both in the registry's
//! in-memory record and in the durable checkpoint, and the overlay carries
//! the amended snapshot. Neither action resumes the execution.

use axum::{extract::State, Json};

use crate::api::{
    error::{ApiError, ApiResult},
    models::confirmation::{ConfirmAction, ConfirmRequest},
    models::execution::ExecutionView,
};

/// Approve or amend the pending tool call of an interrupted execution
///
/// POST /api/confirm
pub async fn confirm(
    State(app_state): State<crate::api::routes::AppState>,
    Json(req): Json<ConfirmRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    req.validate()?;

    let record = match req.action {
        ConfirmAction::Confirm => {
            let record = app_state
                .registry
                .get(&req.execution_id)
                .await
                .ok_or_else(|| {
                    ApiError::NotFound(format!("Execution not found: {}", req.execution_id))
                })?;
            let snapshot = record.snapshot.as_ref().ok_or_else(|| {
                ApiError::BadRequest(format!(
                    "Execution {} has no pending confirmation",
                    req.execution_id
                ))
            })?;
            app_state
                .overlays
                .save(&record.checkpoint_key, snapshot)
                .await?;

            tracing::info!("Confirmed pending tool call for execution: {}", req.execution_id);
            record
        }
        ConfirmAction::Reject => {
            // validate() guarantees new_args is present here.
            let new_args = req.new_args.as_deref().unwrap_or_default();
            let record = app_state
                .registry
                .update_tool_arguments(&req.execution_id, new_args)
                .await?;
            app_state
                .overlays
                .patch_checkpoint_args(&record.checkpoint_key, new_args)
                .await?;
            let snapshot = record.snapshot.as_ref().ok_or_else(|| {
                ApiError::BadRequest(format!(
                    "Execution {} has no pending confirmation",
                    req.execution_id
                ))
            })?;
            app_state
                .overlays
                .save(&record.checkpoint_key, snapshot)
                .await?;

            tracing::info!(
                "Rejected pending tool call with amended arguments for execution: {}",
                req.execution_id
            );
            record
        }
    };

    Ok(Json(ExecutionView::from_record(record)))
}
