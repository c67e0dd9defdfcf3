//! Confirmation API models and DTOs

use serde::{Deserialize, Serialize};

/// Operator decision on a pending tool call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmAction {
    /// Approve the pending call as proposed
    Confirm,
    /// Replace the pending call's arguments before approval
    Reject,
}

/// Request to confirm or amend a pending tool call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmRequest {
    /// Execution awaiting confirmation (required)
    pub execution_id: String,

    /// Whether to approve as-is or with amended arguments
    pub action: ConfirmAction,

    /// Replacement arguments, JSON-encoded; required when rejecting
    pub new_args: Option<String>,
}

impl ConfirmRequest {
    /// Validate the confirm request
    pub fn validate(&self) -> crate::api::error::ApiResult<()> {
        crate::api::middleware::validation::validate_not_empty(&self.execution_id, "execution_id")?;
        if self.action == ConfirmAction::Reject {
            let new_args = self.new_args.as_deref().unwrap_or_default();
            crate::api::middleware::validation::validate_not_empty(new_args, "new_args")?;
            crate::api::middleware::validation::validate_json_object(new_args, "new_args")?;
        }
        Ok(())
    }
}
