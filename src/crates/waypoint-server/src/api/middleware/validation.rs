//! Request validation utilities
//!
//! Provides validation helpers for ensuring request data meets requirements.

use crate::api::error::{ApiError, ApiResult};

/// Validate that a required string field is not empty
pub fn validate_not_empty(value: &str, field_name: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::ValidationError(format!(
            "{} cannot be empty",
            field_name
        )));
    }
    Ok(())
}

/// Validate that a string field carries a JSON-encoded object
pub fn validate_json_object(value: &str, field_name: &str) -> ApiResult<()> {
    match serde_json::from_str::<serde_json::Value>(value) {
        Ok(parsed) if parsed.is_object() => Ok(()),
        _ => Err(ApiError::ValidationError(format!(
            "{} must be a JSON-encoded object",
            field_name
        ))),
    }
}
