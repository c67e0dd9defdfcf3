//! API error types and HTTP response conversion
//!
//! Provides custom error types for API operations with conversion to Axum
//! HTTP responses. Store and registry errors are mapped to the appropriate
//! HTTP status codes: not-found to 404, bad state and protocol violations
//! to 400, persistence failures to 500.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use waypoint_core::CoreError;
use waypoint_store::StoreError;

/// API error response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Error type identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for programmatic handling
    pub code: String,
}

impl ApiErrorResponse {
    /// Create a new API error response
    pub fn new(error: impl Into<String>, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            code: code.into(),
        }
    }
}

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

/// Custom API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Validation error
    #[error("Validation failed: {0}")]
    ValidationError(String),

    /// Internal server error
    #[error("Internal server error: {0}")]
    InternalError(String),

    /// Checkpoint or overlay store error
    #[error("Storage error: {0}")]
    StorageError(#[from] StoreError),

    /// Execution registry error
    #[error("Execution error: {0}")]
    RegistryError(#[from] CoreError),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(String),
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::StorageError(store_err) => {
                if store_err.is_not_found() {
                    StatusCode::NOT_FOUND
                } else if matches!(store_err, StoreError::Snapshot { .. }) {
                    StatusCode::BAD_REQUEST
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
            ApiError::RegistryError(core_err) => match core_err {
                CoreError::NotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::BAD_REQUEST,
            },
            ApiError::JsonError(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Get the error code identifier
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::StorageError(store_err) => {
                if store_err.is_not_found() {
                    "STORE_NOT_FOUND"
                } else if matches!(store_err, StoreError::Snapshot { .. }) {
                    "STORE_SNAPSHOT"
                } else {
                    "STORE_ERROR"
                }
            }
            ApiError::RegistryError(core_err) => match core_err {
                CoreError::NotFound(_) => "EXECUTION_NOT_FOUND",
                CoreError::NotInterrupted { .. } => "NOT_INTERRUPTED",
                CoreError::NotRunning { .. } => "NOT_RUNNING",
                CoreError::NoSnapshot(_) => "NO_SNAPSHOT",
                CoreError::NoPendingCall { .. } => "NO_PENDING_CALL",
            },
            ApiError::JsonError(_) => "JSON_ERROR",
        }
    }

    /// Get the error type name
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NotFound",
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::ValidationError(_) => "ValidationError",
            ApiError::InternalError(_) => "InternalError",
            ApiError::StorageError(_) => "StorageError",
            ApiError::RegistryError(_) => "RegistryError",
            ApiError::JsonError(_) => "JsonError",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ApiErrorResponse::new(self.error_type(), self.to_string(), self.code());

        tracing::error!("API Error: {:?}", body);

        (status, Json(body)).into_response()
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::JsonError(err.to_string())
    }
}
