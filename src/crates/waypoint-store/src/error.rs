//! Error types for store operations

use thiserror::Error;

use crate::snapshot::SnapshotError;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur while reading or writing durable state
#[derive(Error, Debug)]
pub enum StoreError {
    /// No checkpoint exists for the given key
    #[error("Checkpoint not found: {0}")]
    CheckpointNotFound(String),

    /// No pending overlay exists for the given key
    #[error("Overlay not found: {0}")]
    OverlayNotFound(String),

    /// Key would escape the store directory or is empty
    #[error("Invalid store key: '{0}'")]
    InvalidKey(String),

    /// Filesystem failure, wrapped with the operation and key for diagnosis
    #[error("Failed to {op} for key '{key}': {source}")]
    Io {
        op: &'static str,
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored snapshot did not have the expected shape
    #[error("Checkpoint '{key}': {source}")]
    Snapshot {
        key: String,
        #[source]
        source: SnapshotError,
    },
}

impl StoreError {
    /// Whether this error represents a missing record rather than a failure
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::CheckpointNotFound(_) | StoreError::OverlayNotFound(_)
        )
    }
}
