//! Error types for registry and driver operations.

use thiserror::Error;
use waypoint_store::SnapshotError;

use crate::execution::ExecutionStatus;

/// Result type for waypoint-core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors surfaced by the execution registry.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No execution is registered under the given id.
    #[error("Execution not found: {0}")]
    NotFound(String),

    /// A resume (or re-run) was requested for an execution that is not
    /// waiting at an interrupt.
    #[error("Cannot resume execution {id} in status: {status}")]
    NotInterrupted { id: String, status: ExecutionStatus },

    /// A driver outcome arrived for an execution that is no longer running.
    #[error("Execution {id} is not running (status: {status})")]
    NotRunning { id: String, status: ExecutionStatus },

    /// A tool-argument update was requested while no suspended snapshot is
    /// attached to the record.
    #[error("Execution {0} has no suspended snapshot")]
    NoSnapshot(String),

    /// The suspended snapshot has no pending tool call to update.
    #[error("Cannot update tool arguments for execution {id}: {source}")]
    NoPendingCall {
        id: String,
        #[source]
        source: SnapshotError,
    },
}
