//! Checkpoint API models and DTOs
//!
//! Listing reuses [`waypoint_store::CheckpointSummary`] directly; only the
//! delete acknowledgement needs a shape of its own.

use serde::{Deserialize, Serialize};

/// Acknowledgement returned after deleting a checkpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointDeleted {
    pub id: String,
    pub deleted: bool,
}
