//! Durable persistence for suspended executions
//!
//! This crate owns the two on-disk record types of the confirmation
//! workflow:
//!
//! - [`CheckpointStore`] - the canonical snapshot of a suspended
//!   computation, one `<key>.json` file per key, fully replaced on every
//!   write.
//! - [`OverlayStore`] - a transient `<key>.confirm.json` companion holding
//!   a human-edited snapshot until the next resume consumes it.
//!
//! Both stores share one flat data directory and the same write
//! discipline: serialize, write to a temp sibling, atomically rename into
//! place. Records are pretty-printed JSON so that operators can inspect
//! them and so the targeted patch operation
//! ([`OverlayStore::patch_checkpoint_args`]) can rewrite one nested field
//! without understanding the rest of the document.
//!
//! The [`snapshot`] module holds the only interpretation this crate does
//! of a snapshot's content: locating pending tool calls along
//! `message_history[*].tool_calls[*]`.
//!
//! # Example
//!
//! ```rust,no_run
//! use waypoint_store::{CheckpointStore, OverlayStore};
//!
//! # async fn demo() -> waypoint_store::Result<()> {
//! let checkpoints = CheckpointStore::new("./checkpoints_data")?;
//! let overlays = OverlayStore::new("./checkpoints_data")?;
//!
//! checkpoints.set("exec-1", b"{\"stage\":\"confirm_booking\"}").await?;
//! if let Some(blob) = checkpoints.get("exec-1").await? {
//!     assert!(!blob.is_empty());
//! }
//! assert!(!overlays.exists("exec-1").await);
//! # Ok(())
//! # }
//! ```

pub mod checkpoint;
pub mod error;
pub mod overlay;
pub mod snapshot;

mod paths;

pub use checkpoint::{CheckpointStore, CheckpointSummary};
pub use error::{Result, StoreError};
pub use overlay::OverlayStore;
pub use snapshot::{
    message_history, patch_last_pending_call, pending_tool_calls, PendingToolCall, SnapshotError,
};
