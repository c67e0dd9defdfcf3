//! Pending-overlay storage for human-edited snapshots
//!
//! An overlay is a short-lived companion record holding a human-edited
//! snapshot that has not yet been merged into the canonical checkpoint. It
//! lives next to the checkpoint as `<key>.confirm.json` and exists only
//! between "edit submitted" and "next resume consumes it". Presence of the
//! overlay is the signal that a resume should rehydrate from the edited
//! state instead of the last-persisted one.

use std::path::PathBuf;

use serde_json::Value;
use tokio::fs;

use crate::error::{Result, StoreError};
use crate::paths::{checkpoint_path, overlay_path, validate_key, write_atomic};
use crate::snapshot;

/// File-backed store for pending human edits
#[derive(Debug, Clone)]
pub struct OverlayStore {
    base_dir: PathBuf,
}

impl OverlayStore {
    /// Open an overlay store rooted at `base_dir`, creating the directory
    /// if needed. Shares the directory with [`crate::CheckpointStore`].
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir).map_err(|source| StoreError::Io {
            op: "create store directory",
            key: base_dir.display().to_string(),
            source,
        })?;
        Ok(Self { base_dir })
    }

    /// Persist a pending snapshot for `key`, replacing any prior overlay.
    pub async fn save(&self, key: &str, snapshot: &Value) -> Result<()> {
        validate_key(key)?;
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        let path = overlay_path(&self.base_dir, key);
        write_atomic(&path, &bytes, "save overlay", key).await?;
        tracing::debug!(key = %key, "overlay saved");
        Ok(())
    }

    /// Load the pending snapshot for `key`. Unlike a checkpoint read, a
    /// missing overlay is an error kind: callers branch on it to fall back
    /// to the checkpoint.
    pub async fn load(&self, key: &str) -> Result<Value> {
        validate_key(key)?;
        let bytes = match fs::read(overlay_path(&self.base_dir, key)).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::OverlayNotFound(key.to_string()));
            }
            Err(source) => {
                return Err(StoreError::Io {
                    op: "read overlay",
                    key: key.to_string(),
                    source,
                });
            }
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Remove the pending snapshot for `key`. Removing a missing overlay
    /// is not an error.
    pub async fn remove(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        match fs::remove_file(overlay_path(&self.base_dir, key)).await {
            Ok(()) => {
                tracing::debug!(key = %key, "overlay removed");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                op: "delete overlay",
                key: key.to_string(),
                source,
            }),
        }
    }

    /// Whether a pending overlay exists for `key`.
    pub async fn exists(&self, key: &str) -> bool {
        if validate_key(key).is_err() {
            return false;
        }
        fs::try_exists(overlay_path(&self.base_dir, key))
            .await
            .unwrap_or(false)
    }

    /// Rewrite the arguments of the most recent pending tool call inside
    /// the *already-persisted checkpoint* for `key`.
    ///
    /// This is a targeted patch, not an overlay write: it lets an operator
    /// amend a committed checkpoint without going through a resume cycle.
    /// Fails with [`StoreError::CheckpointNotFound`] if no checkpoint
    /// exists and with [`StoreError::Snapshot`] if the stored history
    /// carries no pending tool call.
    pub async fn patch_checkpoint_args(&self, key: &str, new_args: &str) -> Result<()> {
        validate_key(key)?;
        let path = checkpoint_path(&self.base_dir, key);

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::CheckpointNotFound(key.to_string()));
            }
            Err(source) => {
                return Err(StoreError::Io {
                    op: "read checkpoint",
                    key: key.to_string(),
                    source,
                });
            }
        };

        let mut document: Value = serde_json::from_slice(&bytes)?;
        snapshot::patch_last_pending_call(&mut document, new_args).map_err(|source| {
            StoreError::Snapshot {
                key: key.to_string(),
                source,
            }
        })?;

        let patched = serde_json::to_vec_pretty(&document)?;
        write_atomic(&path, &patched, "patch checkpoint", key).await?;
        tracing::info!(key = %key, "checkpoint arguments patched");
        Ok(())
    }
}
