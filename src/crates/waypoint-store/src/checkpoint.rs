//! Durable checkpoint blob storage
//!
//! One file per key under a flat data directory: `<key>.json`. A write
//! fully replaces the prior record. Writes go through a temp-file plus
//! atomic-rename sequence so a reader never observes a partially written
//! record, and a crash mid-write leaves the previous record intact. There
//! is no in-store locking: the confirmation protocol guarantees a single
//! logical writer per key, so concurrent writes are last-writer-wins.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{Result, StoreError};
use crate::paths::{
    checkpoint_path, validate_key, write_atomic, CHECKPOINT_SUFFIX, OVERLAY_SUFFIX, TEMP_SUFFIX,
};

/// Metadata for one durable checkpoint record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointSummary {
    /// The checkpoint key
    pub id: String,
    /// Last modification time of the record
    pub created_at: DateTime<Utc>,
    /// Size of the record in bytes
    pub size: u64,
}

/// File-backed store for execution checkpoints
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    base_dir: PathBuf,
}

impl CheckpointStore {
    /// Open a checkpoint store rooted at `base_dir`, creating the
    /// directory if needed.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir).map_err(|source| StoreError::Io {
            op: "create store directory",
            key: base_dir.display().to_string(),
            source,
        })?;
        Ok(Self { base_dir })
    }

    /// The directory holding checkpoint and overlay files.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Read the checkpoint for `key`. A missing record is `Ok(None)`, not
    /// an error.
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        match fs::read(checkpoint_path(&self.base_dir, key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                op: "read checkpoint",
                key: key.to_string(),
                source,
            }),
        }
    }

    /// Write (or fully replace) the checkpoint for `key`.
    pub async fn set(&self, key: &str, blob: &[u8]) -> Result<()> {
        validate_key(key)?;
        let path = checkpoint_path(&self.base_dir, key);
        write_atomic(&path, blob, "write checkpoint", key).await?;
        tracing::debug!(key = %key, bytes = blob.len(), "checkpoint written");
        Ok(())
    }

    /// Remove the checkpoint for `key`. Removing a missing record is not
    /// an error.
    pub async fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        match fs::remove_file(checkpoint_path(&self.base_dir, key)).await {
            Ok(()) => {
                tracing::debug!(key = %key, "checkpoint deleted");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                op: "delete checkpoint",
                key: key.to_string(),
                source,
            }),
        }
    }

    /// Enumerate checkpoint records, newest first. Overlay files and
    /// in-flight temp files are not checkpoints and are skipped.
    pub async fn list(&self) -> Result<Vec<CheckpointSummary>> {
        let mut entries = fs::read_dir(&self.base_dir)
            .await
            .map_err(|source| StoreError::Io {
                op: "list checkpoints",
                key: self.base_dir.display().to_string(),
                source,
            })?;

        let mut summaries = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| StoreError::Io {
                op: "list checkpoints",
                key: self.base_dir.display().to_string(),
                source,
            })?
        {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !name.ends_with(CHECKPOINT_SUFFIX)
                || name.ends_with(OVERLAY_SUFFIX)
                || name.ends_with(TEMP_SUFFIX)
            {
                continue;
            }
            let Some(id) = name.strip_suffix(CHECKPOINT_SUFFIX) else {
                continue;
            };

            let metadata = entry.metadata().await.map_err(|source| StoreError::Io {
                op: "stat checkpoint",
                key: id.to_string(),
                source,
            })?;
            let modified = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());

            summaries.push(CheckpointSummary {
                id: id.to_string(),
                created_at: modified,
                size: metadata.len(),
            });
        }

        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }
}
