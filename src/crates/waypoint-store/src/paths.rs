//! File layout shared by the checkpoint and overlay stores

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::{Result, StoreError};

/// Suffix of the primary checkpoint blob for a key.
pub(crate) const CHECKPOINT_SUFFIX: &str = ".json";

/// Suffix of the companion overlay blob for a key.
pub(crate) const OVERLAY_SUFFIX: &str = ".confirm.json";

/// Suffix appended to a target path while a write is in flight.
pub(crate) const TEMP_SUFFIX: &str = ".tmp";

/// Reject keys that are empty or could escape the store directory.
pub(crate) fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.contains('/') || key.contains('\\') || key.contains("..") {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

pub(crate) fn checkpoint_path(base_dir: &Path, key: &str) -> PathBuf {
    base_dir.join(format!("{}{}", key, CHECKPOINT_SUFFIX))
}

pub(crate) fn overlay_path(base_dir: &Path, key: &str) -> PathBuf {
    base_dir.join(format!("{}{}", key, OVERLAY_SUFFIX))
}

/// Sibling temp path for `path`, in the same directory so the rename
/// never crosses a filesystem boundary.
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

/// Write `bytes` to a temp sibling of `path` and atomically rename it into
/// place. A crash between the write and the rename leaves the previous
/// record (or no record) behind, never a truncated one.
pub(crate) async fn write_atomic(
    path: &Path,
    bytes: &[u8],
    op: &'static str,
    key: &str,
) -> Result<()> {
    let tmp = temp_path(path);

    fs::write(&tmp, bytes).await.map_err(|source| StoreError::Io {
        op,
        key: key.to_string(),
        source,
    })?;

    if let Err(source) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(StoreError::Io {
            op,
            key: key.to_string(),
            source,
        });
    }

    Ok(())
}
