//! Cleanup of physical entries that have no catalog row.

use tracing::warn;

use clouddisk_core::result::AppResult;
use clouddisk_core::traits::mirror::FilesystemMirror;

/// Remove whatever sits at `path` in the mirror.
///
/// Only call after the catalog has been checked to hold nothing at `path`.
pub(crate) async fn clear_orphan(mirror: &dyn FilesystemMirror, path: &str) -> AppResult<()> {
    if let Some(kind) = mirror.entry_kind(path).await? {
        warn!(path, kind = ?kind, "Removing orphaned physical entry");
        mirror.remove_tree(path).await?;
    }
    Ok(())
}
