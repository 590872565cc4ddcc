//! Path derivation for catalog nodes.
//!
//! Every non-root node's path is its parent's path joined with its name.
//! The root folder's path is `/`.

use std::sync::Arc;

use clouddisk_core::error::AppError;
use clouddisk_core::result::AppResult;
use clouddisk_core::types::FolderId;
use clouddisk_database::repositories::FolderRepository;

use crate::lock::{PathGuard, PathLocks};

/// Longest accepted node name, in bytes.
pub const MAX_NAME_BYTES: usize = 255;

/// Resolves folder identifiers to their stored paths.
#[derive(Debug, Clone)]
pub struct PathResolver {
    folder_repo: Arc<FolderRepository>,
}

impl PathResolver {
    /// Creates a new path resolver.
    pub fn new(folder_repo: Arc<FolderRepository>) -> Self {
        Self { folder_repo }
    }

    /// Path of the folder with this id, or `NotFound`.
    pub async fn resolve_path(&self, folder_id: FolderId) -> AppResult<String> {
        self.folder_repo.find_path(folder_id).await
    }

    /// Lock the path of child `name` under `parent_id`.
    ///
    /// Returns the parent path, the child path and the held lock. If the
    /// parent moved while waiting, the paths are derived again.
    pub async fn lock_child(
        &self,
        locks: &PathLocks,
        parent_id: FolderId,
        name: &str,
    ) -> AppResult<(String, String, PathGuard)> {
        loop {
            let parent_path = self.resolve_path(parent_id).await?;
            let path = compose_child_path(&parent_path, name)?;
            let guard = locks.lock(&path).await;
            if self.resolve_path(parent_id).await? == parent_path {
                return Ok((parent_path, path, guard));
            }
        }
    }
}

/// Reject names that cannot be a single path segment.
pub fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::validation("Name cannot be empty"));
    }
    if name == "." || name == ".." {
        return Err(AppError::validation(format!("Name '{name}' is reserved")));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(AppError::validation(format!(
            "Name '{}' must not contain path separators or NUL",
            name.escape_debug()
        )));
    }
    if name.len() > MAX_NAME_BYTES {
        return Err(AppError::validation(format!(
            "Name exceeds {MAX_NAME_BYTES} bytes"
        )));
    }
    Ok(())
}

/// Join a parent path and a child name without validation.
pub fn join(parent_path: &str, name: &str) -> String {
    let parent = parent_path.trim_end_matches('/');
    format!("{parent}/{name}")
}

/// Validate `name` and join it under `parent_path`.
pub fn compose_child_path(parent_path: &str, name: &str) -> AppResult<String> {
    validate_name(name)?;
    Ok(join(parent_path, name))
}

/// Parent of a stored path; `None` for the root.
pub fn parent_path_of(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&trimmed[..idx]),
        None => None,
    }
}
