//! Folder entity model.

use chrono::{DateTime, Utc};
use clouddisk_core::types::FolderId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A folder in the catalog tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Folder {
    /// Unique folder identifier.
    pub id: FolderId,
    /// Folder name (`root` for the root folder).
    pub name: String,
    /// Full stored path (e.g., `/documents/reports`).
    pub path: String,
    /// Parent folder ID (null only for the root).
    pub parent_id: Option<FolderId>,
    /// When the folder was created.
    pub created_at: DateTime<Utc>,
    /// When the folder was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Folder {
    /// Check if this is the root folder.
    pub fn is_root(&self) -> bool {
        self.id.is_root()
    }
}

/// Data required to create a new folder row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFolder {
    /// Folder name.
    pub name: String,
    /// Full path, already composed from the parent path.
    pub path: String,
    /// Parent folder.
    pub parent_id: FolderId,
}
