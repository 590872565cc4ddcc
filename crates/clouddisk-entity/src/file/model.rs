//! File entity model.

use chrono::{DateTime, Utc};
use clouddisk_core::types::{FileId, FolderId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A file recorded in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct File {
    /// Unique file identifier.
    pub id: FileId,
    /// The file name (including extension).
    pub name: String,
    /// Full stored path (e.g., `/documents/report.pdf`).
    pub path: String,
    /// File size in bytes.
    pub size: i64,
    /// The folder containing this file.
    pub parent_id: FolderId,
    /// When the file was created.
    pub created_at: DateTime<Utc>,
    /// When the file content or name was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Data required to create a new file row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFile {
    /// The file name.
    pub name: String,
    /// Full path, already composed from the parent path.
    pub path: String,
    /// File size in bytes.
    pub size: i64,
    /// The folder to place the file in.
    pub parent_id: FolderId,
}
