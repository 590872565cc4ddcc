//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

use clouddisk_core::types::FolderId;

/// Create folder request body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateFolderRequest {
    /// Folder name.
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
    /// Parent folder ID.
    pub parent_id: FolderId,
}

/// Rename request body, shared by folders and files.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RenameRequest {
    /// New name.
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
}
