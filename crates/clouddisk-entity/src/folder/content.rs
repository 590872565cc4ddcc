//! Direct children of a folder.

use serde::{Deserialize, Serialize};

use super::model::Folder;
use crate::file::File;

/// The sub-folders and files directly inside one folder, each ordered by
/// name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FolderContent {
    /// Child folders.
    pub folders: Vec<Folder>,
    /// Child files.
    pub files: Vec<File>,
}

impl FolderContent {
    /// Whether the folder has no children.
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty() && self.files.is_empty()
    }

    /// Total number of direct children.
    pub fn len(&self) -> usize {
        self.folders.len() + self.files.len()
    }
}
