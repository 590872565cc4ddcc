//! Existence checks run before any mutation.

use std::sync::Arc;

use clouddisk_core::error::AppError;
use clouddisk_core::result::AppResult;
use clouddisk_core::types::{FileId, FolderId, Namespace};
use clouddisk_database::repositories::{FileRepository, FolderRepository};

/// Read-only collision and presence checks against the catalog.
#[derive(Debug, Clone)]
pub struct ExistenceGuard {
    folder_repo: Arc<FolderRepository>,
    file_repo: Arc<FileRepository>,
}

impl ExistenceGuard {
    /// Creates a new existence guard.
    pub fn new(folder_repo: Arc<FolderRepository>, file_repo: Arc<FileRepository>) -> Self {
        Self {
            folder_repo,
            file_repo,
        }
    }

    /// Whether a row with this id exists in the namespace.
    pub async fn id_exists(&self, id: i64, namespace: Namespace) -> AppResult<bool> {
        match namespace {
            Namespace::Folders => self.folder_repo.exists(FolderId::new(id)).await,
            Namespace::Files => self.file_repo.exists(FileId::new(id)).await,
        }
    }

    /// Whether a row with this path exists in the namespace.
    pub async fn path_exists(&self, path: &str, namespace: Namespace) -> AppResult<bool> {
        match namespace {
            Namespace::Folders => self.folder_repo.path_exists(path).await,
            Namespace::Files => self.file_repo.path_exists(path).await,
        }
    }

    /// Fail with `AlreadyExists` if either namespace holds `path`.
    pub async fn ensure_path_free(&self, path: &str) -> AppResult<()> {
        for namespace in [Namespace::Folders, Namespace::Files] {
            if self.path_exists(path, namespace).await? {
                return Err(AppError::already_exists(format!(
                    "{} '{path}' already exists",
                    namespace.label()
                )));
            }
        }
        Ok(())
    }

    /// Fail with `NotFound` unless the folder exists.
    pub async fn ensure_folder_exists(&self, id: FolderId) -> AppResult<()> {
        if self.folder_repo.exists(id).await? {
            Ok(())
        } else {
            Err(AppError::not_found(format!("Folder {id} not found")))
        }
    }
}
