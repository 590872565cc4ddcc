//! File rename, delete, query and download.

use std::sync::Arc;

use tracing::{error, info};

use clouddisk_core::error::AppError;
use clouddisk_core::result::AppResult;
use clouddisk_core::traits::mirror::{ByteStream, FilesystemMirror};
use clouddisk_core::types::FileId;
use clouddisk_database::repositories::{FileRepository, FolderRepository};
use clouddisk_entity::file::File;

use crate::compensation::compensate;
use crate::guard::ExistenceGuard;
use crate::lock::PathLocks;
use crate::orphan::clear_orphan;
use crate::path::{PathResolver, compose_child_path, validate_name};

/// Coordinates file operations other than upload.
#[derive(Debug, Clone)]
pub struct FileService {
    /// File repository.
    file_repo: Arc<FileRepository>,
    /// Physical mirror.
    mirror: Arc<dyn FilesystemMirror>,
    /// Parent path lookup.
    resolver: PathResolver,
    /// Collision checks.
    guard: ExistenceGuard,
    /// Shared path locks.
    locks: Arc<PathLocks>,
}

impl FileService {
    /// Creates a new file service.
    pub fn new(
        folder_repo: Arc<FolderRepository>,
        file_repo: Arc<FileRepository>,
        mirror: Arc<dyn FilesystemMirror>,
        locks: Arc<PathLocks>,
    ) -> Self {
        Self {
            resolver: PathResolver::new(folder_repo.clone()),
            guard: ExistenceGuard::new(folder_repo, file_repo.clone()),
            file_repo,
            mirror,
            locks,
        }
    }

    /// Gets a file by ID.
    pub async fn get_file(&self, file_id: FileId) -> AppResult<File> {
        self.file_repo
            .find_by_id(file_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("File {file_id} not found")))
    }

    /// Stored path of a file.
    pub async fn query_path(&self, file_id: FileId) -> AppResult<String> {
        self.file_repo.find_path(file_id).await
    }

    /// Opens a file for download.
    pub async fn open_file(&self, file_id: FileId) -> AppResult<(File, ByteStream)> {
        let file = self.get_file(file_id).await?;
        let stream = self.mirror.read(&file.path).await?;
        Ok((file, stream))
    }

    /// Renames a file within its folder.
    ///
    /// The physical file is renamed first; if the catalog update fails it
    /// is renamed back.
    pub async fn rename_file(&self, file_id: FileId, new_name: &str) -> AppResult<File> {
        validate_name(new_name)?;

        let (file, new_path, _lock) = loop {
            let file = self.get_file(file_id).await?;
            let parent_path = self.resolver.resolve_path(file.parent_id).await?;
            let new_path = compose_child_path(&parent_path, new_name)?;
            if new_path == file.path {
                return Ok(file);
            }

            let lock = self.locks.lock_many(&[&file.path, &new_path]).await;
            if self.file_repo.find_path(file_id).await? == file.path {
                break (file, new_path, lock);
            }
        };
        self.guard.ensure_path_free(&new_path).await?;
        clear_orphan(self.mirror.as_ref(), &new_path).await?;

        self.mirror.rename(&file.path, &new_path).await?;

        match self.file_repo.rename(file_id, new_name, &new_path).await {
            Ok(renamed) => {
                info!(
                    file_id = %file_id,
                    old_path = %file.path,
                    new_path = %renamed.path,
                    "File renamed"
                );
                Ok(renamed)
            }
            Err(err) => {
                compensate(
                    "rename file back",
                    &new_path,
                    self.mirror.rename(&new_path, &file.path),
                )
                .await;
                Err(err)
            }
        }
    }

    /// Deletes a file from the mirror and then from the catalog.
    pub async fn delete_file(&self, file_id: FileId) -> AppResult<()> {
        let (path, _lock) = loop {
            let path = self.file_repo.find_path(file_id).await?;
            let lock = self.locks.lock(&path).await;
            if self.file_repo.find_path(file_id).await? == path {
                break (path, lock);
            }
        };

        self.mirror.remove_file(&path).await?;

        if let Err(err) = self.file_repo.delete(file_id).await {
            error!(
                file_id = %file_id,
                path = %path,
                error = %err,
                "File removed but catalog delete failed"
            );
            return Err(err);
        }

        info!(file_id = %file_id, path = %path, "File deleted");
        Ok(())
    }
}
