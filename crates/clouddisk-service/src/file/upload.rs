//! File upload: create a new file or replace the content of an existing one.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tracing::info;

use clouddisk_core::config::StorageConfig;
use clouddisk_core::error::AppError;
use clouddisk_core::result::AppResult;
use clouddisk_core::traits::mirror::{ByteStream, FilesystemMirror, bytes_stream};
use clouddisk_core::types::FolderId;
use clouddisk_database::repositories::{FileRepository, FolderRepository};
use clouddisk_entity::file::{CreateFile, File};

use crate::compensation::compensate;
use crate::lock::PathLocks;
use crate::orphan::clear_orphan;
use crate::path::{PathResolver, join, validate_name};

/// Upload parameters: where the file goes, its declared size and its body.
pub struct CreateFileParams {
    /// File name.
    pub name: String,
    /// Target folder ID.
    pub parent_id: FolderId,
    /// Declared size in bytes. The body must match it exactly.
    pub size: i64,
    /// File content.
    pub content: ByteStream,
}

impl CreateFileParams {
    /// Parameters for a streamed body.
    pub fn new(
        name: impl Into<String>,
        parent_id: FolderId,
        size: i64,
        content: ByteStream,
    ) -> Self {
        Self {
            name: name.into(),
            parent_id,
            size,
            content,
        }
    }

    /// Parameters for an in-memory body; the declared size is its length.
    pub fn from_bytes(name: impl Into<String>, parent_id: FolderId, data: impl Into<Bytes>) -> Self {
        let data: Bytes = data.into();
        let size = data.len() as i64;
        Self::new(name, parent_id, size, bytes_stream(data))
    }
}

impl std::fmt::Debug for CreateFileParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateFileParams")
            .field("name", &self.name)
            .field("parent_id", &self.parent_id)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Handles file uploads.
#[derive(Debug, Clone)]
pub struct UploadService {
    /// Folder repository.
    folder_repo: Arc<FolderRepository>,
    /// File repository.
    file_repo: Arc<FileRepository>,
    /// Physical mirror.
    mirror: Arc<dyn FilesystemMirror>,
    /// Parent path lookup.
    resolver: PathResolver,
    /// Shared path locks.
    locks: Arc<PathLocks>,
    /// Largest accepted declared size.
    max_upload_size_bytes: u64,
}

impl UploadService {
    /// Creates a new upload service.
    pub fn new(
        folder_repo: Arc<FolderRepository>,
        file_repo: Arc<FileRepository>,
        mirror: Arc<dyn FilesystemMirror>,
        locks: Arc<PathLocks>,
        config: &StorageConfig,
    ) -> Self {
        Self {
            resolver: PathResolver::new(folder_repo.clone()),
            folder_repo,
            file_repo,
            mirror,
            locks,
            max_upload_size_bytes: config.max_upload_size_bytes,
        }
    }

    /// Stores an uploaded file.
    ///
    /// When no file exists at the target path a new one is created. When one
    /// does, its content is replaced and its id is kept.
    pub async fn create_file(&self, params: CreateFileParams) -> AppResult<File> {
        validate_name(&params.name)?;
        let declared = u64::try_from(params.size)
            .map_err(|_| AppError::validation("File size cannot be negative"))?;
        if declared > self.max_upload_size_bytes {
            return Err(AppError::validation(format!(
                "File exceeds maximum upload size of {} bytes",
                self.max_upload_size_bytes
            )));
        }

        let (parent_path, path, _lock) = self
            .resolver
            .lock_child(&self.locks, params.parent_id, &params.name)
            .await?;
        if self.folder_repo.path_exists(&path).await? {
            return Err(AppError::already_exists(format!(
                "Folder '{path}' already exists"
            )));
        }
        self.mirror.create_dir(&parent_path).await?;

        match self.file_repo.find_by_path(&path).await? {
            Some(existing) => {
                self.replace_content(existing, &parent_path, params.content, declared)
                    .await
            }
            None => self.create_new(params, path).await,
        }
    }

    async fn create_new(&self, params: CreateFileParams, path: String) -> AppResult<File> {
        clear_orphan(self.mirror.as_ref(), &path).await?;

        let declared = params.size as u64;
        if let Err(err) = self.write_checked(&path, params.content, declared).await {
            compensate("remove partial upload", &path, self.mirror.remove_file(&path)).await;
            return Err(err);
        }

        let data = CreateFile {
            name: params.name,
            path: path.clone(),
            size: params.size,
            parent_id: params.parent_id,
        };
        match self.file_repo.create(&data).await {
            Ok(file) => {
                info!(
                    file_id = %file.id,
                    parent_id = %file.parent_id,
                    path = %file.path,
                    size = file.size,
                    "File uploaded"
                );
                Ok(file)
            }
            Err(err) => {
                compensate("remove uploaded file", &path, self.mirror.remove_file(&path)).await;
                Err(err)
            }
        }
    }

    /// Write to a hidden staging file, record the new size, then move the
    /// staging file over the target.
    async fn replace_content(
        &self,
        existing: File,
        parent_path: &str,
        content: ByteStream,
        declared: u64,
    ) -> AppResult<File> {
        let staging = join(
            parent_path,
            &format!(
                ".upload-{}-{}.part",
                existing.id,
                Utc::now().timestamp_nanos_opt().unwrap_or_default()
            ),
        );

        if let Err(err) = self.write_checked(&staging, content, declared).await {
            compensate("remove staging file", &staging, self.mirror.remove_file(&staging)).await;
            return Err(err);
        }

        let updated = match self
            .file_repo
            .update_content(existing.id, declared as i64, Utc::now())
            .await
        {
            Ok(updated) => updated,
            Err(err) => {
                compensate("remove staging file", &staging, self.mirror.remove_file(&staging))
                    .await;
                return Err(err);
            }
        };

        if let Err(err) = self.mirror.rename(&staging, &existing.path).await {
            compensate("restore previous file metadata", &existing.path, async {
                self.file_repo
                    .restore_content(existing.id, existing.size, existing.updated_at)
                    .await
                    .map(|_| ())
            })
            .await;
            compensate("remove staging file", &staging, self.mirror.remove_file(&staging)).await;
            return Err(err);
        }

        info!(
            file_id = %updated.id,
            path = %updated.path,
            old_size = existing.size,
            new_size = updated.size,
            "File content replaced"
        );
        Ok(updated)
    }

    /// Stream `content` to `path` and check the byte count.
    async fn write_checked(&self, path: &str, content: ByteStream, declared: u64) -> AppResult<()> {
        let written = self.mirror.write_stream(path, content).await?;
        if written != declared {
            return Err(AppError::validation(format!(
                "Upload size mismatch: declared {declared} bytes, received {written}"
            )));
        }
        Ok(())
    }
}
