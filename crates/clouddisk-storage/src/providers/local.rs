//! Local filesystem mirror.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use futures::stream::StreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::debug;

use clouddisk_core::error::{AppError, ErrorKind};
use clouddisk_core::result::AppResult;
use clouddisk_core::traits::mirror::{ByteStream, EntryKind, FilesystemMirror};

/// Physical directory tree rooted at one base directory.
#[derive(Debug, Clone)]
pub struct LocalFilesystem {
    /// Directory that the root folder `/` maps to.
    root: PathBuf,
}

impl LocalFilesystem {
    /// Create a mirror rooted at the given path, creating it if needed.
    pub async fn new(root_path: impl AsRef<Path>) -> AppResult<Self> {
        let root = root_path.as_ref().to_path_buf();
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::IoFailure,
                format!("Failed to create storage root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self { root })
    }

    /// The storage root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a catalog path to an absolute path within the root.
    ///
    /// Segments are re-joined with the platform separator. Empty segments
    /// are skipped, `.` and `..` are rejected.
    pub fn resolve(&self, path: &str) -> AppResult<PathBuf> {
        let mut full = self.root.clone();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let mut components = Path::new(segment).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(part)), None) => full.push(part),
                _ => {
                    return Err(AppError::validation(format!(
                        "Invalid path segment '{segment}' in '{path}'"
                    )));
                }
            }
        }
        Ok(full)
    }
}

fn io_error(action: &str, path: &str, e: std::io::Error) -> AppError {
    AppError::with_source(ErrorKind::IoFailure, format!("Failed to {action}: {path}"), e)
}

#[async_trait]
impl FilesystemMirror for LocalFilesystem {
    async fn health_check(&self) -> AppResult<bool> {
        Ok(fs::metadata(&self.root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false))
    }

    async fn create_dir(&self, path: &str) -> AppResult<()> {
        let full_path = self.resolve(path)?;
        fs::create_dir_all(&full_path)
            .await
            .map_err(|e| io_error("create directory", path, e))?;
        debug!(path, "Created directory");
        Ok(())
    }

    async fn write_stream(&self, path: &str, mut stream: ByteStream) -> AppResult<u64> {
        let full_path = self.resolve(path)?;

        let mut file = fs::File::create(&full_path)
            .await
            .map_err(|e| io_error("create file", path, e))?;

        let mut total_bytes = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                AppError::with_source(ErrorKind::IoFailure, "Upload stream read error", e)
            })?;
            total_bytes += chunk.len() as u64;
            file.write_all(&chunk)
                .await
                .map_err(|e| io_error("write chunk to", path, e))?;
        }

        file.flush()
            .await
            .map_err(|e| io_error("flush file", path, e))?;
        file.sync_all()
            .await
            .map_err(|e| io_error("sync file", path, e))?;

        debug!(path, bytes = total_bytes, "Wrote file from stream");
        Ok(total_bytes)
    }

    async fn read(&self, path: &str) -> AppResult<ByteStream> {
        let full_path = self.resolve(path)?;
        let file = fs::File::open(&full_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found(format!("File not found: {path}"))
            } else {
                io_error("open file", path, e)
            }
        })?;

        Ok(Box::pin(ReaderStream::new(file)))
    }

    async fn rename(&self, from: &str, to: &str) -> AppResult<()> {
        let from_path = self.resolve(from)?;
        let to_path = self.resolve(to)?;

        fs::rename(&from_path, &to_path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::IoFailure,
                format!("Failed to rename {from} -> {to}"),
                e,
            )
        })?;
        debug!(from, to, "Renamed entry");
        Ok(())
    }

    async fn remove_file(&self, path: &str) -> AppResult<()> {
        let full_path = self.resolve(path)?;
        match fs::remove_file(&full_path).await {
            Ok(()) => {
                debug!(path, "Removed file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("remove file", path, e)),
        }
    }

    async fn remove_tree(&self, path: &str) -> AppResult<()> {
        let full_path = self.resolve(path)?;
        if full_path == self.root {
            return Err(AppError::invalid_operation("Refusing to remove the storage root"));
        }

        let meta = match fs::symlink_metadata(&full_path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(io_error("inspect", path, e)),
        };

        let result = if meta.is_dir() {
            fs::remove_dir_all(&full_path).await
        } else {
            fs::remove_file(&full_path).await
        };
        match result {
            Ok(()) => {
                debug!(path, "Removed tree");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("remove tree", path, e)),
        }
    }

    async fn entry_kind(&self, path: &str) -> AppResult<Option<EntryKind>> {
        let full_path = self.resolve(path)?;
        match fs::symlink_metadata(&full_path).await {
            Ok(meta) if meta.is_dir() => Ok(Some(EntryKind::Directory)),
            Ok(_) => Ok(Some(EntryKind::File)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error("inspect", path, e)),
        }
    }
}
