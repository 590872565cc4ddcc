//! Fixtures shared by the coordinator tests.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use tempfile::TempDir;

use clouddisk_core::config::{DatabaseConfig, StorageConfig};
use clouddisk_core::error::AppError;
use clouddisk_core::result::AppResult;
use clouddisk_core::traits::mirror::{ByteStream, EntryKind, FilesystemMirror};
use clouddisk_database::repositories::{FileRepository, FolderRepository};
use clouddisk_database::{DatabasePool, run_migrations};
use clouddisk_storage::LocalFilesystem;

use crate::file::{FileService, UploadService};
use crate::folder::FolderService;
use crate::lock::PathLocks;

/// A migrated catalog plus a mirror root, both inside one temp directory.
pub(crate) struct TestContext {
    pub dir: TempDir,
    pub db: DatabasePool,
    pub folder_repo: Arc<FolderRepository>,
    pub file_repo: Arc<FileRepository>,
    pub mirror: Arc<LocalFilesystem>,
    pub locks: Arc<PathLocks>,
}

impl TestContext {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("catalog.db").display());
        let db = DatabasePool::connect(&DatabaseConfig::with_url(url))
            .await
            .unwrap();
        run_migrations(db.pool()).await.unwrap();
        let mirror = LocalFilesystem::new(dir.path().join("storage")).await.unwrap();

        Self {
            folder_repo: Arc::new(FolderRepository::new(db.pool().clone())),
            file_repo: Arc::new(FileRepository::new(db.pool().clone())),
            mirror: Arc::new(mirror),
            locks: Arc::new(PathLocks::new()),
            dir,
            db,
        }
    }

    pub fn folders(&self) -> FolderService {
        self.folders_with(self.mirror.clone())
    }

    pub fn folders_with(&self, mirror: Arc<dyn FilesystemMirror>) -> FolderService {
        FolderService::new(
            self.folder_repo.clone(),
            self.file_repo.clone(),
            mirror,
            self.locks.clone(),
        )
    }

    pub fn files(&self) -> FileService {
        self.files_with(self.mirror.clone())
    }

    pub fn files_with(&self, mirror: Arc<dyn FilesystemMirror>) -> FileService {
        FileService::new(
            self.folder_repo.clone(),
            self.file_repo.clone(),
            mirror,
            self.locks.clone(),
        )
    }

    pub fn uploads(&self) -> UploadService {
        self.uploads_with(self.mirror.clone(), &StorageConfig::default())
    }

    pub fn uploads_with(
        &self,
        mirror: Arc<dyn FilesystemMirror>,
        config: &StorageConfig,
    ) -> UploadService {
        UploadService::new(
            self.folder_repo.clone(),
            self.file_repo.clone(),
            mirror,
            self.locks.clone(),
            config,
        )
    }

    /// Absolute location of a catalog path in the mirror.
    pub fn physical(&self, path: &str) -> PathBuf {
        self.mirror.resolve(path).unwrap()
    }

    /// Make every statement of `event` on `table` abort.
    pub async fn break_table(&self, event: &str, table: &str) {
        let sql = format!(
            "CREATE TRIGGER broken_{table}_{event} BEFORE {event} ON {table} \
             BEGIN SELECT RAISE(ABORT, 'simulated catalog failure'); END"
        );
        sqlx::query(&sql).execute(self.db.pool()).await.unwrap();
    }

    /// Remove a trigger installed by [`TestContext::break_table`].
    pub async fn repair_table(&self, event: &str, table: &str) {
        let sql = format!("DROP TRIGGER broken_{table}_{event}");
        sqlx::query(&sql).execute(self.db.pool()).await.unwrap();
    }
}

/// Collect a byte stream into a string.
pub(crate) async fn read_string(mut stream: ByteStream) -> String {
    let mut buf = Vec::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk.unwrap());
    }
    String::from_utf8(buf).unwrap()
}

/// Mirror wrapper whose `rename` can be switched to fail.
#[derive(Debug)]
pub(crate) struct FlakyMirror {
    inner: Arc<LocalFilesystem>,
    pub fail_rename: AtomicBool,
}

impl FlakyMirror {
    pub fn new(inner: Arc<LocalFilesystem>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_rename: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl FilesystemMirror for FlakyMirror {
    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }

    async fn create_dir(&self, path: &str) -> AppResult<()> {
        self.inner.create_dir(path).await
    }

    async fn write_stream(&self, path: &str, stream: ByteStream) -> AppResult<u64> {
        self.inner.write_stream(path, stream).await
    }

    async fn read(&self, path: &str) -> AppResult<ByteStream> {
        self.inner.read(path).await
    }

    async fn rename(&self, from: &str, to: &str) -> AppResult<()> {
        if self.fail_rename.load(Ordering::SeqCst) {
            return Err(AppError::io(format!("simulated rename failure {from} -> {to}")));
        }
        self.inner.rename(from, to).await
    }

    async fn remove_file(&self, path: &str) -> AppResult<()> {
        self.inner.remove_file(path).await
    }

    async fn remove_tree(&self, path: &str) -> AppResult<()> {
        self.inner.remove_tree(path).await
    }

    async fn entry_kind(&self, path: &str) -> AppResult<Option<EntryKind>> {
        self.inner.entry_kind(path).await
    }
}
