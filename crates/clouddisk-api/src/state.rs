//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use clouddisk_core::config::AppConfig;
use clouddisk_core::traits::mirror::FilesystemMirror;
use clouddisk_database::DatabasePool;
use clouddisk_service::{FileService, FolderService, UploadService};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Catalog connection pool
    pub db: DatabasePool,
    /// Physical mirror
    pub mirror: Arc<dyn FilesystemMirror>,
    /// Folder service
    pub folder_service: Arc<FolderService>,
    /// File service
    pub file_service: Arc<FileService>,
    /// Upload service
    pub upload_service: Arc<UploadService>,
}
