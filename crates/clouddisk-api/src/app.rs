//! Wires repositories, the mirror and the coordinator services into
//! an [`AppState`].

use std::sync::Arc;

use clouddisk_core::config::AppConfig;
use clouddisk_core::traits::mirror::FilesystemMirror;
use clouddisk_database::DatabasePool;
use clouddisk_database::repositories::{FileRepository, FolderRepository};
use clouddisk_service::{FileService, FolderService, PathLocks, UploadService};

use crate::state::AppState;

/// Builds the shared state from an open catalog and a mirror.
///
/// All services share one set of path locks.
pub fn build_state(
    config: AppConfig,
    db: DatabasePool,
    mirror: Arc<dyn FilesystemMirror>,
) -> AppState {
    let folder_repo = Arc::new(FolderRepository::new(db.pool().clone()));
    let file_repo = Arc::new(FileRepository::new(db.pool().clone()));
    let locks = Arc::new(PathLocks::new());

    let folder_service = Arc::new(FolderService::new(
        Arc::clone(&folder_repo),
        Arc::clone(&file_repo),
        Arc::clone(&mirror),
        Arc::clone(&locks),
    ));
    let file_service = Arc::new(FileService::new(
        Arc::clone(&folder_repo),
        Arc::clone(&file_repo),
        Arc::clone(&mirror),
        Arc::clone(&locks),
    ));
    let upload_service = Arc::new(UploadService::new(
        Arc::clone(&folder_repo),
        Arc::clone(&file_repo),
        Arc::clone(&mirror),
        Arc::clone(&locks),
        &config.storage,
    ));

    AppState {
        config: Arc::new(config),
        db,
        mirror,
        folder_service,
        file_service,
        upload_service,
    }
}
