//! Folder create, rename, delete and query operations.

use std::sync::Arc;

use tracing::{error, info};

use clouddisk_core::error::AppError;
use clouddisk_core::result::AppResult;
use clouddisk_core::traits::mirror::FilesystemMirror;
use clouddisk_core::types::FolderId;
use clouddisk_database::repositories::{FileRepository, FolderRepository};
use clouddisk_entity::folder::{CreateFolder, Folder, FolderContent};

use crate::compensation::compensate;
use crate::guard::ExistenceGuard;
use crate::lock::PathLocks;
use crate::orphan::clear_orphan;
use crate::path::{PathResolver, compose_child_path, parent_path_of, validate_name};

/// Coordinates folder operations across the catalog and the mirror.
#[derive(Debug, Clone)]
pub struct FolderService {
    /// Folder repository.
    folder_repo: Arc<FolderRepository>,
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

impl FolderService {
    /// Creates a new folder service.
    pub fn new(
        folder_repo: Arc<FolderRepository>,
        file_repo: Arc<FileRepository>,
        mirror: Arc<dyn FilesystemMirror>,
        locks: Arc<PathLocks>,
    ) -> Self {
        Self {
            resolver: PathResolver::new(folder_repo.clone()),
            guard: ExistenceGuard::new(folder_repo.clone(), file_repo.clone()),
            folder_repo,
            file_repo,
            mirror,
            locks,
        }
    }

    /// Gets a folder by ID.
    pub async fn get_folder(&self, folder_id: FolderId) -> AppResult<Folder> {
        self.folder_repo
            .find_by_id(folder_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Folder {folder_id} not found")))
    }

    /// Stored path of a folder.
    pub async fn query_path(&self, folder_id: FolderId) -> AppResult<String> {
        self.folder_repo.find_path(folder_id).await
    }

    /// Lists the direct sub-folders and files of a folder.
    pub async fn list_content(&self, folder_id: FolderId) -> AppResult<FolderContent> {
        self.guard.ensure_folder_exists(folder_id).await?;
        let folders = self.folder_repo.find_children(folder_id).await?;
        let files = self.file_repo.find_by_folder(folder_id).await?;
        Ok(FolderContent { folders, files })
    }

    /// Creates a folder under `parent_id`.
    ///
    /// The directory is created first; if the catalog insert then fails the
    /// directory is removed again.
    pub async fn create_folder(&self, name: &str, parent_id: FolderId) -> AppResult<Folder> {
        validate_name(name)?;
        let (_, path, _lock) = self
            .resolver
            .lock_child(&self.locks, parent_id, name)
            .await?;
        self.guard.ensure_path_free(&path).await?;
        clear_orphan(self.mirror.as_ref(), &path).await?;

        self.mirror.create_dir(&path).await?;

        let data = CreateFolder {
            name: name.to_string(),
            path: path.clone(),
            parent_id,
        };
        match self.folder_repo.create(&data).await {
            Ok(folder) => {
                info!(
                    folder_id = %folder.id,
                    parent_id = %parent_id,
                    path = %folder.path,
                    "Folder created"
                );
                Ok(folder)
            }
            Err(err) => {
                compensate(
                    "remove created directory",
                    &path,
                    self.mirror.remove_tree(&path),
                )
                .await;
                Err(err)
            }
        }
    }

    /// Renames a folder in place. Descendant paths follow.
    ///
    /// The physical directory is renamed first; if the catalog update fails
    /// it is renamed back.
    pub async fn rename_folder(&self, folder_id: FolderId, new_name: &str) -> AppResult<Folder> {
        if folder_id.is_root() {
            return Err(AppError::invalid_operation(
                "The root folder cannot be renamed",
            ));
        }
        validate_name(new_name)?;

        let (folder, new_path, _lock) = loop {
            let folder = self.get_folder(folder_id).await?;
            let parent_path = parent_path_of(&folder.path).ok_or_else(|| {
                AppError::internal(format!("Folder {folder_id} has no parent path"))
            })?;
            let new_path = compose_child_path(parent_path, new_name)?;
            if new_path == folder.path {
                return Ok(folder);
            }

            let lock = self.locks.lock_many(&[&folder.path, &new_path]).await;
            if self.folder_repo.find_path(folder_id).await? == folder.path {
                break (folder, new_path, lock);
            }
        };
        self.guard.ensure_path_free(&new_path).await?;
        clear_orphan(self.mirror.as_ref(), &new_path).await?;

        self.mirror.rename(&folder.path, &new_path).await?;

        match self.folder_repo.rename(folder_id, new_name, &new_path).await {
            Ok(renamed) => {
                info!(
                    folder_id = %folder_id,
                    old_path = %folder.path,
                    new_path = %renamed.path,
                    "Folder renamed"
                );
                Ok(renamed)
            }
            Err(err) => {
                compensate(
                    "rename directory back",
                    &new_path,
                    self.mirror.rename(&new_path, &folder.path),
                )
                .await;
                Err(err)
            }
        }
    }

    /// Deletes a folder with everything below it.
    ///
    /// The physical tree goes first. A catalog failure afterwards cannot be
    /// undone and is reported as is.
    pub async fn delete_folder(&self, folder_id: FolderId) -> AppResult<()> {
        if folder_id.is_root() {
            return Err(AppError::invalid_operation(
                "The root folder cannot be deleted",
            ));
        }

        let (path, _lock) = loop {
            let path = self.folder_repo.find_path(folder_id).await?;
            let lock = self.locks.lock(&path).await;
            if self.folder_repo.find_path(folder_id).await? == path {
                break (path, lock);
            }
        };

        self.mirror.remove_tree(&path).await?;

        if let Err(err) = self.folder_repo.delete(folder_id).await {
            error!(
                folder_id = %folder_id,
                path = %path,
                error = %err,
                "Directory removed but catalog delete failed"
            );
            return Err(err);
        }

        info!(folder_id = %folder_id, path = %path, "Folder deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use clouddisk_core::error::ErrorKind;
    use clouddisk_core::traits::mirror::bytes_stream;

    use super::*;
    use crate::file::CreateFileParams;
    use crate::testing::{FlakyMirror, TestContext};

    #[tokio::test]
    async fn test_create_folder_under_root() {
        let ctx = TestContext::new().await;
        let service = ctx.folders();

        let docs = service.create_folder("docs", FolderId::ROOT).await.unwrap();
        let fetched = service.get_folder(docs.id).await.unwrap();
        assert_eq!(fetched.path, "/docs");
        assert_eq!(fetched.parent_id, Some(FolderId::ROOT));
        assert!(ctx.physical("/docs").is_dir());
    }

    #[tokio::test]
    async fn test_nested_paths_follow_parents() {
        let ctx = TestContext::new().await;
        let service = ctx.folders();

        let a = service.create_folder("a", FolderId::ROOT).await.unwrap();
        let b = service.create_folder("b", a.id).await.unwrap();
        let c = service.create_folder("c", b.id).await.unwrap();

        assert_eq!(service.query_path(c.id).await.unwrap(), "/a/b/c");
        assert!(ctx.physical("/a/b/c").is_dir());
    }

    #[tokio::test]
    async fn test_duplicate_folder_is_rejected() {
        let ctx = TestContext::new().await;
        let service = ctx.folders();

        service.create_folder("docs", FolderId::ROOT).await.unwrap();
        let err = service.create_folder("docs", FolderId::ROOT).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::AlreadyExists);

        let content = service.list_content(FolderId::ROOT).await.unwrap();
        assert_eq!(content.folders.len(), 1);
        assert!(ctx.physical("/docs").is_dir());
    }

    #[tokio::test]
    async fn test_folder_cannot_shadow_file() {
        let ctx = TestContext::new().await;
        ctx.uploads()
            .create_file(CreateFileParams::from_bytes("notes", FolderId::ROOT, "x"))
            .await
            .unwrap();

        let err = ctx
            .folders()
            .create_folder("notes", FolderId::ROOT)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::AlreadyExists);
        assert!(ctx.physical("/notes").is_file());
    }

    #[tokio::test]
    async fn test_missing_parent_is_not_found() {
        let ctx = TestContext::new().await;
        let err = ctx
            .folders()
            .create_folder("x", FolderId::new(404))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_invalid_name_is_rejected() {
        let ctx = TestContext::new().await;
        let service = ctx.folders();

        for name in ["..", "a/b", ""] {
            let err = service.create_folder(name, FolderId::ROOT).await.unwrap_err();
            assert_eq!(err.kind, ErrorKind::Validation);
        }
    }

    #[tokio::test]
    async fn test_orphan_directory_is_replaced() {
        let ctx = TestContext::new().await;
        std::fs::create_dir_all(ctx.physical("/stale/leftover")).unwrap();

        let folder = ctx.folders().create_folder("stale", FolderId::ROOT).await.unwrap();
        assert_eq!(folder.path, "/stale");
        assert!(ctx.physical("/stale").is_dir());
        assert!(!ctx.physical("/stale/leftover").exists());
    }

    #[tokio::test]
    async fn test_catalog_failure_removes_created_directory() {
        let ctx = TestContext::new().await;
        ctx.break_table("INSERT", "folders").await;

        let err = ctx
            .folders()
            .create_folder("docs", FolderId::ROOT)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::StorageFailure);
        assert!(!ctx.physical("/docs").exists());
        assert!(!ctx.folder_repo.path_exists("/docs").await.unwrap());
    }

    #[tokio::test]
    async fn test_root_is_protected() {
        let ctx = TestContext::new().await;
        let service = ctx.folders();

        let err = service.rename_folder(FolderId::ROOT, "top").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidOperation);
        let err = service.delete_folder(FolderId::ROOT).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidOperation);
        assert_eq!(service.query_path(FolderId::ROOT).await.unwrap(), "/");
    }

    #[tokio::test]
    async fn test_rename_moves_directory_and_descendants() {
        let ctx = TestContext::new().await;
        let service = ctx.folders();

        let a = service.create_folder("a", FolderId::ROOT).await.unwrap();
        let b = service.create_folder("b", a.id).await.unwrap();
        let file = ctx
            .uploads()
            .create_file(CreateFileParams::from_bytes("n.txt", b.id, "nested"))
            .await
            .unwrap();

        let renamed = service.rename_folder(a.id, "a2").await.unwrap();
        assert_eq!(renamed.id, a.id);
        assert_eq!(service.query_path(a.id).await.unwrap(), "/a2");
        assert_eq!(service.query_path(b.id).await.unwrap(), "/a2/b");
        assert_eq!(ctx.files().query_path(file.id).await.unwrap(), "/a2/b/n.txt");
        assert!(!ctx.physical("/a").exists());
        assert!(ctx.physical("/a2/b/n.txt").is_file());
    }

    #[tokio::test]
    async fn test_rename_to_same_name_is_noop() {
        let ctx = TestContext::new().await;
        let service = ctx.folders();

        let a = service.create_folder("a", FolderId::ROOT).await.unwrap();
        let same = service.rename_folder(a.id, "a").await.unwrap();
        assert_eq!(same, a);
    }

    #[tokio::test]
    async fn test_rename_onto_existing_is_rejected() {
        let ctx = TestContext::new().await;
        let service = ctx.folders();

        let a = service.create_folder("a", FolderId::ROOT).await.unwrap();
        service.create_folder("b", FolderId::ROOT).await.unwrap();

        let err = service.rename_folder(a.id, "b").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::AlreadyExists);
        assert!(ctx.physical("/a").is_dir());
        assert_eq!(service.query_path(a.id).await.unwrap(), "/a");
    }

    #[tokio::test]
    async fn test_rename_catalog_failure_renames_back() {
        let ctx = TestContext::new().await;
        let service = ctx.folders();
        let a = service.create_folder("a", FolderId::ROOT).await.unwrap();

        ctx.break_table("UPDATE", "folders").await;
        let err = service.rename_folder(a.id, "a2").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::StorageFailure);

        assert!(ctx.physical("/a").is_dir());
        assert!(!ctx.physical("/a2").exists());
        assert_eq!(service.query_path(a.id).await.unwrap(), "/a");
    }

    #[tokio::test]
    async fn test_rename_mirror_failure_leaves_catalog_untouched() {
        let ctx = TestContext::new().await;
        let a = ctx.folders().create_folder("a", FolderId::ROOT).await.unwrap();

        let flaky = FlakyMirror::new(ctx.mirror.clone());
        flaky.fail_rename.store(true, Ordering::SeqCst);
        let err = ctx
            .folders_with(flaky)
            .rename_folder(a.id, "a2")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::IoFailure);
        assert_eq!(ctx.folders().query_path(a.id).await.unwrap(), "/a");
    }

    #[tokio::test]
    async fn test_delete_cascades_in_both_stores() {
        let ctx = TestContext::new().await;
        let service = ctx.folders();

        let a = service.create_folder("a", FolderId::ROOT).await.unwrap();
        let b = service.create_folder("b", a.id).await.unwrap();
        ctx.uploads()
            .create_file(CreateFileParams::from_bytes("n.txt", b.id, "n"))
            .await
            .unwrap();

        service.delete_folder(a.id).await.unwrap();
        assert_eq!(service.get_folder(a.id).await.unwrap_err().kind, ErrorKind::NotFound);
        assert_eq!(service.get_folder(b.id).await.unwrap_err().kind, ErrorKind::NotFound);
        assert!(!ctx.physical("/a").exists());
        assert!(service.list_content(FolderId::ROOT).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_folder_is_not_found() {
        let ctx = TestContext::new().await;
        let err = ctx.folders().delete_folder(FolderId::new(77)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_list_content_is_ordered() {
        let ctx = TestContext::new().await;
        let service = ctx.folders();

        service.create_folder("zeta", FolderId::ROOT).await.unwrap();
        service.create_folder("alpha", FolderId::ROOT).await.unwrap();
        let uploads = ctx.uploads();
        for name in ["b.txt", "a.txt"] {
            uploads
                .create_file(CreateFileParams::new(
                    name,
                    FolderId::ROOT,
                    1,
                    bytes_stream("x"),
                ))
                .await
                .unwrap();
        }

        let content = service.list_content(FolderId::ROOT).await.unwrap();
        let folders: Vec<_> = content.folders.iter().map(|f| f.name.as_str()).collect();
        let files: Vec<_> = content.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(folders, ["alpha", "zeta"]);
        assert_eq!(files, ["a.txt", "b.txt"]);

        let err = service.list_content(FolderId::new(99)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_concurrent_creates_yield_one_folder() {
        let ctx = TestContext::new().await;
        let service = ctx.folders();

        let attempts = (0..8).map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.create_folder("race", FolderId::ROOT).await })
        });
        let results = futures::future::join_all(attempts).await;

        let ok = results.iter().filter(|r| r.as_ref().unwrap().is_ok()).count();
        assert_eq!(ok, 1);
        for result in results {
            if let Err(err) = result.unwrap() {
                assert_eq!(err.kind, ErrorKind::AlreadyExists);
            }
        }
        assert_eq!(ctx.locks.active(), 0);
    }

    #[tokio::test]
    async fn test_create_below_folder_being_renamed_uses_new_path() {
        let ctx = TestContext::new().await;
        let service = ctx.folders();
        let a = service.create_folder("a", FolderId::ROOT).await.unwrap();
        let b = service.create_folder("b", a.id).await.unwrap();

        // Hold "/a" the way a rename of it would, then move it underneath.
        let held = ctx.locks.lock("/a").await;
        let create = {
            let service = service.clone();
            tokio::spawn(async move { service.create_folder("x", b.id).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!create.is_finished());

        ctx.mirror.rename("/a", "/a2").await.unwrap();
        ctx.folder_repo.rename(a.id, "a2", "/a2").await.unwrap();
        drop(held);

        let x = create.await.unwrap().unwrap();
        assert_eq!(x.path, "/a2/b/x");
        assert!(ctx.physical("/a2/b/x").is_dir());
        assert!(!ctx.physical("/a").exists());
    }

    #[tokio::test]
    async fn test_create_below_folder_being_deleted_is_not_found() {
        let ctx = TestContext::new().await;
        let service = ctx.folders();
        let a = service.create_folder("a", FolderId::ROOT).await.unwrap();
        let b = service.create_folder("b", a.id).await.unwrap();

        let delete = {
            let service = service.clone();
            let held = ctx.locks.lock("/a/b/x").await;
            let task = tokio::spawn(async move { service.delete_folder(a.id).await });
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            assert!(!task.is_finished());
            drop(held);
            task
        };
        delete.await.unwrap().unwrap();

        let err = service.create_folder("x", b.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert!(!ctx.physical("/a").exists());
    }

    #[tokio::test]
    async fn test_concurrent_renames_and_creates_stay_consistent() {
        let ctx = TestContext::new().await;
        let service = ctx.folders();
        let a = service.create_folder("a", FolderId::ROOT).await.unwrap();
        let b = service.create_folder("b", a.id).await.unwrap();

        let renames = {
            let service = service.clone();
            tokio::spawn(async move {
                for i in 0..10 {
                    service.rename_folder(a.id, &format!("a{i}")).await.unwrap();
                }
            })
        };
        let creates = (0..10).map(|i| {
            let service = service.clone();
            tokio::spawn(async move { service.create_folder(&format!("c{i}"), b.id).await })
        });
        for created in futures::future::join_all(creates).await {
            created.unwrap().unwrap();
        }
        renames.await.unwrap();

        let b_path = service.query_path(b.id).await.unwrap();
        assert_eq!(b_path, "/a9/b");
        let children = service.list_content(b.id).await.unwrap().folders;
        assert_eq!(children.len(), 10);
        for child in children {
            assert_eq!(child.path, format!("{b_path}/{}", child.name));
            assert!(ctx.physical(&child.path).is_dir());
        }
        assert_eq!(ctx.locks.active(), 0);
    }
}
