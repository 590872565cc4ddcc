//! File repository implementation.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use clouddisk_core::error::{AppError, ErrorKind};
use clouddisk_core::result::AppResult;
use clouddisk_core::types::{FileId, FolderId};
use clouddisk_entity::file::model::{CreateFile, File};

use crate::error::map_write_error;

/// Repository for file CRUD and query operations.
#[derive(Debug, Clone)]
pub struct FileRepository {
    pool: SqlitePool,
}

impl FileRepository {
    /// Create a new file repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find a file by ID.
    pub async fn find_by_id(&self, id: FileId) -> AppResult<Option<File>> {
        sqlx::query_as::<_, File>("SELECT * FROM files WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::StorageFailure, "Failed to find file", e))
    }

    /// Find a file by its stored path.
    pub async fn find_by_path(&self, path: &str) -> AppResult<Option<File>> {
        sqlx::query_as::<_, File>("SELECT * FROM files WHERE path = ?1")
            .bind(path)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::StorageFailure, "Failed to find file by path", e)
            })
    }

    /// List the files directly inside a folder, ordered by name.
    pub async fn find_by_folder(&self, parent_id: FolderId) -> AppResult<Vec<File>> {
        sqlx::query_as::<_, File>("SELECT * FROM files WHERE parent_id = ?1 ORDER BY name ASC, id ASC")
            .bind(parent_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::StorageFailure, "Failed to list files", e))
    }

    /// Stored path of a file.
    pub async fn find_path(&self, id: FileId) -> AppResult<String> {
        sqlx::query_scalar::<_, String>("SELECT path FROM files WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::StorageFailure, "Failed to find file path", e)
            })?
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))
    }

    /// Folder containing a file.
    pub async fn find_parent_id(&self, id: FileId) -> AppResult<FolderId> {
        sqlx::query_scalar::<_, FolderId>("SELECT parent_id FROM files WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::StorageFailure, "Failed to find file parent", e)
            })?
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))
    }

    /// Whether a file with this ID exists.
    pub async fn exists(&self, id: FileId) -> AppResult<bool> {
        sqlx::query_scalar::<_, i64>("SELECT EXISTS(SELECT 1 FROM files WHERE id = ?1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map(|found| found != 0)
            .map_err(|e| AppError::with_source(ErrorKind::StorageFailure, "Failed to check file id", e))
    }

    /// Whether a file is stored at this path.
    pub async fn path_exists(&self, path: &str) -> AppResult<bool> {
        sqlx::query_scalar::<_, i64>("SELECT EXISTS(SELECT 1 FROM files WHERE path = ?1)")
            .bind(path)
            .fetch_one(&self.pool)
            .await
            .map(|found| found != 0)
            .map_err(|e| {
                AppError::with_source(ErrorKind::StorageFailure, "Failed to check file path", e)
            })
    }

    /// Insert a new file row.
    pub async fn create(&self, data: &CreateFile) -> AppResult<File> {
        let now = Utc::now();
        sqlx::query_as::<_, File>(
            "INSERT INTO files (name, path, size, parent_id, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?5) RETURNING *",
        )
        .bind(&data.name)
        .bind(&data.path)
        .bind(data.size)
        .bind(data.parent_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &data.path, "Failed to create file"))
    }

    /// Rename a file in place.
    pub async fn rename(&self, id: FileId, new_name: &str, new_path: &str) -> AppResult<File> {
        sqlx::query_as::<_, File>(
            "UPDATE files SET name = ?2, path = ?3, updated_at = ?4 WHERE id = ?1 RETURNING *",
        )
        .bind(id)
        .bind(new_name)
        .bind(new_path)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, new_path, "Failed to rename file"))?
        .ok_or_else(|| AppError::not_found(format!("File {id} not found")))
    }

    /// Record new content for a file after a re-upload.
    pub async fn update_content(
        &self,
        id: FileId,
        size: i64,
        updated_at: DateTime<Utc>,
    ) -> AppResult<File> {
        self.set_content(id, size, updated_at, "Failed to update file content")
            .await
    }

    /// Put back the size and modification time captured before a failed
    /// content replace.
    pub async fn restore_content(
        &self,
        id: FileId,
        size: i64,
        updated_at: DateTime<Utc>,
    ) -> AppResult<File> {
        self.set_content(id, size, updated_at, "Failed to restore file content")
            .await
    }

    async fn set_content(
        &self,
        id: FileId,
        size: i64,
        updated_at: DateTime<Utc>,
        context: &str,
    ) -> AppResult<File> {
        sqlx::query_as::<_, File>(
            "UPDATE files SET size = ?2, updated_at = ?3 WHERE id = ?1 RETURNING *",
        )
        .bind(id)
        .bind(size)
        .bind(updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::StorageFailure, format!("{context}: {e}"), e)
        })?
        .ok_or_else(|| AppError::not_found(format!("File {id} not found")))
    }

    /// Delete a file row.
    pub async fn delete(&self, id: FileId) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM files WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::StorageFailure, "Failed to delete file", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("File {id} not found")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use clouddisk_entity::folder::model::CreateFolder;

    use super::*;
    use crate::repositories::FolderRepository;
    use crate::testing::test_db;

    fn new_file(name: &str, path: &str, size: i64, parent_id: FolderId) -> CreateFile {
        CreateFile {
            name: name.to_string(),
            path: path.to_string(),
            size,
            parent_id,
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let (_dir, db) = test_db().await;
        let repo = FileRepository::new(db.pool().clone());

        let file = repo
            .create(&new_file("a.txt", "/a.txt", 5, FolderId::ROOT))
            .await
            .expect("create");
        assert_eq!(file.size, 5);
        assert_eq!(repo.find_path(file.id).await.expect("path"), "/a.txt");
        assert_eq!(repo.find_parent_id(file.id).await.expect("parent"), FolderId::ROOT);
        assert!(repo.exists(file.id).await.expect("exists"));
        assert!(repo.path_exists("/a.txt").await.expect("path exists"));
        assert!(!repo.path_exists("/b.txt").await.expect("other path"));
        assert_eq!(
            repo.find_by_path("/a.txt").await.expect("by path"),
            Some(file.clone())
        );
        assert_eq!(repo.find_by_id(file.id).await.expect("by id"), Some(file));
    }

    #[tokio::test]
    async fn test_constraint_violations_are_classified() {
        let (_dir, db) = test_db().await;
        let repo = FileRepository::new(db.pool().clone());

        repo.create(&new_file("a.txt", "/a.txt", 1, FolderId::ROOT))
            .await
            .expect("create");

        let dup = repo
            .create(&new_file("a.txt", "/a.txt", 1, FolderId::ROOT))
            .await
            .unwrap_err();
        assert_eq!(dup.kind, ErrorKind::AlreadyExists);

        let orphan = repo
            .create(&new_file("b.txt", "/nowhere/b.txt", 1, FolderId::new(77)))
            .await
            .unwrap_err();
        assert_eq!(orphan.kind, ErrorKind::NotFound);

        let negative = repo
            .create(&new_file("c.txt", "/c.txt", -1, FolderId::ROOT))
            .await
            .unwrap_err();
        assert_eq!(negative.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_find_by_folder_is_scoped_and_ordered() {
        let (_dir, db) = test_db().await;
        let folders = FolderRepository::new(db.pool().clone());
        let repo = FileRepository::new(db.pool().clone());

        let docs = folders
            .create(&CreateFolder {
                name: "docs".into(),
                path: "/docs".into(),
                parent_id: FolderId::ROOT,
            })
            .await
            .expect("folder");
        repo.create(&new_file("z.txt", "/docs/z.txt", 0, docs.id)).await.expect("z");
        repo.create(&new_file("a.txt", "/docs/a.txt", 0, docs.id)).await.expect("a");
        repo.create(&new_file("top.txt", "/top.txt", 0, FolderId::ROOT)).await.expect("top");

        let names: Vec<String> = repo
            .find_by_folder(docs.id)
            .await
            .expect("list")
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, ["a.txt", "z.txt"]);
    }

    #[tokio::test]
    async fn test_rename_and_delete() {
        let (_dir, db) = test_db().await;
        let repo = FileRepository::new(db.pool().clone());

        let file = repo
            .create(&new_file("a.txt", "/a.txt", 0, FolderId::ROOT))
            .await
            .expect("create");
        let renamed = repo.rename(file.id, "b.txt", "/b.txt").await.expect("rename");
        assert_eq!(renamed.id, file.id);
        assert_eq!(renamed.path, "/b.txt");

        repo.delete(file.id).await.expect("delete");
        assert!(!repo.exists(file.id).await.expect("exists"));
        assert_eq!(repo.delete(file.id).await.unwrap_err().kind, ErrorKind::NotFound);
        assert_eq!(
            repo.rename(file.id, "c.txt", "/c.txt").await.unwrap_err().kind,
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_update_then_restore_content() {
        let (_dir, db) = test_db().await;
        let repo = FileRepository::new(db.pool().clone());

        let original = repo
            .create(&new_file("a.txt", "/a.txt", 3, FolderId::ROOT))
            .await
            .expect("create");

        let later = original.updated_at + Duration::seconds(10);
        let updated = repo.update_content(original.id, 42, later).await.expect("update");
        assert_eq!(updated.size, 42);
        assert_eq!(updated.updated_at, later);
        assert_eq!(updated.created_at, original.created_at);

        let restored = repo
            .restore_content(original.id, original.size, original.updated_at)
            .await
            .expect("restore");
        assert_eq!(restored, original);
    }
}
