//! Folder repository implementation.

use chrono::Utc;
use sqlx::SqlitePool;

use clouddisk_core::error::{AppError, ErrorKind};
use clouddisk_core::result::AppResult;
use clouddisk_core::types::FolderId;
use clouddisk_entity::folder::model::{CreateFolder, Folder};

use crate::error::map_write_error;

/// Repository for folder CRUD and tree queries.
#[derive(Debug, Clone)]
pub struct FolderRepository {
    pool: SqlitePool,
}

impl FolderRepository {
    /// Create a new folder repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find a folder by ID.
    pub async fn find_by_id(&self, id: FolderId) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::StorageFailure, "Failed to find folder", e))
    }

    /// Find a folder by its stored path.
    pub async fn find_by_path(&self, path: &str) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE path = ?1")
            .bind(path)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::StorageFailure, "Failed to find folder by path", e)
            })
    }

    /// List direct child folders, ordered by name.
    pub async fn find_children(&self, parent_id: FolderId) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders WHERE parent_id = ?1 ORDER BY name ASC, id ASC",
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::StorageFailure, "Failed to list children", e))
    }

    /// Stored path of a folder.
    pub async fn find_path(&self, id: FolderId) -> AppResult<String> {
        sqlx::query_scalar::<_, String>("SELECT path FROM folders WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::StorageFailure, "Failed to find folder path", e)
            })?
            .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))
    }

    /// Parent of a folder (`None` for the root).
    pub async fn find_parent_id(&self, id: FolderId) -> AppResult<Option<FolderId>> {
        sqlx::query_scalar::<_, Option<FolderId>>("SELECT parent_id FROM folders WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::StorageFailure, "Failed to find folder parent", e)
            })?
            .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))
    }

    /// Whether a folder with this ID exists.
    pub async fn exists(&self, id: FolderId) -> AppResult<bool> {
        sqlx::query_scalar::<_, i64>("SELECT EXISTS(SELECT 1 FROM folders WHERE id = ?1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map(|found| found != 0)
            .map_err(|e| {
                AppError::with_source(ErrorKind::StorageFailure, "Failed to check folder id", e)
            })
    }

    /// Whether a folder is stored at this path.
    pub async fn path_exists(&self, path: &str) -> AppResult<bool> {
        sqlx::query_scalar::<_, i64>("SELECT EXISTS(SELECT 1 FROM folders WHERE path = ?1)")
            .bind(path)
            .fetch_one(&self.pool)
            .await
            .map(|found| found != 0)
            .map_err(|e| {
                AppError::with_source(ErrorKind::StorageFailure, "Failed to check folder path", e)
            })
    }

    /// Insert a new folder row.
    pub async fn create(&self, data: &CreateFolder) -> AppResult<Folder> {
        let now = Utc::now();
        sqlx::query_as::<_, Folder>(
            "INSERT INTO folders (name, path, parent_id, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?4) RETURNING *",
        )
        .bind(&data.name)
        .bind(&data.path)
        .bind(data.parent_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &data.path, "Failed to create folder"))
    }

    /// Rename a folder and rewrite the path prefix of every descendant
    /// folder and file in one transaction.
    pub async fn rename(&self, id: FolderId, new_name: &str, new_path: &str) -> AppResult<Folder> {
        if id.is_root() {
            return Err(AppError::invalid_operation("The root folder cannot be renamed"));
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::StorageFailure, "Failed to begin transaction", e)
        })?;

        let old_path = sqlx::query_scalar::<_, String>("SELECT path FROM folders WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::StorageFailure, "Failed to find folder path", e)
            })?
            .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))?;

        let now = Utc::now();
        let folder = sqlx::query_as::<_, Folder>(
            "UPDATE folders SET name = ?2, path = ?3, updated_at = ?4 WHERE id = ?1 RETURNING *",
        )
        .bind(id)
        .bind(new_name)
        .bind(new_path)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, new_path, "Failed to rename folder"))?;

        // Descendants are matched on `old_path/` so `/a` never touches `/ab`.
        let descendant_folders = sqlx::query(
            "UPDATE folders SET path = ?2 || substr(path, length(?1) + 1) \
             WHERE substr(path, 1, length(?1) + 1) = ?1 || '/'",
        )
        .bind(&old_path)
        .bind(new_path)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, new_path, "Failed to rewrite descendant folder paths"))?
        .rows_affected();

        let descendant_files = sqlx::query(
            "UPDATE files SET path = ?2 || substr(path, length(?1) + 1) \
             WHERE substr(path, 1, length(?1) + 1) = ?1 || '/'",
        )
        .bind(&old_path)
        .bind(new_path)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, new_path, "Failed to rewrite descendant file paths"))?
        .rows_affected();

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::StorageFailure, "Failed to commit folder rename", e)
        })?;

        tracing::debug!(
            folder_id = %id,
            old_path = %old_path,
            new_path = %new_path,
            descendant_folders,
            descendant_files,
            "Folder paths rewritten"
        );
        Ok(folder)
    }

    /// Delete a folder. Child folders and files are removed by the
    /// `ON DELETE CASCADE` constraints.
    pub async fn delete(&self, id: FolderId) -> AppResult<()> {
        if id.is_root() {
            return Err(AppError::invalid_operation("The root folder cannot be deleted"));
        }

        let result = sqlx::query("DELETE FROM folders WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::StorageFailure, "Failed to delete folder", e)
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Folder {id} not found")));
        }
        Ok(())
    }
}
