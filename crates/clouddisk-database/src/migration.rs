//! Database migration runner.

use sqlx::SqlitePool;
use tracing::info;

use clouddisk_core::error::{AppError, ErrorKind};

/// Run all pending database migrations.
///
/// The initial migration creates the `folders` and `files` tables and the
/// root folder row.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), AppError> {
    info!("Running database migrations...");

    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::StorageFailure,
                format!("Failed to run migrations: {e}"),
                e,
            )
        })?;

    info!("Database migrations completed successfully");
    Ok(())
}
