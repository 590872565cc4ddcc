//! Shared fixtures for repository tests.

use clouddisk_core::config::DatabaseConfig;
use tempfile::TempDir;

use crate::connection::DatabasePool;
use crate::migration::run_migrations;

/// A migrated catalog in a fresh temporary directory.
///
/// The directory must outlive the pool.
pub(crate) async fn test_db() -> (TempDir, DatabasePool) {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}", dir.path().join("catalog.db").display());
    let db = DatabasePool::connect(&DatabaseConfig::with_url(url))
        .await
        .expect("connect");
    run_migrations(db.pool()).await.expect("migrate");
    (dir, db)
}
