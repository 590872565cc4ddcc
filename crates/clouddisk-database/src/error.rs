//! Mapping of sqlx write errors onto catalog error kinds.

use clouddisk_core::error::{AppError, ErrorKind};

/// Classify a failed insert or update.
///
/// Unique violations become `AlreadyExists`, foreign key violations
/// (missing parent) become `NotFound`, check violations become
/// `Validation`, anything else is a `StorageFailure`.
pub(crate) fn map_write_error(err: sqlx::Error, path: &str, context: &str) -> AppError {
    let (kind, message) = match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => (
            ErrorKind::AlreadyExists,
            format!("Path '{path}' already exists"),
        ),
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => (
            ErrorKind::NotFound,
            format!("Parent folder of '{path}' not found"),
        ),
        sqlx::Error::Database(db_err) if db_err.is_check_violation() => {
            (ErrorKind::Validation, format!("{context}: {err}"))
        }
        _ => (ErrorKind::StorageFailure, format!("{context}: {err}")),
    };
    AppError::with_source(kind, message, err)
}
