//! Convenience result type alias for CloudDisk.

use crate::error::AppError;

/// A specialized `Result` type for CloudDisk operations.
pub type AppResult<T> = Result<T, AppError>;
