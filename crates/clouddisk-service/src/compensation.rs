//! Undo actions run after a later step of a multi-store operation fails.

use std::future::Future;

use tracing::{error, warn};

use clouddisk_core::result::AppResult;

/// Run an inverse action for an already-applied effect.
///
/// The outcome is only logged. The caller still returns the error that
/// triggered compensation, whether or not the undo succeeded.
pub async fn compensate<F>(action: &str, path: &str, undo: F)
where
    F: Future<Output = AppResult<()>>,
{
    match undo.await {
        Ok(()) => warn!(action, path, "Compensation applied"),
        Err(e) => error!(
            action,
            path,
            error = %e,
            "Compensation failed, catalog and mirror may disagree"
        ),
    }
}
