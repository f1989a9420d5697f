//! Client synchronization error types

use thiserror::Error;

use super::CoreError;

/// Errors surfaced by the client-side sync engine
#[derive(Error, Debug)]
pub enum SyncError {
    /// The persistence scheduler task has stopped
    #[error("Persistence scheduler is not running")]
    SchedulerStopped,

    /// The remote snapshot belongs to another canvas
    #[error("Snapshot for canvas '{actual}' delivered to session of canvas '{expected}'")]
    CanvasMismatch {
        /// Canvas the session was opened for
        expected: String,
        /// Canvas the snapshot belongs to
        actual: String,
    },

    /// Writing the snapshot to the document store failed
    #[error("Save failed: {0}")]
    Save(#[from] CoreError),
}

impl SyncError {
    pub fn error_code(&self) -> &'static str {
        match self {
            SyncError::SchedulerStopped => "UNAVAILABLE",
            SyncError::CanvasMismatch { .. } => "VALIDATION_FAILED",
            SyncError::Save(err) => err.kind().as_str(),
        }
    }
}
