//! Listener error types.

use fieldsync_core::SyncError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ListenerError {
    /// The engine call failed.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// The blocking task running the engine call panicked or was cancelled.
    #[error("Engine task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type alias using ListenerError.
pub type ListenerResult<T> = Result<T, ListenerError>;
