//! Transfer error types.

use thiserror::Error;

use crate::backend::BackendError;

/// Why a transfer did not complete.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransferError {
    /// The backend request failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The data consumer refused a chunk or failed to finish.
    #[error("consumer failed: {0}")]
    Consumer(String),

    /// Written to an upload sink that is already closed or whose PUT ended.
    #[error("upload sink closed")]
    Closed,

    /// Cancelled through its completion handle.
    #[error("transfer cancelled")]
    Cancelled,

    /// The transfer task went away without resolving.
    #[error("transfer abandoned before completion")]
    Abandoned,
}

impl From<std::io::Error> for TransferError {
    fn from(e: std::io::Error) -> Self {
        TransferError::Consumer(e.to_string())
    }
}
