//! Protocol-facing error taxonomy.

use thiserror::Error;

use crate::transfer::TransferError;
use crate::vfs::VfsError;

/// Errors a protocol engine sees.
///
/// Every lower-layer failure is remapped here; no backend or filesystem
/// error type crosses this boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ShellError {
    #[error("no such file or directory: {0}")]
    FileNotFound(String),

    #[error("already exists or not empty: {0}")]
    Conflict(String),

    #[error("not a directory: {0}")]
    IsNotADirectory(String),

    #[error("is a directory: {0}")]
    IsADirectory(String),

    #[error("operation not supported: {0}")]
    NotImplemented(String),

    /// Anything without a more specific protocol code.
    #[error("failure: {0}")]
    Failure(String),
}

impl From<VfsError> for ShellError {
    fn from(e: VfsError) -> Self {
        match e {
            VfsError::NotFound(what) => ShellError::FileNotFound(what),
            VfsError::Conflict(what) => ShellError::Conflict(what),
            VfsError::NotADirectory(what) => ShellError::IsNotADirectory(what),
            VfsError::IsADirectory(what) => ShellError::IsADirectory(what),
            VfsError::NotImplemented(what) => ShellError::NotImplemented(what),
            VfsError::Transport(what) => ShellError::Failure(what),
        }
    }
}

impl From<TransferError> for ShellError {
    fn from(e: TransferError) -> Self {
        match e {
            TransferError::Backend(backend) => VfsError::from(backend).into(),
            other => ShellError::Failure(other.to_string()),
        }
    }
}

/// Shell result type.
pub type ShellResult<T> = Result<T, ShellError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;

    #[test]
    fn test_vfs_mapping() {
        assert_eq!(
            ShellError::from(VfsError::not_found("/a")),
            ShellError::FileNotFound("/a".into())
        );
        assert_eq!(
            ShellError::from(VfsError::not_a_directory("/a")),
            ShellError::IsNotADirectory("/a".into())
        );
        assert!(matches!(
            ShellError::from(VfsError::Transport("down".into())),
            ShellError::Failure(_)
        ));
    }

    #[test]
    fn test_transfer_mapping() {
        assert_eq!(
            ShellError::from(TransferError::Backend(BackendError::not_found("/c/o"))),
            ShellError::FileNotFound("/c/o".into())
        );
        assert!(matches!(
            ShellError::from(TransferError::Cancelled),
            ShellError::Failure(_)
        ));
    }
}
