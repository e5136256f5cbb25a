//! VFS error types.

use thiserror::Error;

use crate::backend::BackendError;

/// VFS error type.
///
/// `NotFound` and `Conflict` are the backend's own verdicts passed through
/// unchanged; the rest are decided by the filesystem.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VfsError {
    /// File or directory not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Path already taken, or a directory still has children.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Expected a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Expected a file.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// The storage topology cannot perform this operation.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// Backend unreachable or misbehaving.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl VfsError {
    /// Create a NotFound error.
    pub fn not_found(path: impl ToString) -> Self {
        Self::NotFound(path.to_string())
    }

    /// Create a Conflict error.
    pub fn conflict(path: impl ToString) -> Self {
        Self::Conflict(path.to_string())
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(path: impl ToString) -> Self {
        Self::NotADirectory(path.to_string())
    }

    /// Create an IsADirectory error.
    pub fn is_a_directory(path: impl ToString) -> Self {
        Self::IsADirectory(path.to_string())
    }

    /// Create a NotImplemented error.
    pub fn not_implemented(what: impl ToString) -> Self {
        Self::NotImplemented(what.to_string())
    }

    /// Returns true for `NotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<BackendError> for VfsError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::NotFound(what) => VfsError::NotFound(what),
            BackendError::Conflict(what) => VfsError::Conflict(what),
            other => VfsError::Transport(other.to_string()),
        }
    }
}

/// VFS result type.
pub type VfsResult<T> = Result<T, VfsError>;
