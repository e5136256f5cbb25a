//! Backend error types.

use thiserror::Error;

/// Failure reported by an object-storage backend.
///
/// Only `NotFound` and `Conflict` carry meaning above the backend layer;
/// everything else is treated as a generic backend failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// 404-class response.
    #[error("not found: {0}")]
    NotFound(String),

    /// 409-class response.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Credentials rejected or token expired.
    #[error("unauthorized")]
    Unauthorized,

    /// Any other unexpected HTTP status.
    #[error("unexpected status {code}: {message}")]
    Status {
        /// HTTP status code.
        code: u16,
        /// Request description.
        message: String,
    },

    /// Network or protocol failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body ended because the connection closed and no
    /// content length was declared. Callers streaming a body treat this as
    /// a clean end of data.
    #[error("response body ended without a declared length")]
    PotentialDataLoss,
}

impl BackendError {
    /// Create a NotFound error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create a Conflict error.
    pub fn conflict(what: impl Into<String>) -> Self {
        Self::Conflict(what.into())
    }

    /// Create a Transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Map an HTTP status to the backend taxonomy.
    ///
    /// Returns `None` for success statuses.
    pub fn from_status(code: u16, what: impl Into<String>) -> Option<Self> {
        match code {
            200..=299 => None,
            401 | 403 => Some(Self::Unauthorized),
            404 => Some(Self::NotFound(what.into())),
            409 => Some(Self::Conflict(what.into())),
            _ => Some(Self::Status {
                code,
                message: what.into(),
            }),
        }
    }

    /// Returns true for the 404 class.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Self::from_status(status.as_u16(), e.to_string())
                .unwrap_or_else(|| Self::Transport(e.to_string())),
            None => Self::Transport(e.to_string()),
        }
    }
}

/// Backend result type.
pub type BackendResult<T> = Result<T, BackendError>;
