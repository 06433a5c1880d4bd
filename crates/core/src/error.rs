//! Unified error types for edgepix.
//!
//! Every variant renders with a stable upper-case code prefix so log lines
//! and 500 bodies can be grepped by category.

use tokio_rusqlite::rusqlite;

use crate::guard::DenyReason;

/// Unified error types for the edgepix proxy.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The referer check rejected the request.
    #[error("ACCESS_DENIED: {0}")]
    AccessDenied(DenyReason),

    /// No route rule matches the request path.
    #[error("ROUTE_NOT_FOUND: {0}")]
    RouteNotFound(String),

    /// Database operation failed.
    #[error("STORE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Origin transport failure (connect, timeout, body read).
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// Header or response construction failed.
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error is an expected, user-facing outcome rather than a fault.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Error::AccessDenied(_) | Error::RouteNotFound(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Error::Internal(format!("invalid header value: {err}"))
    }
}
