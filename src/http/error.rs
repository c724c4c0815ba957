//! Request-level error taxonomy

use hyper::StatusCode;
use std::io;
use thiserror::Error;

/// Failures that end a request before a response is produced
#[derive(Debug, Error)]
pub enum ServeError {
    /// Path does not exist or resolves outside the served root
    #[error("resource not found")]
    NotFound,

    /// Filesystem failure after the path was resolved
    #[error("I/O failure: {0}")]
    Io(#[from] io::Error),
}

impl ServeError {
    /// Classify a stat failure: missing entries are 404, anything else is 500
    pub fn from_stat(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => Self::NotFound,
            _ => Self::Io(err),
        }
    }

    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stat_classification() {
        let missing = io::Error::from(io::ErrorKind::NotFound);
        assert!(matches!(ServeError::from_stat(missing), ServeError::NotFound));

        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        let err = ServeError::from_stat(denied);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ServeError::NotFound.status(), StatusCode::NOT_FOUND);
    }
}
