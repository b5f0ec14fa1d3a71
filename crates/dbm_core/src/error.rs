//! Error types for the dbm client layer.

use dbm_engine::{EngineError, ErrorCode};
use std::fmt;
use thiserror::Error;

/// Result type for database operations.
pub type DbmResult<T> = Result<T, DbmError>;

/// Why an open failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenFailureKind {
    /// The file could not be opened or locked for the requested access.
    PermissionDenied,
    /// The engine refused the file for another reason.
    Engine,
}

impl fmt::Display for OpenFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PermissionDenied => "permission denied",
            Self::Engine => "engine error",
        })
    }
}

/// Errors returned by [`crate::Database`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DbmError {
    /// No open attempt succeeded.
    #[error("cannot open database ({kind}): {message}")]
    Open {
        /// Classification of the last failure.
        kind: OpenFailureKind,
        /// Engine code of the last failure.
        code: ErrorCode,
        /// Engine message of the last failure.
        message: String,
    },

    /// The database has been closed.
    #[error("closed DBM file")]
    Closed,

    /// The database was frozen and refuses changes.
    #[error("can't modify frozen DBM")]
    Frozen,

    /// `fetch` found no value and had no fallback.
    #[error("key not found")]
    KeyNotFound,

    /// The engine rejected the operation.
    #[error("{message}")]
    Store {
        /// Engine failure code.
        code: ErrorCode,
        /// Engine message.
        message: String,
    },

    /// The engine hit an unrecoverable condition.
    #[error("fatal dbm error: {message}")]
    Fatal {
        /// Message passed to the fatal handler.
        message: String,
    },
}

impl DbmError {
    /// Classifies a failed open.
    ///
    /// Failures to open or lock the file are [`OpenFailureKind::PermissionDenied`];
    /// everything else is [`OpenFailureKind::Engine`].
    #[must_use]
    pub fn open(err: &EngineError) -> Self {
        let kind = match err.code() {
            ErrorCode::FileOpenError | ErrorCode::CantBeReader | ErrorCode::CantBeWriter => {
                OpenFailureKind::PermissionDenied
            }
            _ => OpenFailureKind::Engine,
        };
        Self::Open {
            kind,
            code: err.code(),
            message: err.message(),
        }
    }

    /// Creates a fatal error.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal {
            message: message.into(),
        }
    }

    /// Returns the engine code behind this error, if any.
    #[must_use]
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Open { code, .. } | Self::Store { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns true for [`DbmError::Fatal`].
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }
}

impl From<EngineError> for DbmError {
    fn from(err: EngineError) -> Self {
        if err.is_fatal() {
            Self::fatal(err.message())
        } else {
            Self::Store {
                code: err.code(),
                message: err.message(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_classifier() {
        for code in [
            ErrorCode::FileOpenError,
            ErrorCode::CantBeReader,
            ErrorCode::CantBeWriter,
        ] {
            let err = DbmError::open(&EngineError::new(code));
            assert!(matches!(
                err,
                DbmError::Open {
                    kind: OpenFailureKind::PermissionDenied,
                    ..
                }
            ));
        }

        let err = DbmError::open(&EngineError::new(ErrorCode::BadMagicNumber));
        assert_eq!(
            err,
            DbmError::Open {
                kind: OpenFailureKind::Engine,
                code: ErrorCode::BadMagicNumber,
                message: "Bad magic number".into(),
            }
        );
        assert_eq!(
            err.to_string(),
            "cannot open database (engine error): Bad magic number"
        );
    }

    #[test]
    fn engine_errors_become_store_or_fatal() {
        let err: DbmError = EngineError::new(ErrorCode::ReaderCantStore).into();
        assert_eq!(err.code(), Some(ErrorCode::ReaderCantStore));
        assert_eq!(err.to_string(), "Reader can't store");
        assert!(!err.is_fatal());

        let err: DbmError = EngineError::new(ErrorCode::ChecksumMismatch)
            .into_fatal()
            .into();
        assert!(err.is_fatal());
        assert_eq!(err.code(), None);
    }
}
