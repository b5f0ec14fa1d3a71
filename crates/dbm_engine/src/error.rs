//! Engine error codes and the error type every primitive returns.

use std::fmt;
use thiserror::Error;

/// Result type for primitive operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Numeric failure codes reported by an engine.
///
/// The numbers are stable so they can cross a C boundary or be logged and
/// compared later; see [`ErrorCode::as_i32`] and the `TryFrom<i32>` impl.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The database file could not be opened or created.
    FileOpenError = 3,
    /// Writing to the database file failed.
    FileWriteError = 4,
    /// Reading from the database file failed.
    FileReadError = 6,
    /// The file is not a database of this engine.
    BadMagicNumber = 7,
    /// A reader tried to open a file that holds no database yet.
    EmptyDatabase = 8,
    /// A shared lock could not be taken.
    CantBeReader = 9,
    /// An exclusive lock could not be taken.
    CantBeWriter = 10,
    /// Delete attempted through a reader handle.
    ReaderCantDelete = 11,
    /// Store attempted through a reader handle.
    ReaderCantStore = 12,
    /// Reorganize attempted through a reader handle.
    ReaderCantReorganize = 13,
    /// The key does not exist.
    ItemNotFound = 15,
    /// Rewriting the database during reorganize failed.
    ReorganizeFailed = 16,
    /// Insert-only store found the key already present.
    CannotReplace = 17,
    /// The key or value cannot be stored, e.g. it is too large for one record.
    IllegalData = 18,
    /// The option value is not acceptable.
    OptIllegal = 20,
    /// A record's checksum does not match its contents.
    ChecksumMismatch = 21,
    /// A record's framing is inconsistent.
    MalformedRecord = 22,
}

impl ErrorCode {
    /// Returns the numeric code.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Returns the human-readable message for this code.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::FileOpenError => "File open error",
            Self::FileWriteError => "File write error",
            Self::FileReadError => "File read error",
            Self::BadMagicNumber => "Bad magic number",
            Self::EmptyDatabase => "Empty database",
            Self::CantBeReader => "Can't be reader",
            Self::CantBeWriter => "Can't be writer",
            Self::ReaderCantDelete => "Reader can't delete",
            Self::ReaderCantStore => "Reader can't store",
            Self::ReaderCantReorganize => "Reader can't reorganize",
            Self::ItemNotFound => "Item not found",
            Self::ReorganizeFailed => "Reorganize failed",
            Self::CannotReplace => "Cannot replace",
            Self::IllegalData => "Illegal data",
            Self::OptIllegal => "Illegal option",
            Self::ChecksumMismatch => "Record checksum mismatch",
            Self::MalformedRecord => "Malformed record",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl TryFrom<i32> for ErrorCode {
    type Error = i32;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Ok(match code {
            3 => Self::FileOpenError,
            4 => Self::FileWriteError,
            6 => Self::FileReadError,
            7 => Self::BadMagicNumber,
            8 => Self::EmptyDatabase,
            9 => Self::CantBeReader,
            10 => Self::CantBeWriter,
            11 => Self::ReaderCantDelete,
            12 => Self::ReaderCantStore,
            13 => Self::ReaderCantReorganize,
            15 => Self::ItemNotFound,
            16 => Self::ReorganizeFailed,
            17 => Self::CannotReplace,
            18 => Self::IllegalData,
            20 => Self::OptIllegal,
            21 => Self::ChecksumMismatch,
            22 => Self::MalformedRecord,
            other => return Err(other),
        })
    }
}

/// A failed primitive call.
///
/// `fatal` is set when the engine considered the failure unrecoverable and
/// has already run the fatal handler supplied at open time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct EngineError {
    code: ErrorCode,
    detail: Option<String>,
    fatal: bool,
}

impl EngineError {
    /// Creates an error carrying only a code.
    #[must_use]
    pub const fn new(code: ErrorCode) -> Self {
        Self {
            code,
            detail: None,
            fatal: false,
        }
    }

    /// Creates an error with extra context, e.g. the OS error text.
    pub fn with_detail(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: Some(detail.into()),
            fatal: false,
        }
    }

    /// Marks the error unrecoverable.
    #[must_use]
    pub fn into_fatal(mut self) -> Self {
        self.fatal = true;
        self
    }

    /// Returns the failure code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// Returns the optional context string.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Returns true if the fatal handler fired for this failure.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        self.fatal
    }

    /// Returns the code message, followed by the detail when present.
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code.message())?;
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        Ok(())
    }
}

impl From<ErrorCode> for EngineError {
    fn from(code: ErrorCode) -> Self {
        Self::new(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_convert_both_ways() {
        for code in [
            ErrorCode::FileOpenError,
            ErrorCode::CantBeReader,
            ErrorCode::CantBeWriter,
            ErrorCode::ItemNotFound,
            ErrorCode::IllegalData,
            ErrorCode::MalformedRecord,
        ] {
            assert_eq!(ErrorCode::try_from(code.as_i32()), Ok(code));
        }
        assert_eq!(ErrorCode::FileOpenError.as_i32(), 3);
        assert_eq!(ErrorCode::CantBeReader.as_i32(), 9);
        assert_eq!(ErrorCode::CantBeWriter.as_i32(), 10);
        assert_eq!(ErrorCode::try_from(99), Err(99));
    }

    #[test]
    fn message_includes_detail() {
        let plain = EngineError::new(ErrorCode::ReaderCantStore);
        assert_eq!(plain.message(), "Reader can't store");
        assert_eq!(plain.to_string(), "Reader can't store");

        let detailed = EngineError::with_detail(ErrorCode::FileOpenError, "permission denied");
        assert_eq!(detailed.message(), "File open error: permission denied");
        assert_eq!(detailed.detail(), Some("permission denied"));
    }

    #[test]
    fn fatal_flag_is_sticky() {
        let err = EngineError::new(ErrorCode::ChecksumMismatch);
        assert!(!err.is_fatal());
        let err = err.into_fatal();
        assert!(err.is_fatal());
        assert_eq!(err.code(), ErrorCode::ChecksumMismatch);
    }
}
