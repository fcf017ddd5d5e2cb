//! Error types for slicedb.

use std::io;
use thiserror::Error;

/// Result type alias for slicedb operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for version and file-lifecycle operations.
///
/// Invariant violations (unsorted levels, overlapping ranges, deletes of
/// unknown files) are bugs and panic instead of surfacing here.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// I/O error from file operations.
    #[error("I/O error: {0}")]
    Io(String),

    /// The target does not exist. Deletion paths downgrade this to an
    /// informational event: the file is already gone.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Data corruption detected.
    #[error("Corruption detected: {0}")]
    Corruption(String),

    /// CRC checksum mismatch in a manifest record.
    #[error("CRC mismatch: expected {expected:#x}, got {actual:#x}")]
    CrcMismatch { expected: u32, actual: u32 },

    /// An edit batch referenced levels beyond the configured level count
    /// and the references did not cancel out.
    #[error("Version edit references invalid levels")]
    InvalidVersionEdit,

    /// Manifest error.
    #[error("Manifest error: {0}")]
    ManifestError(String),

    /// Failure opening a table reader through the table cache.
    #[error("Table open failed for file {file_number}: {message}")]
    TableOpen { file_number: u64, message: String },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Internal error (should not happen).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            Error::NotFound(err.to_string())
        } else {
            Error::Io(err.to_string())
        }
    }
}

impl Error {
    /// Create a corruption error with the given message.
    pub fn corruption<S: Into<String>>(msg: S) -> Self {
        Error::Corruption(msg.into())
    }

    /// Create a manifest error.
    pub fn manifest<S: Into<String>>(msg: S) -> Self {
        Error::ManifestError(msg.into())
    }

    /// Create an internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }

    /// Check if this error means the target was already absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Check if this error indicates corruption.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::Corruption(_) | Error::CrcMismatch { .. })
    }
}
