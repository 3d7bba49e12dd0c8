//! Error types for windowed logs

use std::path::PathBuf;

use stashlog_storage::StorageError;
use thiserror::Error;

use crate::compact::CodecError;

/// Errors that can occur in log operations
#[derive(Debug, Error)]
pub enum LogError {
    /// The store could not be opened; in-memory state is unchanged
    #[error("Store unavailable: {0}")]
    StorageUnavailable(StorageError),

    /// A short block where a full record was expected
    #[error("Corrupt store at byte {offset}: read {read} of {expected} bytes")]
    Corruption {
        /// Byte offset of the short block
        offset: u64,
        /// Bytes actually available
        read: usize,
        /// Record width
        expected: usize,
    },

    /// A block holds a value the record type cannot represent
    #[error("Invalid record at byte {offset}: {source}")]
    InvalidValue {
        /// Byte offset of the record
        offset: u64,
        /// Decoder error
        #[source]
        source: CodecError,
    },

    /// Any other storage failure
    #[error("Storage error: {0}")]
    Storage(StorageError),

    /// The directory that should hold the store does not exist
    #[error("Missing parent directory for {}", .0.display())]
    MissingParent(PathBuf),

    /// The log was used before `open()` succeeded
    #[error("Log is not open")]
    NotOpen,

    /// Rejected configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<StorageError> for LogError {
    fn from(err: StorageError) -> Self {
        LogError::Storage(err)
    }
}

impl From<std::io::Error> for LogError {
    fn from(err: std::io::Error) -> Self {
        LogError::Storage(err.into())
    }
}

impl LogError {
    /// Classify a failure to open a store
    pub fn unavailable(err: StorageError) -> Self {
        if err.is_unavailable() {
            Self::StorageUnavailable(err)
        } else {
            Self::Storage(err)
        }
    }

    /// Create a new Corruption error
    pub fn corruption(offset: u64, read: usize, expected: usize) -> Self {
        Self::Corruption {
            offset,
            read,
            expected,
        }
    }

    /// Whether this error reports unreadable store contents
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::Corruption { .. } | Self::InvalidValue { .. })
    }
}

/// Result type for log operations
pub type LogResult<T> = Result<T, LogError>;
