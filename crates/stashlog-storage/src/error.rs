//! Error types for stashlog-storage
//!
//! This module defines the error types used throughout the storage crate.

use std::path::Path;

use thiserror::Error;

/// Errors that can occur in storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error during storage operations
    #[error("I/O error: {0}")]
    Io(String),

    /// The store (or its directory) could not be opened
    #[error("Store unavailable: {path}: {reason}")]
    Unavailable {
        /// Path of the store that failed to open
        path: String,
        /// Underlying cause
        reason: String,
    },

    /// Requested store was not found
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

impl StorageError {
    /// Create a new NotFound error
    pub fn not_found(path: &Path) -> Self {
        Self::NotFound(path.display().to_string())
    }

    /// Create a new Unavailable error
    pub fn unavailable(path: &Path, reason: impl ToString) -> Self {
        Self::Unavailable {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a new I/O error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    /// Whether this error means the store could not be opened at all
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::NotFound(_))
    }
}
