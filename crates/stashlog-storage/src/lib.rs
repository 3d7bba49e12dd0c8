//! # Stashlog Storage
//!
//! Backing stores for stashlog's windowed durable logs.
//!
//! A store is a flat namespace of byte files that are only ever read
//! sequentially from the start, appended at the tail, or replaced whole.
//! The log on top never holds a handle across operations: every call opens
//! what it needs and closes it before returning.
//!
//! ## Features
//!
//! - **LogStore trait**: the sequential read / append / swap contract
//! - **FileStore**: `std::fs` implementation for production
//! - **MemoryStore**: in-memory implementation with fault injection for tests
//!
//! ## Example
//!
//! ```rust
//! use std::io::{Read, Write};
//! use std::path::Path;
//! use stashlog_storage::{LogStore, MemoryStore};
//!
//! let store = MemoryStore::new();
//! let path = Path::new("/series");
//!
//! let mut writer = store.open_append(path).unwrap();
//! writer.write_all(&[1, 2, 3]).unwrap();
//! writer.flush().unwrap();
//! drop(writer);
//!
//! let mut buf = Vec::new();
//! store.open_read(path).unwrap().read_to_end(&mut buf).unwrap();
//! assert_eq!(buf, vec![1, 2, 3]);
//! ```

pub mod error;
pub mod memory;
pub mod persistent;

// Re-exports
pub use error::StorageError;
pub use memory::{FaultPlan, MemoryStore};
pub use persistent::{FileStore, FileStoreConfig};

use std::io::{Read, Seek, Write};
use std::path::Path;

/// Contract between a windowed log and the medium that persists it.
///
/// Implementations must make `rename` an atomic replace of the destination,
/// and must guarantee that a store created through `create`, `touch` or the
/// creating branch of `open_append` starts at zero length.
pub trait LogStore {
    /// Sequential reader over a whole store
    type Reader: Read + Seek;
    /// Appending writer; `flush` commits the written bytes
    type Writer: Write;

    /// Check whether a store exists at `path`
    fn exists(&self, path: &Path) -> bool;

    /// Check whether `path` names an accessible directory
    fn dir_exists(&self, path: &Path) -> bool;

    /// Current length of the store in bytes
    fn len(&self, path: &Path) -> Result<u64, StorageError>;

    /// Open an existing store for sequential reading from offset 0
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unavailable`] or [`StorageError::NotFound`]
    /// if the store cannot be opened.
    fn open_read(&self, path: &Path) -> Result<Self::Reader, StorageError>;

    /// Create a fresh, zero-length store, replacing anything at `path`
    fn create(&self, path: &Path) -> Result<Self::Writer, StorageError>;

    /// Open a store for appending, creating it empty if absent
    fn open_append(&self, path: &Path) -> Result<Self::Writer, StorageError>;

    /// Remove the store at `path`
    fn remove(&self, path: &Path) -> Result<(), StorageError>;

    /// Atomically replace `to` with `from`
    fn rename(&self, from: &Path, to: &Path) -> Result<(), StorageError>;

    /// Make sure an empty store exists at `path` without touching an existing one
    fn touch(&self, path: &Path) -> Result<(), StorageError> {
        if !self.exists(path) {
            let mut writer = self.create(path)?;
            writer.flush()?;
        }
        Ok(())
    }
}
