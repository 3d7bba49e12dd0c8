//! In-memory storage implementation
//!
//! This module provides an in-memory [`LogStore`], suitable for testing and
//! simulation. Faults can be injected to exercise the rollback paths of the
//! log: failed opens, failed swaps, and writes torn after a byte budget.

use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::LogStore;
use crate::error::StorageError;

/// Faults to inject into a [`MemoryStore`]
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    /// Fail every `open_read`
    pub fail_open_read: bool,
    /// Fail every `open_append`
    pub fail_open_append: bool,
    /// Fail every `create`
    pub fail_create: bool,
    /// Fail every `rename`
    pub fail_rename: bool,
    /// Accept this many more written bytes across all writers, then fail
    pub write_budget: Option<usize>,
}

impl FaultPlan {
    /// Fail writes once `bytes` more bytes have been accepted
    pub fn torn_write_after(bytes: usize) -> Self {
        Self {
            write_budget: Some(bytes),
            ..Default::default()
        }
    }
}

/// In-memory implementation of [`LogStore`]
///
/// Clones share the same underlying files, so a test can keep a handle to
/// inspect or corrupt the bytes a log writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    /// Store contents keyed by path
    files: Arc<DashMap<PathBuf, Vec<u8>>>,
    /// Directories that `dir_exists` reports (the root always exists)
    dirs: Arc<DashSet<PathBuf>>,
    /// Injected faults
    faults: Arc<Mutex<FaultPlan>>,
}

impl MemoryStore {
    /// Create an empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a directory so logs under it can be opened
    pub fn with_dir(self, dir: impl Into<PathBuf>) -> Self {
        self.dirs.insert(dir.into());
        self
    }

    /// Replace the active fault plan
    pub fn set_faults(&self, plan: FaultPlan) {
        debug!(?plan, "Injecting storage faults");
        *self.faults.lock() = plan;
    }

    /// Remove all injected faults
    pub fn clear_faults(&self) {
        *self.faults.lock() = FaultPlan::default();
    }

    /// Copy of the bytes stored at `path`
    pub fn bytes(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.get(path).map(|data| data.value().clone())
    }

    /// Overwrite the bytes stored at `path`
    pub fn set_bytes(&self, path: impl Into<PathBuf>, data: Vec<u8>) {
        self.files.insert(path.into(), data);
    }

    /// Cut the store at `path` down to `len` bytes
    pub fn truncate(&self, path: &Path, len: usize) {
        if let Some(mut data) = self.files.get_mut(path) {
            data.truncate(len);
        }
    }

    /// Number of stores currently held
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    fn writer(&self, path: &Path) -> MemoryWriter {
        MemoryWriter {
            files: Arc::clone(&self.files),
            faults: Arc::clone(&self.faults),
            path: path.to_path_buf(),
        }
    }
}

impl LogStore for MemoryStore {
    type Reader = Cursor<Vec<u8>>;
    type Writer = MemoryWriter;

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn dir_exists(&self, path: &Path) -> bool {
        path.as_os_str().is_empty() || path == Path::new("/") || self.dirs.contains(path)
    }

    fn len(&self, path: &Path) -> Result<u64, StorageError> {
        self.files
            .get(path)
            .map(|data| data.len() as u64)
            .ok_or_else(|| StorageError::not_found(path))
    }

    fn open_read(&self, path: &Path) -> Result<Self::Reader, StorageError> {
        if self.faults.lock().fail_open_read {
            return Err(StorageError::unavailable(path, "injected open failure"));
        }
        let data = self.bytes(path).ok_or_else(|| StorageError::not_found(path))?;
        trace!(path = %path.display(), len = data.len(), "Opened store for reading");
        Ok(Cursor::new(data))
    }

    fn create(&self, path: &Path) -> Result<Self::Writer, StorageError> {
        if self.faults.lock().fail_create {
            return Err(StorageError::unavailable(path, "injected create failure"));
        }
        self.files.insert(path.to_path_buf(), Vec::new());
        Ok(self.writer(path))
    }

    fn open_append(&self, path: &Path) -> Result<Self::Writer, StorageError> {
        if self.faults.lock().fail_open_append {
            return Err(StorageError::unavailable(path, "injected open failure"));
        }
        self.files.entry(path.to_path_buf()).or_default();
        Ok(self.writer(path))
    }

    fn remove(&self, path: &Path) -> Result<(), StorageError> {
        self.files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found(path))
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), StorageError> {
        if self.faults.lock().fail_rename {
            return Err(StorageError::io("injected rename failure"));
        }
        let (_, data) = self
            .files
            .remove(from)
            .ok_or_else(|| StorageError::not_found(from))?;
        self.files.insert(to.to_path_buf(), data);
        Ok(())
    }
}

/// Appending writer returned by [`MemoryStore`]
///
/// Bytes land in the shared map as soon as they are written.
#[derive(Debug)]
pub struct MemoryWriter {
    files: Arc<DashMap<PathBuf, Vec<u8>>>,
    faults: Arc<Mutex<FaultPlan>>,
    path: PathBuf,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let accepted = {
            let mut faults = self.faults.lock();
            match faults.write_budget.as_mut() {
                Some(0) if !buf.is_empty() => {
                    return Err(io::Error::other("injected write failure"));
                }
                Some(budget) => {
                    let n = buf.len().min(*budget);
                    *budget -= n;
                    n
                }
                None => buf.len(),
            }
        };

        self.files
            .entry(self.path.clone())
            .or_default()
            .extend_from_slice(&buf[..accepted]);
        Ok(accepted)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
