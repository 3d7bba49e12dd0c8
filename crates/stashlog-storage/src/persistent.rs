//! Persistent storage implementation
//!
//! This module provides the `std::fs` backed [`LogStore`] used on real
//! devices. Every handle lives only as long as the caller keeps the returned
//! reader or writer; nothing is cached between operations.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::LogStore;
use crate::error::StorageError;

/// Configuration for a file-backed store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStoreConfig {
    /// Whether to sync data to disk on every flush (durability vs flash wear)
    pub sync_writes: bool,
    /// Write buffer size in bytes
    pub buffer_size: usize,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            sync_writes: true,
            buffer_size: 4096,
        }
    }
}

/// `std::fs` implementation of [`LogStore`]
#[derive(Debug, Clone, Default)]
pub struct FileStore {
    config: FileStoreConfig,
}

impl FileStore {
    /// Create a file store with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a file store with custom options
    pub fn with_config(config: FileStoreConfig) -> Self {
        Self { config }
    }

    /// Get the store configuration
    pub fn config(&self) -> &FileStoreConfig {
        &self.config
    }

    fn writer(&self, file: File) -> FileWriter {
        FileWriter {
            inner: BufWriter::with_capacity(self.config.buffer_size, file),
            sync_writes: self.config.sync_writes,
        }
    }

    /// Sync the directory entry after a rename so the swap itself is durable
    #[cfg(unix)]
    fn sync_parent(&self, path: &Path) {
        let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
            return;
        };
        if let Err(e) = File::open(parent).and_then(|dir| dir.sync_all()) {
            warn!(path = %parent.display(), error = %e, "Failed to sync directory");
        }
    }

    #[cfg(not(unix))]
    fn sync_parent(&self, _path: &Path) {}
}

impl LogStore for FileStore {
    type Reader = BufReader<File>;
    type Writer = FileWriter;

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn dir_exists(&self, path: &Path) -> bool {
        // A bare file name lives in the working directory
        path.as_os_str().is_empty() || path.is_dir()
    }

    fn len(&self, path: &Path) -> Result<u64, StorageError> {
        fs::metadata(path)
            .map(|m| m.len())
            .map_err(|e| open_error(path, e))
    }

    fn open_read(&self, path: &Path) -> Result<Self::Reader, StorageError> {
        let file = File::open(path).map_err(|e| open_error(path, e))?;
        trace!(path = %path.display(), "Opened store for reading");
        Ok(BufReader::new(file))
    }

    fn create(&self, path: &Path) -> Result<Self::Writer, StorageError> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| open_error(path, e))?;
        trace!(path = %path.display(), "Created empty store");
        Ok(self.writer(file))
    }

    fn open_append(&self, path: &Path) -> Result<Self::Writer, StorageError> {
        // Some flash filesystems hand back a non-empty handle when a file is
        // created in append mode. Create and close it first so the first
        // append always lands at offset 0.
        if !self.exists(path) {
            let file = File::create(path).map_err(|e| open_error(path, e))?;
            drop(file);
            debug!(path = %path.display(), "Created store before first append");
        }

        let file = OpenOptions::new()
            .append(true)
            .open(path)
            .map_err(|e| open_error(path, e))?;
        Ok(self.writer(file))
    }

    fn remove(&self, path: &Path) -> Result<(), StorageError> {
        fs::remove_file(path).map_err(|e| open_error(path, e))
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), StorageError> {
        fs::rename(from, to)?;
        if self.config.sync_writes {
            self.sync_parent(to);
        }
        debug!(from = %from.display(), to = %to.display(), "Swapped store");
        Ok(())
    }
}

/// Buffered appender returned by [`FileStore`]
///
/// `flush` pushes buffered bytes to the file and, when `sync_writes` is set,
/// waits for the data to reach the device.
#[derive(Debug)]
pub struct FileWriter {
    inner: BufWriter<File>,
    sync_writes: bool,
}

impl Write for FileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()?;
        if self.sync_writes {
            self.inner.get_ref().sync_data()?;
        }
        Ok(())
    }
}

fn open_error(path: &Path, err: io::Error) -> StorageError {
    match err.kind() {
        io::ErrorKind::NotFound => StorageError::not_found(path),
        _ => StorageError::unavailable(path, err),
    }
}
