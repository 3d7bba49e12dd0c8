//! Window configuration

use std::ffi::OsString;
use std::mem;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::LogError;
use crate::record::{Record, RecordValue};

/// Default number of records held in memory
pub const DEFAULT_MAX_RAM_RECORDS: usize = 20;

/// Default suffix of the rewrite target used by trims
pub const DEFAULT_TEMP_SUFFIX: &str = ".temp";

/// Configuration for a [`WindowedLog`](crate::WindowedLog)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Maximum records held in the in-memory window
    pub max_ram_records: usize,
    /// Suffix appended to the store path to name the rewrite target
    pub temp_suffix: String,
    /// Append unsynced window records when the log is dropped
    pub sync_on_drop: bool,
    /// Rewrite a store with a torn tail on open instead of failing
    pub recover_torn_tail: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            max_ram_records: DEFAULT_MAX_RAM_RECORDS,
            temp_suffix: DEFAULT_TEMP_SUFFIX.to_string(),
            sync_on_drop: true,
            recover_torn_tail: false,
        }
    }
}

impl WindowConfig {
    /// Window for very constrained devices
    pub fn minimal() -> Self {
        Self {
            max_ram_records: 4,
            ..Default::default()
        }
    }

    /// Window for moderate devices
    pub fn moderate() -> Self {
        Self {
            max_ram_records: 64,
            ..Default::default()
        }
    }

    /// Largest window of `V` records that fits in `bytes`, at least one record
    pub fn for_memory_budget<V: RecordValue>(bytes: usize) -> Self {
        let per_record = mem::size_of::<Record<V>>().max(1);
        Self {
            max_ram_records: (bytes / per_record).max(1),
            ..Default::default()
        }
    }

    /// Set the window capacity
    pub fn with_max_ram_records(mut self, max_ram_records: usize) -> Self {
        self.max_ram_records = max_ram_records;
        self
    }

    /// Enable or disable torn-tail recovery on open
    pub fn with_recover_torn_tail(mut self, recover: bool) -> Self {
        self.recover_torn_tail = recover;
        self
    }

    /// Enable or disable the implicit sync on drop
    pub fn with_sync_on_drop(mut self, sync: bool) -> Self {
        self.sync_on_drop = sync;
        self
    }

    /// Path of the rewrite target for the store at `path`
    pub fn temp_path(&self, path: &Path) -> PathBuf {
        let mut name = OsString::from(path.as_os_str());
        name.push(&self.temp_suffix);
        PathBuf::from(name)
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<(), LogError> {
        if self.temp_suffix.is_empty() {
            return Err(LogError::InvalidConfig(
                "temp_suffix must not be empty".to_string(),
            ));
        }
        if self.temp_suffix.contains(['/', '\\']) {
            return Err(LogError::InvalidConfig(format!(
                "temp_suffix {:?} must not contain a path separator",
                self.temp_suffix
            )));
        }
        Ok(())
    }
}
