//! # Stashlog
//!
//! Bounded, durable, append-only logs of timestamped values for
//! resource-constrained devices.
//!
//! Producers append `(timestamp, value)` records. The oldest records that
//! have not been acknowledged stay in a fixed-size in-memory window for
//! cheap inspection, and the full ordered history lives in a store made of
//! fixed-width binary records. A consumer acknowledges delivery by trimming
//! the oldest records from both.
//!
//! ## Features
//!
//! - **Compact records**: `[timestamp:4][value:W]`, little-endian, no framing
//! - **Bounded memory**: the window never holds more than `max_ram_records`
//! - **Crash-safe trims**: the store is rewritten to a temp file and swapped
//! - **Pluggable storage**: any [`LogStore`], [`FileStore`] by default
//!
//! ## Example
//!
//! ```rust
//! use stashlog::{EventLog, WindowConfig, WindowedLog};
//! use stashlog_storage::MemoryStore;
//!
//! let store = MemoryStore::new();
//! let mut log: EventLog<MemoryStore> =
//!     WindowedLog::new(store, "/door", WindowConfig::default().with_max_ram_records(2));
//! log.open().unwrap();
//!
//! log.add_value(100, true).unwrap();
//! log.add_value(101, false).unwrap();
//! log.add_value(102, true).unwrap(); // window full: goes to the store
//!
//! assert_eq!(log.current_window().len(), 2);
//! assert_eq!(log.file_record_count(), 3);
//!
//! log.acknowledge(2).unwrap();
//! assert_eq!(log.current_window()[0].timestamp, 102);
//! ```

pub mod compact;
pub mod config;
pub mod error;
pub mod log;
pub mod record;
pub mod window;

// Re-exports
pub use compact::{CodecError, decode_all, encode_all};
pub use config::{DEFAULT_MAX_RAM_RECORDS, WindowConfig};
pub use error::{LogError, LogResult};
pub use log::{EventLog, TimeSeriesLog, WindowedLog};
pub use record::{Record, RecordValue};
pub use window::RecordWindow;

pub use stashlog_storage::{
    FaultPlan, FileStore, FileStoreConfig, LogStore, MemoryStore, StorageError,
};
