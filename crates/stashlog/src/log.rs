//! Windowed durable log
//!
//! A [`WindowedLog`] keeps the oldest pending records of a stream in a
//! bounded [`RecordWindow`] and the full ordered history in a store. The
//! first `min(window, store)` records of both are always identical.
//!
//! Records are buffered in the window until it fills. From then on every new
//! record goes to the store, together with any window records the store does
//! not hold yet. A consumer reads [`WindowedLog::current_window`] and calls
//! [`WindowedLog::acknowledge`] once those records are delivered, which trims
//! the head of both and refills the window from the store.

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use stashlog_storage::{FileStore, LogStore};
use tracing::{debug, info, instrument, trace, warn};

use crate::compact::encode_all;
use crate::config::WindowConfig;
use crate::error::{LogError, LogResult};
use crate::record::{Record, RecordValue};
use crate::window::RecordWindow;

/// Log of boolean events
pub type EventLog<S = FileStore> = WindowedLog<bool, S>;

/// Log of `f64` samples
pub type TimeSeriesLog<S = FileStore> = WindowedLog<f64, S>;

/// Bounded, durable, append-only log of timestamped values
#[derive(Debug)]
pub struct WindowedLog<V: RecordValue, S: LogStore = FileStore> {
    /// Backing store
    store: S,
    /// Store path
    path: PathBuf,
    /// Rewrite target used by trims
    temp_path: PathBuf,
    /// File name of the store, used in logs
    name: String,
    /// Configuration
    config: WindowConfig,
    /// Oldest pending records
    window: RecordWindow<V>,
    /// Whole records currently in the store
    file_records: usize,
    /// Set once `open()` got past path validation
    opened: bool,
    /// A failed append may have left a partial block behind
    torn_tail: bool,
}

impl<V: RecordValue> WindowedLog<V, FileStore> {
    /// Create a log backed by the local filesystem
    pub fn with_file_store(path: impl Into<PathBuf>, config: WindowConfig) -> Self {
        Self::new(FileStore::new(), path, config)
    }
}

impl<V: RecordValue, S: LogStore> WindowedLog<V, S> {
    /// Create a log over `store` at `path`.
    ///
    /// Nothing is read or written until [`open`](Self::open) is called.
    pub fn new(store: S, path: impl Into<PathBuf>, config: WindowConfig) -> Self {
        let path = path.into();
        let temp_path = config.temp_path(&path);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            store,
            path,
            temp_path,
            name,
            window: RecordWindow::new(config.max_ram_records),
            config,
            file_records: 0,
            opened: false,
            torn_tail: false,
        }
    }

    /// Validate the store location and load the initial window.
    ///
    /// A load failure is reported but leaves the log open with whatever
    /// records were read before the failure, so the caller can still
    /// acknowledge its way past a damaged store.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn open(&mut self) -> LogResult<()> {
        if self.opened {
            debug!("Log already open");
            return Ok(());
        }

        self.config.validate()?;

        let parent = self.path.parent().unwrap_or_else(|| Path::new(""));
        if !self.store.dir_exists(parent) {
            return Err(LogError::MissingParent(parent.to_path_buf()));
        }
        self.opened = true;

        if self.store.exists(&self.temp_path) {
            warn!(temp = %self.temp_path.display(), "Removing stale rewrite target");
            self.store.remove(&self.temp_path)?;
        }

        if self.config.recover_torn_tail {
            self.recover_torn_tail()?;
        }

        self.refill()?;

        info!(
            window = self.window.len(),
            file_records = self.file_records,
            "Log opened"
        );
        Ok(())
    }

    /// Add a record at the tail of the log.
    ///
    /// The record stays in memory while the window has room. Once the window
    /// is full the record is written straight to the store, preceded by any
    /// window records the store does not hold yet.
    #[instrument(skip_all, fields(log = %self.name, timestamp = timestamp))]
    pub fn add_value(&mut self, timestamp: u32, value: V) -> LogResult<()> {
        self.ensure_open()?;
        self.mend_tail()?;
        let record = Record::new(timestamp, value);

        let resident = self.window.len();
        if !self.window.is_full() && self.file_records <= resident {
            self.window.append(record);
            trace!(window = resident + 1, "Record buffered");
            return Ok(());
        }

        let unsynced = &self.window.snapshot()[self.file_records.min(resident)..];
        let flushed = unsynced.len();
        let mut bytes = encode_all(unsynced);
        bytes.extend_from_slice(record.encode().as_ref());

        if flushed > 0 {
            debug!(flushed, "Window saturated, flushing to store");
        }
        self.append_records(&bytes, flushed + 1)
    }

    /// Drop the `n` oldest records from the store and the window.
    ///
    /// The store is rewritten without its first `min(n, file_records)`
    /// records and atomically swapped in; any failure before the swap leaves
    /// it untouched and the window unchanged. The window then drops up to
    /// `n` records and is refilled from the store.
    #[instrument(skip_all, fields(log = %self.name, records = n))]
    pub fn acknowledge(&mut self, n: usize) -> LogResult<()> {
        self.ensure_open()?;
        self.mend_tail()?;

        let dropped = self.trim_store(n)?;
        let released = n.min(self.window.len());
        self.window.drop_front(released);

        // The trim is committed; a failed refill must not make the caller retry it
        if let Err(err) = self.refill() {
            warn!(error = %err, "Refill after acknowledge failed");
        }

        debug!(
            dropped,
            released,
            window = self.window.len(),
            file_records = self.file_records,
            "Acknowledged"
        );
        Ok(())
    }

    /// Append every window record the store does not hold yet
    #[instrument(skip_all, fields(log = %self.name))]
    pub fn sync(&mut self) -> LogResult<()> {
        self.ensure_open()?;
        self.mend_tail()?;

        let resident = self.window.len();
        if resident <= self.file_records {
            return Ok(());
        }

        let bytes = encode_all(&self.window.snapshot()[self.file_records..]);
        self.append_records(&bytes, resident - self.file_records)
    }

    /// Oldest pending records, in order
    pub fn current_window(&self) -> &[Record<V>] {
        self.window.snapshot()
    }

    /// Read every record in the store, oldest first
    pub fn durable_records(&self) -> LogResult<Vec<Record<V>>> {
        self.ensure_open()?;
        if !self.store.exists(&self.path) {
            return Ok(Vec::new());
        }

        let width = Record::<V>::WIDTH;
        let mut reader = self
            .store
            .open_read(&self.path)
            .map_err(LogError::unavailable)?;

        let mut records = Vec::with_capacity(self.file_records);
        let mut block = V::Block::default();
        let mut offset = 0u64;
        loop {
            match read_block(&mut reader, block.as_mut())? {
                0 => return Ok(records),
                read if read < width => return Err(LogError::corruption(offset, read, width)),
                _ => {
                    records.push(decode_at::<V>(block.as_ref(), offset)?);
                    offset += width as u64;
                }
            }
        }
    }

    /// Sync and release the log
    pub fn close(mut self) -> LogResult<()> {
        let result = if self.opened { self.sync() } else { Ok(()) };
        self.opened = false;
        result
    }

    /// Name of the log (file name of its store)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Active configuration
    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Backing store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Whether `open()` has succeeded
    pub fn is_open(&self) -> bool {
        self.opened
    }

    /// Records in the window
    pub fn ram_record_count(&self) -> usize {
        self.window.len()
    }

    /// Whole records in the store
    pub fn file_record_count(&self) -> usize {
        self.file_records
    }

    /// Window capacity
    pub fn max_ram_records(&self) -> usize {
        self.window.capacity()
    }

    /// Records added and not yet acknowledged
    pub fn pending_count(&self) -> usize {
        self.window.len().max(self.file_records)
    }

    fn ensure_open(&self) -> LogResult<()> {
        if self.opened {
            Ok(())
        } else {
            Err(LogError::NotOpen)
        }
    }

    /// Append `count` encoded records to the store
    fn append_records(&mut self, bytes: &[u8], count: usize) -> LogResult<()> {
        match self.append_bytes(bytes) {
            Ok(()) => {
                self.file_records += count;
                trace!(records = count, file_records = self.file_records, "Appended");
                Ok(())
            }
            Err(err) => {
                // Some blocks may have landed before the failure, the last one partially
                if let Ok(len) = self.store.len(&self.path) {
                    self.file_records = (len / Record::<V>::WIDTH as u64) as usize;
                }
                self.torn_tail = true;
                if let Err(mend_err) = self.mend_tail() {
                    warn!(error = %mend_err, "Partial block left in store until the next write");
                }
                warn!(error = %err, file_records = self.file_records, "Append failed");
                Err(err)
            }
        }
    }

    /// Cut a partial block left by a failed append.
    ///
    /// Every write path runs this first so no record lands at an offset that
    /// is not a multiple of the block width.
    fn mend_tail(&mut self) -> LogResult<()> {
        if self.torn_tail {
            self.recover_torn_tail()?;
            self.torn_tail = false;
        }
        Ok(())
    }

    fn append_bytes(&self, bytes: &[u8]) -> LogResult<()> {
        let mut writer = self
            .store
            .open_append(&self.path)
            .map_err(LogError::unavailable)?;
        writer.write_all(bytes)?;
        writer.flush()?;
        Ok(())
    }

    /// Rewrite the store without its first `n` records, returning how many
    /// were dropped
    fn trim_store(&mut self, n: usize) -> LogResult<usize> {
        if !self.store.exists(&self.path) {
            self.store
                .touch(&self.path)
                .map_err(LogError::unavailable)?;
            self.file_records = 0;
            return Ok(0);
        }

        let reader = self
            .store
            .open_read(&self.path)
            .map_err(LogError::unavailable)?;

        // A fragment shorter than one block holds no record and goes with any trim
        let len = self.store.len(&self.path).map_err(LogError::unavailable)?;
        let fragment = self.file_records == 0 && len % Record::<V>::WIDTH as u64 != 0;

        let dropped = n.min(self.file_records);
        if dropped == 0 && !(n > 0 && fragment) {
            return Ok(0);
        }

        let kept = if dropped == self.file_records {
            self.swap_store(|_| Ok(0))?
        } else {
            self.swap_store(|writer| copy_blocks::<V, _, _>(reader, dropped, None, writer))?
        };

        debug!(dropped, kept, "Store trimmed");
        self.file_records = kept;
        Ok(dropped)
    }

    /// Drop a torn final block, keeping every whole record
    fn recover_torn_tail(&mut self) -> LogResult<()> {
        if !self.store.exists(&self.path) {
            return Ok(());
        }

        let width = Record::<V>::WIDTH as u64;
        let len = self.store.len(&self.path).map_err(LogError::unavailable)?;
        let torn = len % width;
        if torn == 0 {
            self.file_records = (len / width) as usize;
            return Ok(());
        }

        let whole = (len / width) as usize;
        let reader = self
            .store
            .open_read(&self.path)
            .map_err(LogError::unavailable)?;
        let kept = self.swap_store(|writer| copy_blocks::<V, _, _>(reader, 0, Some(whole), writer))?;

        warn!(
            discarded_bytes = torn,
            kept,
            "Recovered store with a torn tail"
        );
        self.file_records = kept;
        Ok(())
    }

    /// Fill the temp store with `fill` and swap it over the store.
    ///
    /// The store is untouched unless every step succeeds.
    fn swap_store<F>(&self, fill: F) -> LogResult<usize>
    where
        F: FnOnce(&mut S::Writer) -> LogResult<usize>,
    {
        let written = self
            .store
            .create(&self.temp_path)
            .map_err(LogError::unavailable)
            .and_then(|mut writer| {
                let kept = fill(&mut writer)?;
                writer.flush()?;
                Ok(kept)
            });

        let kept = match written {
            Ok(kept) => kept,
            Err(err) => {
                self.discard_temp();
                return Err(err);
            }
        };

        if let Err(err) = self.store.rename(&self.temp_path, &self.path) {
            self.discard_temp();
            return Err(err.into());
        }
        Ok(kept)
    }

    fn discard_temp(&self) {
        if self.store.exists(&self.temp_path) {
            if let Err(err) = self.store.remove(&self.temp_path) {
                warn!(error = %err, temp = %self.temp_path.display(), "Failed to remove rewrite target");
            }
        }
    }

    /// Load records past the window into it until it is full.
    ///
    /// Resident records are never re-read: loading starts at the block after
    /// the last one in the window.
    fn refill(&mut self) -> LogResult<()> {
        if !self.store.exists(&self.path) {
            self.file_records = 0;
            return Ok(());
        }

        let width = Record::<V>::WIDTH;
        let len = self.store.len(&self.path).map_err(LogError::unavailable)?;
        self.file_records = (len / width as u64) as usize;
        let torn = (len % width as u64) as usize;

        if !self.window.is_full() && self.file_records > self.window.len() {
            let mut reader = self
                .store
                .open_read(&self.path)
                .map_err(LogError::unavailable)?;
            let mut offset = (self.window.len() * width) as u64;
            reader.seek(SeekFrom::Start(offset))?;

            let mut block = V::Block::default();
            while !self.window.is_full() {
                match read_block(&mut reader, block.as_mut())? {
                    0 => break,
                    read if read < width => {
                        return Err(LogError::corruption(offset, read, width));
                    }
                    _ => {
                        self.window.append(decode_at::<V>(block.as_ref(), offset)?);
                        offset += width as u64;
                    }
                }
            }
            trace!(window = self.window.len(), "Window refilled");
        }

        if torn != 0 {
            return Err(LogError::corruption(len - torn as u64, torn, width));
        }
        Ok(())
    }
}

impl<V: RecordValue, S: LogStore> Drop for WindowedLog<V, S> {
    fn drop(&mut self) {
        if self.opened && self.config.sync_on_drop {
            if let Err(err) = self.sync() {
                warn!(log = %self.name, error = %err, "Sync on drop failed");
            }
        }
    }
}

/// Copy whole blocks from `reader`, skipping the first `skip`.
///
/// With `limit` unset every remaining block is copied and a partial block is
/// corruption; with a limit, copying stops after that many blocks.
fn copy_blocks<V, R, W>(
    mut reader: R,
    skip: usize,
    limit: Option<usize>,
    writer: &mut W,
) -> LogResult<usize>
where
    V: RecordValue,
    R: Read + Seek,
    W: Write,
{
    let width = Record::<V>::WIDTH;
    let mut offset = (skip * width) as u64;
    reader.seek(SeekFrom::Start(offset))?;

    let mut block = V::Block::default();
    let mut copied = 0;
    while limit.is_none_or(|limit| copied < limit) {
        match read_block(&mut reader, block.as_mut())? {
            0 => break,
            read if read < width => return Err(LogError::corruption(offset, read, width)),
            _ => {
                writer.write_all(block.as_ref())?;
                copied += 1;
                offset += width as u64;
            }
        }
    }
    Ok(copied)
}

/// Read up to one block, returning how many bytes were filled
fn read_block<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

fn decode_at<V: RecordValue>(block: &[u8], offset: u64) -> LogResult<Record<V>> {
    Record::<V>::decode(block).map_err(|source| LogError::InvalidValue { offset, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stashlog_storage::{FaultPlan, MemoryStore};

    const PATH: &str = "/series";

    fn open_log(store: &MemoryStore, capacity: usize) -> TimeSeriesLog<MemoryStore> {
        let mut log = WindowedLog::new(
            store.clone(),
            PATH,
            WindowConfig::default().with_max_ram_records(capacity),
        );
        log.open().unwrap();
        log
    }

    fn timestamps(records: &[Record<f64>]) -> Vec<u32> {
        records.iter().map(|r| r.timestamp).collect()
    }

    fn add(log: &mut TimeSeriesLog<MemoryStore>, range: std::ops::RangeInclusive<u32>) {
        for ts in range {
            log.add_value(ts, ts as f64).unwrap();
        }
    }

    #[test]
    fn test_operations_before_open() {
        let mut log: TimeSeriesLog<MemoryStore> =
            WindowedLog::new(MemoryStore::new(), PATH, WindowConfig::default());
        assert!(matches!(log.add_value(1, 1.0), Err(LogError::NotOpen)));
        assert!(matches!(log.acknowledge(1), Err(LogError::NotOpen)));
        assert!(matches!(log.sync(), Err(LogError::NotOpen)));
        assert!(matches!(log.durable_records(), Err(LogError::NotOpen)));
        assert!(log.current_window().is_empty());
    }

    #[test]
    fn test_missing_parent() {
        let mut log: EventLog<MemoryStore> =
            WindowedLog::new(MemoryStore::new(), "/missing/events", WindowConfig::default());
        assert!(matches!(log.open(), Err(LogError::MissingParent(_))));
        assert!(!log.is_open());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = WindowConfig::default();
        config.temp_suffix.clear();
        let mut log: EventLog<MemoryStore> = WindowedLog::new(MemoryStore::new(), PATH, config);
        assert!(matches!(log.open(), Err(LogError::InvalidConfig(_))));
    }

    #[test]
    fn test_name_from_path() {
        let store = MemoryStore::new().with_dir("/data");
        let log: EventLog<MemoryStore> =
            WindowedLog::new(store, "/data/door", WindowConfig::default());
        assert_eq!(log.name(), "door");
        assert_eq!(log.path(), Path::new("/data/door"));
    }

    #[test]
    fn test_buffered_until_full() {
        let store = MemoryStore::new();
        let mut log = open_log(&store, 3);
        add(&mut log, 1..=3);

        assert_eq!(timestamps(log.current_window()), vec![1, 2, 3]);
        assert_eq!(log.file_record_count(), 0);
        assert!(!store.exists(Path::new(PATH)));
    }

    #[test]
    fn test_overflow_flushes_window() {
        let store = MemoryStore::new();
        let mut log = open_log(&store, 3);
        add(&mut log, 1..=4);

        assert_eq!(timestamps(log.current_window()), vec![1, 2, 3]);
        assert_eq!(log.file_record_count(), 4);
        assert_eq!(timestamps(&log.durable_records().unwrap()), vec![1, 2, 3, 4]);

        add(&mut log, 5..=5);
        assert_eq!(log.file_record_count(), 5);
        assert_eq!(log.ram_record_count(), 3);
    }

    #[test]
    fn test_acknowledge_scenario() {
        let store = MemoryStore::new();
        let mut log = open_log(&store, 3);
        add(&mut log, 1..=4);

        log.acknowledge(2).unwrap();
        assert_eq!(timestamps(&log.durable_records().unwrap()), vec![3, 4]);
        assert_eq!(timestamps(log.current_window()), vec![3, 4]);
        assert_eq!(log.file_record_count(), 2);
        assert!(!store.exists(Path::new("/series.temp")));
    }

    #[test]
    fn test_acknowledge_everything() {
        let store = MemoryStore::new();
        let mut log = open_log(&store, 3);
        add(&mut log, 1..=6);

        log.acknowledge(6).unwrap();
        assert!(log.current_window().is_empty());
        assert_eq!(log.file_record_count(), 0);
        assert_eq!(store.bytes(Path::new(PATH)), Some(Vec::new()));
    }

    #[test]
    fn test_acknowledge_window_only_records() {
        let store = MemoryStore::new();
        let mut log = open_log(&store, 5);
        add(&mut log, 1..=3);

        log.acknowledge(2).unwrap();
        assert_eq!(timestamps(log.current_window()), vec![3]);
        // an empty store is created on the way
        assert_eq!(store.bytes(Path::new(PATH)), Some(Vec::new()));
    }

    #[test]
    fn test_acknowledge_more_than_pending() {
        let store = MemoryStore::new();
        let mut log = open_log(&store, 3);
        add(&mut log, 1..=2);

        log.acknowledge(10).unwrap();
        assert_eq!(log.pending_count(), 0);
    }

    #[test]
    fn test_acknowledge_zero_is_noop() {
        let store = MemoryStore::new();
        let mut log = open_log(&store, 2);
        add(&mut log, 1..=3);
        let before = store.bytes(Path::new(PATH));

        log.acknowledge(0).unwrap();
        assert_eq!(store.bytes(Path::new(PATH)), before);
        assert_eq!(timestamps(log.current_window()), vec![1, 2]);
    }

    #[test]
    fn test_overflow_after_trim_keeps_unsynced_records() {
        let store = MemoryStore::new();
        let mut log = open_log(&store, 3);
        add(&mut log, 1..=4);
        log.acknowledge(3).unwrap();
        assert_eq!(timestamps(log.current_window()), vec![4]);

        // window {4,5,6} with only 4 in the store, then overflow
        add(&mut log, 5..=7);
        assert_eq!(timestamps(log.current_window()), vec![4, 5, 6]);
        assert_eq!(timestamps(&log.durable_records().unwrap()), vec![4, 5, 6, 7]);
    }

    #[test]
    fn test_sync_appends_only_missing_records() {
        let store = MemoryStore::new();
        let mut log = open_log(&store, 4);
        add(&mut log, 1..=2);

        log.sync().unwrap();
        assert_eq!(log.file_record_count(), 2);
        log.sync().unwrap();
        assert_eq!(log.file_record_count(), 2);

        add(&mut log, 3..=3);
        log.sync().unwrap();
        assert_eq!(timestamps(&log.durable_records().unwrap()), vec![1, 2, 3]);
    }

    #[test]
    fn test_close_syncs() {
        let store = MemoryStore::new();
        let mut log = open_log(&store, 4);
        add(&mut log, 1..=3);
        log.close().unwrap();

        let log = open_log(&store, 4);
        assert_eq!(timestamps(log.current_window()), vec![1, 2, 3]);
    }

    #[test]
    fn test_drop_syncs_unless_disabled() {
        let store = MemoryStore::new();
        {
            let mut log = open_log(&store, 4);
            add(&mut log, 1..=2);
        }
        assert_eq!(store.len(Path::new(PATH)).unwrap(), 24);

        let other = Path::new("/other");
        {
            let mut log: TimeSeriesLog<MemoryStore> = WindowedLog::new(
                store.clone(),
                other,
                WindowConfig::default().with_sync_on_drop(false),
            );
            log.open().unwrap();
            log.add_value(1, 1.0).unwrap();
        }
        assert!(!store.exists(other));
    }

    #[test]
    fn test_reopen_loads_window() {
        let store = MemoryStore::new();
        let mut log = open_log(&store, 3);
        add(&mut log, 1..=6);
        drop(log);

        let log = open_log(&store, 3);
        assert_eq!(timestamps(log.current_window()), vec![1, 2, 3]);
        assert_eq!(log.file_record_count(), 6);
        assert_eq!(log.pending_count(), 6);
    }

    #[test]
    fn test_open_removes_stale_temp() {
        let store = MemoryStore::new();
        store.set_bytes("/series.temp", vec![1, 2, 3]);
        let _log = open_log(&store, 3);
        assert!(!store.exists(Path::new("/series.temp")));
    }

    #[test]
    fn test_torn_tail_reported_on_open() {
        let store = MemoryStore::new();
        let mut log = open_log(&store, 2);
        add(&mut log, 1..=4);
        drop(log);
        store.truncate(Path::new(PATH), 4 * 12 - 1);

        let mut log: TimeSeriesLog<MemoryStore> = WindowedLog::new(
            store.clone(),
            PATH,
            WindowConfig::default().with_max_ram_records(2),
        );
        let err = log.open().unwrap_err();
        assert!(matches!(
            err,
            LogError::Corruption {
                offset: 36,
                read: 11,
                expected: 12
            }
        ));
        // best-effort window
        assert_eq!(timestamps(log.current_window()), vec![1, 2]);
        assert!(log.is_open());
    }

    #[test]
    fn test_torn_tail_recovered_on_open() {
        let store = MemoryStore::new();
        let mut log = open_log(&store, 2);
        add(&mut log, 1..=4);
        drop(log);
        store.truncate(Path::new(PATH), 4 * 12 - 5);

        let mut log: TimeSeriesLog<MemoryStore> = WindowedLog::new(
            store.clone(),
            PATH,
            WindowConfig::default()
                .with_max_ram_records(2)
                .with_recover_torn_tail(true),
        );
        log.open().unwrap();
        assert_eq!(log.file_record_count(), 3);
        assert_eq!(store.len(Path::new(PATH)).unwrap(), 36);
    }

    #[test]
    fn test_partial_trim_aborts_on_torn_tail() {
        let store = MemoryStore::new();
        let mut log = open_log(&store, 2);
        add(&mut log, 1..=4);
        store.truncate(Path::new(PATH), 4 * 12 - 3);
        let before = store.bytes(Path::new(PATH));

        let err = log.acknowledge(1).unwrap_err();
        assert!(err.is_corruption());
        assert_eq!(store.bytes(Path::new(PATH)), before);
        assert!(!store.exists(Path::new("/series.temp")));
        assert_eq!(timestamps(log.current_window()), vec![1, 2]);
    }

    #[test]
    fn test_invalid_event_byte() {
        let store = MemoryStore::new();
        let mut bytes = Record::new(1, true).encode().to_vec();
        bytes.extend_from_slice(&[2, 0, 0, 0, 9]);
        store.set_bytes("/events", bytes);

        let mut log: EventLog<MemoryStore> =
            WindowedLog::new(store, "/events", WindowConfig::default());
        let err = log.open().unwrap_err();
        assert!(matches!(err, LogError::InvalidValue { offset: 5, .. }));
        assert_eq!(log.current_window(), &[Record::new(1, true)]);
    }

    #[test]
    fn test_unreadable_store_leaves_state() {
        let store = MemoryStore::new();
        let mut log = open_log(&store, 2);
        add(&mut log, 1..=3);
        store.set_faults(FaultPlan {
            fail_open_read: true,
            ..Default::default()
        });

        let err = log.acknowledge(1).unwrap_err();
        assert!(matches!(err, LogError::StorageUnavailable(_)));
        assert_eq!(timestamps(log.current_window()), vec![1, 2]);
        assert_eq!(log.file_record_count(), 3);
    }

    #[test]
    fn test_failed_swap_keeps_store() {
        let store = MemoryStore::new();
        let mut log = open_log(&store, 2);
        add(&mut log, 1..=4);
        let before = store.bytes(Path::new(PATH));
        store.set_faults(FaultPlan {
            fail_rename: true,
            ..Default::default()
        });

        assert!(log.acknowledge(1).is_err());
        assert_eq!(store.bytes(Path::new(PATH)), before);
        assert!(!store.exists(Path::new("/series.temp")));
        assert_eq!(log.file_record_count(), 4);

        store.clear_faults();
        log.acknowledge(1).unwrap();
        assert_eq!(timestamps(&log.durable_records().unwrap()), vec![2, 3, 4]);
    }

    #[test]
    fn test_torn_append_rederives_count() {
        let store = MemoryStore::new();
        let mut log = open_log(&store, 2);
        add(&mut log, 1..=2);
        store.set_faults(FaultPlan::torn_write_after(12 + 5));

        assert!(log.add_value(3, 3.0).is_err());
        assert_eq!(log.file_record_count(), 1);
        assert_eq!(timestamps(log.current_window()), vec![1, 2]);

        // The write budget is spent, so the partial block outlives the failure
        store.clear_faults();
        assert_eq!(store.len(Path::new(PATH)).unwrap(), 17);

        log.add_value(4, 4.0).unwrap();
        assert_eq!(store.len(Path::new(PATH)).unwrap(), 36);
        assert_eq!(
            log.durable_records().unwrap(),
            vec![
                Record::new(1, 1.0),
                Record::new(2, 2.0),
                Record::new(4, 4.0)
            ]
        );

        log.acknowledge(1).unwrap();
        drop(log);

        let log = open_log(&store, 2);
        assert_eq!(timestamps(log.current_window()), vec![2, 4]);
        assert_eq!(log.current_window()[1].value, 4.0);
        assert_eq!(timestamps(&log.durable_records().unwrap()), vec![2, 4]);
    }

    #[test]
    fn test_torn_append_cut_immediately() {
        let store = MemoryStore::new();
        let mut log = open_log(&store, 2);
        add(&mut log, 1..=2);
        store.set_faults(FaultPlan::torn_write_after(5));

        assert!(log.add_value(3, 3.0).is_err());
        assert_eq!(store.len(Path::new(PATH)).unwrap(), 0);
        assert!(!store.exists(Path::new("/series.temp")));
        assert_eq!(log.file_record_count(), 0);

        store.clear_faults();
        log.add_value(4, 4.0).unwrap();
        assert_eq!(timestamps(&log.durable_records().unwrap()), vec![1, 2, 4]);
    }

    #[test]
    fn test_acknowledge_clears_fragment() {
        let store = MemoryStore::new();
        store.set_bytes(PATH, vec![1, 0, 0, 0, 7]);

        let mut log: TimeSeriesLog<MemoryStore> =
            WindowedLog::new(store.clone(), PATH, WindowConfig::default());
        assert!(log.open().unwrap_err().is_corruption());
        assert_eq!(log.file_record_count(), 0);

        log.acknowledge(0).unwrap();
        assert_eq!(store.len(Path::new(PATH)).unwrap(), 5);

        log.acknowledge(1).unwrap();
        assert_eq!(store.len(Path::new(PATH)).unwrap(), 0);
        log.add_value(9, 9.0).unwrap();
        log.sync().unwrap();
        assert_eq!(log.durable_records().unwrap(), vec![Record::new(9, 9.0)]);
    }

    #[test]
    fn test_zero_capacity_writes_through() {
        let store = MemoryStore::new();
        let mut log = open_log(&store, 0);
        add(&mut log, 1..=3);

        assert!(log.current_window().is_empty());
        assert_eq!(log.file_record_count(), 3);
        log.acknowledge(1).unwrap();
        assert_eq!(timestamps(&log.durable_records().unwrap()), vec![2, 3]);
    }
}
