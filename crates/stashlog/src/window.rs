//! # Record Window
//!
//! Fixed-capacity, oldest-first working set of a log. The window never
//! allocates past the capacity it was built with, so its memory cost is
//! known up front: see [`RecordWindow::footprint_bytes`].
//!
//! ## Thread Safety
//!
//! [`RecordWindow`] is **not** synchronized. All mutation goes through
//! `&mut self`; an owner shared across threads must wrap it (or the log that
//! owns it) in a lock.
//!
//! ## Example
//!
//! ```
//! use stashlog::{Record, RecordWindow};
//!
//! let mut window = RecordWindow::new(2);
//! window.append(Record::new(1, 0.5f64));
//! window.append(Record::new(2, 0.7f64));
//! assert!(window.is_full());
//!
//! window.drop_front(1);
//! assert_eq!(window.snapshot(), &[Record::new(2, 0.7f64)]);
//! ```

use std::mem;

use crate::record::{Record, RecordValue};

/// Capacity-bounded FIFO of the oldest pending records
#[derive(Debug, Clone)]
pub struct RecordWindow<V> {
    records: Vec<Record<V>>,
    capacity: usize,
}

impl<V: RecordValue> RecordWindow<V> {
    /// Create an empty window holding at most `capacity` records
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a record at the tail.
    ///
    /// Capacity is enforced by the owner; appending to a full window is a
    /// logic error caught in debug builds.
    pub fn append(&mut self, record: Record<V>) {
        debug_assert!(
            self.records.len() < self.capacity,
            "window overflow: capacity {}",
            self.capacity
        );
        self.records.push(record);
    }

    /// Remove the `n` oldest records.
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds the number of records held.
    pub fn drop_front(&mut self, n: usize) {
        assert!(
            n <= self.records.len(),
            "cannot drop {} records from a window of {}",
            n,
            self.records.len()
        );
        self.records.drain(..n);
    }

    /// Ordered view of the window, oldest first
    pub fn snapshot(&self) -> &[Record<V>] {
        &self.records
    }

    /// Number of records held
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the window holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether the window is at capacity
    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    /// Maximum number of records
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Free slots left before the window is full
    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.records.len())
    }

    /// Heap bytes reserved for the window's records
    pub fn footprint_bytes(&self) -> usize {
        self.capacity * mem::size_of::<Record<V>>()
    }
}
