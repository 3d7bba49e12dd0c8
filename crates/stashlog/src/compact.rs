//! # Compact Record Format
//!
//! Fixed-width binary layout used for every record in a store.
//!
//! ## Layout
//!
//! ```text
//! [timestamp:4][value:W]
//! ```
//!
//! - **timestamp**: `u32`, little-endian
//! - **value**: `W = V::WIDTH` bytes, little-endian (`bool` is `0x00`/`0x01`)
//!
//! There is no header, padding, length prefix or version tag. A store is
//! only interpretable from offset 0 in steps of [`Record::WIDTH`], so a byte
//! length that is not a multiple of the width means a torn write.
//!
//! ## Example
//!
//! ```
//! use stashlog::Record;
//!
//! let record = Record::new(1_700_000_000, 21.5f64);
//! let block = record.encode();
//! assert_eq!(block.len(), Record::<f64>::WIDTH);
//! assert_eq!(Record::<f64>::decode(&block).unwrap(), record);
//! ```

use thiserror::Error;

use crate::record::{Record, RecordValue, TIMESTAMP_WIDTH};

/// Compact format errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Short block: {len} bytes, record width is {expected}")]
    ShortBlock { len: usize, expected: usize },
    #[error("Invalid value byte: {0:#04x}")]
    InvalidValue(u8),
}

impl<V: RecordValue> Record<V> {
    /// Encoded width of one record
    pub const WIDTH: usize = TIMESTAMP_WIDTH + V::WIDTH;

    /// Encode into a fixed-size block
    pub fn encode(&self) -> V::Block {
        let mut block = V::Block::default();
        let buf = block.as_mut();
        buf[..TIMESTAMP_WIDTH].copy_from_slice(&self.timestamp.to_le_bytes());
        self.value.encode_into(&mut buf[TIMESTAMP_WIDTH..Self::WIDTH]);
        block
    }

    /// Decode one record from the start of `block`
    ///
    /// Bytes beyond [`Record::WIDTH`] are ignored.
    pub fn decode(block: &[u8]) -> Result<Self, CodecError> {
        if block.len() < Self::WIDTH {
            return Err(CodecError::ShortBlock {
                len: block.len(),
                expected: Self::WIDTH,
            });
        }

        let timestamp = u32::from_le_bytes([block[0], block[1], block[2], block[3]]);
        let value = V::decode_from(&block[TIMESTAMP_WIDTH..Self::WIDTH])?;
        Ok(Self { timestamp, value })
    }
}

/// Encode a run of records back to back, ready for a single append
pub fn encode_all<V: RecordValue>(records: &[Record<V>]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(records.len() * Record::<V>::WIDTH);
    for record in records {
        buf.extend_from_slice(record.encode().as_ref());
    }
    buf
}

/// Decode a buffer of back-to-back records
///
/// Fails on the first invalid value or on a trailing partial block.
pub fn decode_all<V: RecordValue>(bytes: &[u8]) -> Result<Vec<Record<V>>, CodecError> {
    bytes
        .chunks(Record::<V>::WIDTH)
        .map(Record::<V>::decode)
        .collect()
}
