//! Timestamped records and the fixed-width values they carry

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::compact::CodecError;

/// Encoded width of a record timestamp
pub const TIMESTAMP_WIDTH: usize = 4;

/// A single timestamped value
///
/// Position in the log is implicit: records are kept strictly in the order
/// they were added.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Record<V> {
    /// Producer timestamp (seconds or ticks, opaque to the log)
    pub timestamp: u32,
    /// The logged value
    pub value: V,
}

impl<V> Record<V> {
    /// Create a new record
    pub fn new(timestamp: u32, value: V) -> Self {
        Self { timestamp, value }
    }
}

/// A value type with a fixed encoded width.
///
/// The width is part of the on-disk format of every store written with this
/// type: changing it makes existing stores unreadable.
pub trait RecordValue: Copy + PartialEq + fmt::Debug {
    /// Encoded width of the value in bytes
    const WIDTH: usize;

    /// Stack block holding one whole encoded record (timestamp + value)
    type Block: AsRef<[u8]> + AsMut<[u8]> + Default + Copy + fmt::Debug;

    /// Write the value into `out`, which is exactly `WIDTH` bytes long
    fn encode_into(&self, out: &mut [u8]);

    /// Read a value from `bytes`, which is exactly `WIDTH` bytes long
    fn decode_from(bytes: &[u8]) -> Result<Self, CodecError>;
}

impl RecordValue for bool {
    const WIDTH: usize = 1;
    type Block = [u8; TIMESTAMP_WIDTH + 1];

    fn encode_into(&self, out: &mut [u8]) {
        out[0] = u8::from(*self);
    }

    fn decode_from(bytes: &[u8]) -> Result<Self, CodecError> {
        match bytes.first() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            Some(&other) => Err(CodecError::InvalidValue(other)),
            None => Err(CodecError::ShortBlock {
                len: 0,
                expected: Self::WIDTH,
            }),
        }
    }
}

macro_rules! numeric_value {
    ($($ty:ty => $block:literal),* $(,)?) => {
        $(
            const _: () = assert!(TIMESTAMP_WIDTH + std::mem::size_of::<$ty>() == $block);

            impl RecordValue for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();
                type Block = [u8; $block];

                fn encode_into(&self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_le_bytes());
                }

                fn decode_from(bytes: &[u8]) -> Result<Self, CodecError> {
                    let raw = bytes.try_into().map_err(|_| CodecError::ShortBlock {
                        len: bytes.len(),
                        expected: Self::WIDTH,
                    })?;
                    Ok(<$ty>::from_le_bytes(raw))
                }
            }
        )*
    };
}

numeric_value!(
    u8 => 5,
    i8 => 5,
    u16 => 6,
    i16 => 6,
    u32 => 8,
    i32 => 8,
    f32 => 8,
    u64 => 12,
    i64 => 12,
    f64 => 12,
);
