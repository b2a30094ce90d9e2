//! # Record Module
//!
//! Deterministic, hand-written binary codec for a single on-disk record.
//! Because firmusdb owns this format, the on-disk representation never
//! changes due to a dependency upgrade.
//!
//! # Wire format
//!
//! ```text
//! [key_size u32 LE][val_size u32 LE][deleted u8]   <- 9-byte header
//! [key bytes      ][value bytes    ]               <- body
//! ```
//!
//! Records are concatenated in the database file with no separator,
//! file header, or checksum. All multi-byte integers are little-endian.
//! `key_size` and `val_size` are `u32`, limiting a single key or value
//! to 4 GiB (the whole file is held to the same limit by the log layer).
//!
//! # Decode contract
//!
//! Decoding is two-staged: a [`RecordHeader`] is decoded from exactly
//! [`HEADER_SIZE`] bytes, then the body is decoded against that header.
//! Decoded records own their bytes; nothing borrows from the read buffer.

#[cfg(test)]
mod tests;

use thiserror::Error;

/// Size of the fixed record header in bytes: two `u32` sizes plus the
/// deleted flag.
pub const HEADER_SIZE: usize = 9;

/// Byte offset of the deleted flag within a serialized record.
pub const DELETED_FLAG_OFFSET: u32 = HEADER_SIZE as u32 - 1;

/// Wire value of the deleted flag for a tombstoned record.
pub const TOMBSTONE: u8 = 1;

// ------------------------------------------------------------------------------------------------
// Error Types
// ------------------------------------------------------------------------------------------------

/// Errors produced by the record codec.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    /// A header decode received a slice that is not exactly [`HEADER_SIZE`] bytes.
    #[error("invalid meta slice")]
    InvalidMetaSlice,

    /// A body decode received a slice whose length does not match the header.
    #[error("invalid key/val slice")]
    InvalidKeyValSlice,

    /// Key or value length does not fit the 32-bit wire format.
    #[error("record size {HEADER_SIZE} + {key_len} + {val_len} exceeds u32 range")]
    TooLarge {
        /// Length of the offending key.
        key_len: usize,
        /// Length of the offending value.
        val_len: usize,
    },
}

// ------------------------------------------------------------------------------------------------
// RecordHeader
// ------------------------------------------------------------------------------------------------

/// The fixed 9-byte prefix of every on-disk record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// How many bytes the key spans.
    pub key_size: u32,

    /// How many bytes the value spans.
    pub val_size: u32,

    /// Whether the record is tombstoned.
    pub deleted: bool,
}

impl RecordHeader {
    /// Decodes a header from exactly [`HEADER_SIZE`] bytes.
    pub fn decode(buf: &[u8]) -> Result<Self, RecordError> {
        if buf.len() != HEADER_SIZE {
            return Err(RecordError::InvalidMetaSlice);
        }

        // The slice bounds are checked above, so these conversions cannot fail.
        let key_size = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let val_size = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);

        Ok(Self {
            key_size,
            val_size,
            deleted: buf[8] == TOMBSTONE,
        })
    }

    /// Encodes the header into its 9-byte wire form.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.key_size.to_le_bytes());
        buf[4..8].copy_from_slice(&self.val_size.to_le_bytes());
        buf[8] = if self.deleted { TOMBSTONE } else { 0 };
        buf
    }

    /// Combined length of the key and value bytes that follow the header.
    ///
    /// Widened to `u64` because the two `u32` sizes can sum past `u32::MAX`
    /// in a corrupt header; the log layer rejects such records.
    pub fn body_len(&self) -> u64 {
        self.key_size as u64 + self.val_size as u64
    }

    /// Total on-disk span of the record this header describes.
    pub fn record_len(&self) -> u64 {
        HEADER_SIZE as u64 + self.body_len()
    }
}

// ------------------------------------------------------------------------------------------------
// Record
// ------------------------------------------------------------------------------------------------

/// A single live key/value pair plus its location in the log file.
///
/// Records in memory are always live; tombstoning happens on disk via a
/// single-byte overwrite (see the log layer) and removal from the index.
/// The `offset` is stamped when the record is appended and is **not**
/// serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    key: Vec<u8>,
    value: Vec<u8>,
    offset: u32,
}

impl Record {
    /// Creates a live record, validating that both lengths fit the wire
    /// format.
    pub fn new(key: Vec<u8>, value: Vec<u8>) -> Result<Self, RecordError> {
        if HEADER_SIZE as u64 + key.len() as u64 + value.len() as u64 > u32::MAX as u64 {
            return Err(RecordError::TooLarge {
                key_len: key.len(),
                val_len: value.len(),
            });
        }

        Ok(Self {
            key,
            value,
            offset: 0,
        })
    }

    /// Reassembles a record from a decoded header and the body bytes
    /// that followed it.
    pub fn from_wire(header: &RecordHeader, body: &[u8]) -> Result<Self, RecordError> {
        if body.len() as u64 != header.body_len() {
            return Err(RecordError::InvalidKeyValSlice);
        }

        let (key, value) = body.split_at(header.key_size as usize);
        Ok(Self {
            key: key.to_vec(),
            value: value.to_vec(),
            offset: 0,
        })
    }

    /// The record's key bytes.
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// The record's value bytes.
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Consumes the record, returning the owned value bytes.
    pub fn into_value(self) -> Vec<u8> {
        self.value
    }

    /// Byte offset of this record in the log file.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Stamps the record's location in the log file.
    pub fn set_offset(&mut self, offset: u32) {
        self.offset = offset;
    }

    /// The header this record serializes with.
    pub fn header(&self) -> RecordHeader {
        RecordHeader {
            key_size: self.key.len() as u32,
            val_size: self.value.len() as u32,
            deleted: false,
        }
    }

    /// Total on-disk size of the record: header plus key plus value.
    pub fn encoded_len(&self) -> u32 {
        HEADER_SIZE as u32 + self.key.len() as u32 + self.value.len() as u32
    }

    /// Serializes the record into its on-disk form.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len() as usize);
        buf.extend_from_slice(&self.header().encode());
        buf.extend_from_slice(&self.key);
        buf.extend_from_slice(&self.value);
        buf
    }
}
