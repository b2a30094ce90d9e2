//! # Log File Module
//!
//! Owns the database file handle and the append cursor, and exposes the
//! primitive file operations the engine is built from: sequential scan,
//! append, in-place tombstone write, sync, truncate, and size.
//!
//! ## On-disk layout
//!
//! The file is a bare concatenation of records in the wire format of
//! [`crate::record`] — no file header, footer, or separators. A record
//! is tombstoned in place by overwriting the deleted flag at
//! `offset + 8`; the bytes stay on disk until compaction rewrites the
//! file.
//!
//! ## Scan semantics
//!
//! [`LogFile::scan_next`] reads one record at the current position:
//!
//! - Clean end-of-file (no bytes before the header) yields `Ok(None)`.
//! - A partial header yields [`LogError::ShortMeta`].
//! - A tombstoned record is skipped without decoding the body and
//!   yields [`Scanned::Tombstone`]; the cursor still advances over it.
//! - A body shorter than the header advertises yields
//!   [`LogError::ShortBody`] — the signature a torn tail write leaves
//!   behind.
//!
//! ## Concurrency
//!
//! `LogFile` itself is not synchronized. The engine wraps it in the
//! single file mutex that serialises every mutating path; the scan
//! cursor is only meaningful under that mutex.
//!
//! ## Size limit
//!
//! Offsets and sizes are 32-bit on the wire, so the file is deliberately
//! held below 4 GiB; any operation that would cross the limit fails with
//! [`LogError::SizeTooLarge`].

#[cfg(test)]
mod tests;

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::trace;

use crate::record::{DELETED_FLAG_OFFSET, HEADER_SIZE, Record, RecordError, RecordHeader, TOMBSTONE};

// ------------------------------------------------------------------------------------------------
// Error Types
// ------------------------------------------------------------------------------------------------

/// Errors returned by log file operations.
#[derive(Debug, Error)]
pub enum LogError {
    /// The database file could not be opened or created.
    #[error("opening database file {}: {source}", path.display())]
    Open {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },

    /// End-of-file landed inside a record header.
    #[error("reading metadata: read {got} bytes of {HEADER_SIZE}")]
    ShortMeta {
        /// Header bytes actually available.
        got: usize,
    },

    /// A record body ended before the length its header advertises.
    #[error("reading key/val data: read {got} bytes, need {need}")]
    ShortBody {
        /// Body bytes actually read.
        got: usize,
        /// Body bytes the header promised.
        need: u64,
    },

    /// A write completed with fewer bytes than the record spans.
    #[error("wrote {written} bytes, need {need}")]
    ShortWrite {
        /// Bytes the write call reported.
        written: usize,
        /// Bytes that had to land.
        need: usize,
    },

    /// The file grew past what 32-bit offsets can address.
    #[error("file size {0} is too large")]
    SizeTooLarge(u64),

    /// Record codec failure.
    #[error("record codec: {0}")]
    Record(#[from] RecordError),

    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

// ------------------------------------------------------------------------------------------------
// Scan result
// ------------------------------------------------------------------------------------------------

/// One step of a sequential scan.
#[derive(Debug)]
pub enum Scanned {
    /// A live record, with its offset stamped.
    Live(Record),

    /// A tombstoned record was skipped; the cursor advanced over it.
    Tombstone,
}

// ------------------------------------------------------------------------------------------------
// LogFile
// ------------------------------------------------------------------------------------------------

/// The append-only database file and its scan cursor.
#[derive(Debug)]
pub struct LogFile {
    file: File,
    path: PathBuf,

    /// Running file offset of the next record during a sequential scan.
    /// After recovery or compaction it equals the logical end of file.
    cursor: u32,
}

impl LogFile {
    /// Opens the database file read-write, creating it with the given
    /// unix permissions if it does not exist.
    pub fn open(path: impl AsRef<Path>, mode: u32) -> Result<Self, LogError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .mode(mode)
            .open(&path)
            .map_err(|source| LogError::Open {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            file,
            path,
            cursor: 0,
        })
    }

    /// Path of the underlying database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current scan cursor, in bytes from the start of the file.
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    /// Re-stamps the scan cursor. Compaction uses this to leave the
    /// cursor at the compacted end of file.
    pub(crate) fn set_cursor(&mut self, cursor: u32) {
        self.cursor = cursor;
    }

    /// Mutable access to the raw file, for compaction's copy-back pass.
    pub(crate) fn file_mut(&mut self) -> &mut File {
        &mut self.file
    }

    /// Seeks to the start of the file and resets the scan cursor.
    pub fn rewind(&mut self) -> Result<(), LogError> {
        self.file.seek(SeekFrom::Start(0))?;
        self.cursor = 0;
        Ok(())
    }

    /// Reads the next record at the current position.
    ///
    /// Returns `Ok(None)` at a clean end of file. See the module
    /// documentation for the full scan contract.
    pub fn scan_next(&mut self) -> Result<Option<Scanned>, LogError> {
        let mut header_buf = [0u8; HEADER_SIZE];
        let got = read_up_to(&mut self.file, &mut header_buf)?;
        if got == 0 {
            return Ok(None);
        }
        if got < HEADER_SIZE {
            return Err(LogError::ShortMeta { got });
        }

        let header = RecordHeader::decode(&header_buf)?;
        let start = self.cursor;

        let end = start as u64 + header.record_len();
        if end > u32::MAX as u64 {
            return Err(LogError::SizeTooLarge(end));
        }

        if header.deleted {
            // Skip the body without decoding it.
            self.file.seek(SeekFrom::Current(header.body_len() as i64))?;
            self.cursor = end as u32;
            trace!(offset = start, len = header.record_len(), "skipped tombstone");
            return Ok(Some(Scanned::Tombstone));
        }

        let mut body = vec![0u8; header.body_len() as usize];
        let got = read_up_to(&mut self.file, &mut body)?;
        if (got as u64) < header.body_len() {
            return Err(LogError::ShortBody {
                got,
                need: header.body_len(),
            });
        }

        let mut record = Record::from_wire(&header, &body)?;
        record.set_offset(start);
        self.cursor = end as u32;

        Ok(Some(Scanned::Live(record)))
    }

    /// Appends the record at the end of the file and stamps its offset.
    ///
    /// Does not sync; durability is the engine's batched-fsync policy.
    pub fn append(&mut self, record: &mut Record) -> Result<(), LogError> {
        let end = self.file.seek(SeekFrom::End(0))?;
        if end + record.encoded_len() as u64 > u32::MAX as u64 {
            return Err(LogError::SizeTooLarge(end + record.encoded_len() as u64));
        }

        record.set_offset(end as u32);

        let buf = record.encode();
        let written = self.file.write(&buf)?;
        if written != buf.len() {
            return Err(LogError::ShortWrite {
                written,
                need: buf.len(),
            });
        }

        trace!(offset = record.offset(), len = buf.len(), "appended record");
        Ok(())
    }

    /// Overwrites the deleted flag of the record at `offset` with the
    /// tombstone value.
    pub fn write_tombstone(&mut self, offset: u32) -> Result<(), LogError> {
        self.file
            .seek(SeekFrom::Start(offset as u64 + DELETED_FLAG_OFFSET as u64))?;

        let written = self.file.write(&[TOMBSTONE])?;
        if written != 1 {
            return Err(LogError::ShortWrite { written, need: 1 });
        }

        trace!(offset, "wrote tombstone");
        Ok(())
    }

    /// Flushes OS buffers to stable storage.
    pub fn sync(&mut self) -> Result<(), LogError> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Shrinks the file to exactly `len` bytes.
    pub fn truncate(&mut self, len: u32) -> Result<(), LogError> {
        self.file.set_len(len as u64)?;
        Ok(())
    }

    /// Current file length in bytes.
    pub fn size(&self) -> Result<u32, LogError> {
        let len = self.file.metadata()?.len();
        if len > u32::MAX as u64 {
            return Err(LogError::SizeTooLarge(len));
        }
        Ok(len as u32)
    }
}

/// Reads until `buf` is full or end of file, returning the byte count.
fn read_up_to(file: &mut File, buf: &mut [u8]) -> io::Result<usize> {
    let mut got = 0;
    while got < buf.len() {
        match file.read(&mut buf[got..]) {
            Ok(0) => break,
            Ok(n) => got += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(got)
}
