//! # Compaction Module
//!
//! Rewrites the database file in place to drop tombstoned and
//! superseded records — the only way dead bytes ever leave the file.
//!
//! ## Algorithm
//!
//! All steps run while the engine holds the file mutex exclusively, so
//! no writer can observe a partially compacted file:
//!
//! 1. Rewind the live file and stream it record-by-record with the same
//!    scan used at recovery; tombstoned records are dropped, live
//!    records are written verbatim to an anonymous scratch file.
//! 2. Copy the scratch file back over the live file from offset 0 with
//!    a fixed 5 KiB buffer.
//! 3. Truncate the live file to the clean length and leave the append
//!    cursor there.
//! 4. Re-stamp each surviving index entry's offset with the record's
//!    new location, so a later in-place tombstone write lands on the
//!    right bytes.
//!
//! The scratch file comes from [`tempfile::tempfile`], which unlinks it
//! on creation; the OS reclaims it even if the process dies mid-rewrite.


use std::io::{self, Read, Seek, SeekFrom, Write};

use thiserror::Error;
use tracing::{debug, info};

use crate::index::Index;
use crate::log::{LogError, LogFile, Scanned};

/// Fixed buffer size for the scratch-to-live copy-back pass.
const COPY_BUF_SIZE: usize = 5 * 1024;

/// Errors that can occur while compacting the database file.
#[derive(Debug, Error)]
pub enum CompactionError {
    /// The record stream was unreadable — same failure surface as the
    /// recovery scan, including the torn-tail short read.
    #[error("reading database file: {0}")]
    Scan(#[source] LogError),

    /// Rewinding, truncating, or sizing the live file failed.
    #[error("log file: {0}")]
    Log(#[source] LogError),

    /// The scratch file could not be used or the copy-back failed.
    #[error("rewriting records: {0}")]
    Rewrite(#[from] io::Error),
}

/// Rewrites `log` to contain only live records and repairs the offsets
/// of surviving `index` entries. Returns the compacted file length.
///
/// The caller must hold the file mutex for the whole call.
pub(crate) fn vacuum(log: &mut LogFile, index: &Index) -> Result<u32, CompactionError> {
    let dirty_size = log.size().map_err(CompactionError::Log)?;
    log.rewind().map_err(CompactionError::Log)?;

    let mut scratch = tempfile::tempfile()?;
    let mut clean_size: u32 = 0;

    // Surviving records and where they land: (key, old offset, new offset).
    let mut moves: Vec<(Vec<u8>, u32, u32)> = Vec::new();

    loop {
        let record = match log.scan_next().map_err(CompactionError::Scan)? {
            None => break,
            Some(Scanned::Tombstone) => continue,
            Some(Scanned::Live(record)) => record,
        };

        let bytes = record.encode();
        scratch.write_all(&bytes)?;
        moves.push((record.key().to_vec(), record.offset(), clean_size));
        clean_size += bytes.len() as u32;
    }

    scratch.seek(SeekFrom::Start(0))?;
    log.rewind().map_err(CompactionError::Log)?;

    let mut buf = [0u8; COPY_BUF_SIZE];
    loop {
        let n = scratch.read(&mut buf)?;
        if n == 0 {
            break;
        }
        log.file_mut().write_all(&buf[..n])?;
    }

    log.truncate(clean_size).map_err(CompactionError::Log)?;
    log.set_cursor(clean_size);

    // A key whose entry no longer matches its old offset was superseded
    // by a later record for the same key; the authoritative move wins.
    let mut repaired = 0usize;
    for (key, old_offset, new_offset) in &moves {
        if index.update_offset(key, *old_offset, *new_offset) {
            repaired += 1;
        } else {
            debug!(
                old_offset,
                new_offset, "skipped relocation of superseded record"
            );
        }
    }

    info!(
        dirty_size,
        clean_size,
        survivors = moves.len(),
        repaired,
        "vacuum complete"
    );

    Ok(clean_size)
}
