//! # Storage Engine
//!
//! The public face of firmusdb: a single-process, embedded key-value
//! store backed by one append-only log file and an in-memory index of
//! every live key.
//!
//! ## Design Overview
//!
//! - **Reads** never touch the file. `get` answers from the index, which
//!   caches the full value for every live key.
//! - **Writes** are append-only. `set` tombstones the superseded record
//!   with a one-byte in-place write, then appends the replacement;
//!   `delete` removes the index entry and tombstones the record. Dead
//!   bytes accumulate until [`Engine::vacuum`] rewrites the file.
//! - **Recovery** is a full sequential scan at [`Engine::open`]: live
//!   records are installed newest-wins, tombstoned records are skipped,
//!   and a torn tail surfaces as an error rather than silent truncation.
//!
//! ## Concurrency Model
//!
//! Two locks with a fixed acquisition order (file mutex first, index
//! lock second) plus two plain atomic counters:
//!
//! - The **file mutex** owns the file handle and append cursor. Every
//!   mutating operation holds it for its full duration, so per-key
//!   `set`/`delete` linearise in acquisition order and compaction never
//!   interleaves with a half-finished write.
//! - The **index lock** (reader-writer) governs in-memory visibility.
//!   `get` takes it shared and briefly; `snapshot` takes it shared for
//!   the whole copy, which blocks writers but not readers.
//!
//! ## Durability
//!
//! Appends and tombstone writes bump the write counters; every
//! [`EngineConfig::fsync_batch`] writes the file is synced, and every
//! [`EngineConfig::vacuum_batch`] writes the file is compacted inline.
//! Either behaviour is disabled by 0. `close` always syncs.
//!
//! ## Limits
//!
//! Offsets are 32-bit: the database file is deliberately capped at
//! 4 GiB and all live values must fit in memory.

#[cfg(test)]
mod tests;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::{debug, error, info};

use crate::compaction::{self, CompactionError};
use crate::index::Index;
use crate::log::{LogError, LogFile, Scanned};
use crate::record::{Record, RecordError};

// ------------------------------------------------------------------------------------------------
// Error Types
// ------------------------------------------------------------------------------------------------

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An operation requiring an open handle was called after `close`.
    #[error("database is closed")]
    Closed,

    /// The recovery scan failed; the file was closed again.
    #[error("reading database file: {0}")]
    Recovery(#[source] LogError),

    /// The recovery scan failed and so did the sync while closing the
    /// file back up.
    #[error("reading database file: {scan}: while closing: {close}")]
    RecoveryClose {
        /// The original scan failure.
        scan: LogError,
        /// The secondary failure while closing.
        close: LogError,
    },

    /// A stale snapshot destination could not be removed.
    #[error("removing stale snapshot {}: {source}", path.display())]
    SnapshotRemove {
        /// The snapshot destination.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },

    /// Error from the log file layer.
    #[error(transparent)]
    Log(#[from] LogError),

    /// Error from the record codec.
    #[error(transparent)]
    Record(#[from] RecordError),

    /// Error while compacting the file.
    #[error(transparent)]
    Compaction(#[from] CompactionError),
}

// ------------------------------------------------------------------------------------------------
// Configuration
// ------------------------------------------------------------------------------------------------

/// Configuration for an [`Engine`] instance.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Number of write operations between inline vacuums. 0 disables
    /// automatic vacuuming.
    pub vacuum_batch: u64,

    /// Number of write operations between fsync calls. 0 disables
    /// batched fsync; `close` still syncs.
    pub fsync_batch: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            vacuum_batch: 50_000,
            fsync_batch: 25_000,
        }
    }
}

/// Snapshot of engine statistics returned by [`Engine::stats`].
#[derive(Debug, Clone, Copy)]
pub struct EngineStats {
    /// Number of live keys in the index.
    pub live_keys: usize,

    /// Current database file length in bytes, dead records included.
    pub file_size: u32,
}

// ------------------------------------------------------------------------------------------------
// Engine
// ------------------------------------------------------------------------------------------------

/// The storage engine handle.
///
/// All methods take `&self`; share the engine across threads with an
/// `Arc`. See the [module documentation](self) for the locking rules.
#[derive(Debug)]
pub struct Engine {
    name: PathBuf,
    config: EngineConfig,

    /// The single file mutex. `None` after `close`.
    log: Mutex<Option<LogFile>>,

    /// In-memory map of every live key to its record.
    index: Index,

    writes_since_sync: AtomicU64,
    writes_since_vacuum: AtomicU64,
}

impl Engine {
    /// Opens (or creates) the database file at `path` with the given
    /// unix permissions, then rebuilds the index by scanning the file.
    ///
    /// For a key appearing more than once, the later record wins.
    /// Tombstoned records are consumed but not indexed. A short header
    /// or short body anywhere in the file fails the open; the partial
    /// tail is never silently truncated.
    pub fn open(
        path: impl AsRef<Path>,
        mode: u32,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        let path = path.as_ref().to_path_buf();
        let mut log = LogFile::open(&path, mode)?;

        let index = Index::new();
        let mut records = 0usize;
        let mut tombstones = 0usize;
        loop {
            match log.scan_next() {
                Ok(None) => break,
                Ok(Some(Scanned::Live(record))) => {
                    records += 1;
                    index.store(record.key().to_vec(), record);
                }
                Ok(Some(Scanned::Tombstone)) => tombstones += 1,
                Err(scan) => {
                    return Err(match log.sync() {
                        Ok(()) => EngineError::Recovery(scan),
                        Err(close) => EngineError::RecoveryClose { scan, close },
                    });
                }
            }
        }

        info!(
            path = %path.display(),
            live_records = records,
            tombstones,
            keys = index.len(),
            "opened database"
        );

        Ok(Self {
            name: path,
            config,
            log: Mutex::new(Some(log)),
            index,
            writes_since_sync: AtomicU64::new(0),
            writes_since_vacuum: AtomicU64::new(0),
        })
    }

    /// Path of the database file this engine was opened on.
    pub fn name(&self) -> &Path {
        &self.name
    }

    /// Returns a copy of the value for `key`, or `None` if the key is
    /// not present. Never touches the file.
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.index.load(key).map(Record::into_value)
    }

    /// Inserts or replaces the value for `key`.
    ///
    /// The superseded record (if any) is tombstoned on disk *before*
    /// the replacement is appended, so recovery after a crash between
    /// the two writes sees at most one live record for the key.
    pub fn set(&self, key: &[u8], value: &[u8]) -> Result<(), EngineError> {
        let mut record = Record::new(key.to_vec(), value.to_vec())?;

        {
            let mut guard = self.lock_log();
            let log = guard.as_mut().ok_or(EngineError::Closed)?;

            if let Some(prior) = self.index.load(key) {
                log.write_tombstone(prior.offset())?;
                self.bump_counters();
            }

            log.append(&mut record)?;
            self.index.store(key.to_vec(), record);
            self.bump_counters();
        }

        self.maintain()
    }

    /// Removes `key` from the store. Deleting an absent key succeeds.
    pub fn delete(&self, key: &[u8]) -> Result<(), EngineError> {
        {
            let mut guard = self.lock_log();
            let log = guard.as_mut().ok_or(EngineError::Closed)?;

            let Some(record) = self.index.load_and_remove(key) else {
                return Ok(());
            };
            log.write_tombstone(record.offset())?;
            self.bump_counters();
        }

        self.maintain()
    }

    /// Compacts the database file, dropping tombstoned and superseded
    /// records and repairing the offsets of surviving index entries.
    pub fn vacuum(&self) -> Result<(), EngineError> {
        let mut guard = self.lock_log();
        let log = guard.as_mut().ok_or(EngineError::Closed)?;
        compaction::vacuum(log, &self.index)?;
        Ok(())
    }

    /// Materialises the current live key set to a new database file at
    /// `path`, replacing any existing file there.
    ///
    /// The index read lock is held for the whole copy: the snapshot
    /// reflects the store at the moment the lock is taken, writers are
    /// blocked until it completes, and readers are not. The result is a
    /// regular database file that [`Engine::open`] accepts.
    pub fn snapshot(&self, path: impl AsRef<Path>, mode: u32) -> Result<(), EngineError> {
        let path = path.as_ref();
        let guard = self.index.read_guard();

        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(EngineError::SnapshotRemove {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }

        // The snapshot never writes dead records, so it needs neither
        // vacuuming nor intermediate syncs; close performs the final one.
        let snap = Engine::open(
            path,
            mode,
            EngineConfig {
                vacuum_batch: 0,
                fsync_batch: 0,
            },
        )?;

        for record in guard.values() {
            let mut copy = Record::new(record.key().to_vec(), record.value().to_vec())?;
            snap.append_record(&mut copy)?;
        }

        info!(
            source = %self.name.display(),
            snapshot = %path.display(),
            keys = guard.len(),
            "snapshot written"
        );

        snap.close()
    }

    /// Syncs and closes the database file. A second close reports
    /// [`EngineError::Closed`].
    pub fn close(&self) -> Result<(), EngineError> {
        let mut guard = self.lock_log();
        let mut log = guard.take().ok_or(EngineError::Closed)?;
        log.sync()?;

        info!(path = %self.name.display(), "closed database");
        Ok(())
    }

    /// Current database file length in bytes, dead records included.
    pub fn file_size(&self) -> Result<u32, EngineError> {
        let mut guard = self.lock_log();
        let log = guard.as_mut().ok_or(EngineError::Closed)?;
        Ok(log.size()?)
    }

    /// Returns a point-in-time statistics snapshot.
    pub fn stats(&self) -> Result<EngineStats, EngineError> {
        Ok(EngineStats {
            live_keys: self.index.len(),
            file_size: self.file_size()?,
        })
    }

    /// Appends a record to the file without installing it in the index.
    /// Snapshot targets are populated through this path.
    fn append_record(&self, record: &mut Record) -> Result<(), EngineError> {
        {
            let mut guard = self.lock_log();
            let log = guard.as_mut().ok_or(EngineError::Closed)?;
            log.append(record)?;
            self.bump_counters();
        }

        self.maintain()
    }

    fn lock_log(&self) -> MutexGuard<'_, Option<LogFile>> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Counts one write operation against both maintenance thresholds.
    fn bump_counters(&self) {
        self.writes_since_sync.fetch_add(1, Ordering::SeqCst);
        self.writes_since_vacuum.fetch_add(1, Ordering::SeqCst);
    }

    /// Applies the batched-durability policy after a write, once the
    /// file mutex has been released by the triggering operation.
    fn maintain(&self) -> Result<(), EngineError> {
        let batch = self.config.vacuum_batch;
        if batch > 0 && self.writes_since_vacuum.load(Ordering::SeqCst) >= batch {
            self.vacuum()?;
            self.writes_since_vacuum.store(0, Ordering::SeqCst);
        }

        let batch = self.config.fsync_batch;
        if batch > 0 && self.writes_since_sync.load(Ordering::SeqCst) >= batch {
            let mut guard = self.lock_log();
            let log = guard.as_mut().ok_or(EngineError::Closed)?;
            log.sync()?;
            drop(guard);

            self.writes_since_sync.store(0, Ordering::SeqCst);
            debug!(batch, "synced database file");
        }

        Ok(())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        let mut guard = self.lock_log();
        if let Some(log) = guard.as_mut()
            && let Err(e) = log.sync()
        {
            error!(path = %self.name.display(), "failed to sync database on drop: {e}");
        }
    }
}
