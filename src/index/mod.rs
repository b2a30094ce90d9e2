//! # Index Module
//!
//! The in-memory mapping from key to the currently live [`Record`] for
//! that key.
//!
//! ## Design Invariants
//!
//! - Exactly one live record per key; a `store` for an existing key
//!   replaces the prior entry wholesale.
//! - Entries are independent copies of the decoded file data; nothing in
//!   the index borrows from a read buffer.
//! - Offsets held by entries always point at a live (non-tombstoned)
//!   record in the log file. Compaction rewrites them via
//!   [`Index::update_offset`].
//!
//! ## Concurrency
//!
//! A single `RwLock` guards the map. Point operations (`store`, `load`,
//! `load_and_remove`) hold the lock only for the duration of the call;
//! [`Index::read_guard`] hands out an externally scoped shared guard so
//! a snapshot can pin the whole map while it streams entries out.
//!
//! Poisoned locks are recovered with `PoisonError::into_inner`: the map
//! holds plain owned data, so a writer that panicked mid-operation
//! cannot leave it structurally broken.


use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use crate::record::Record;

/// Shared read guard over the whole index, as handed out by
/// [`Index::read_guard`].
pub type IndexReadGuard<'a> = RwLockReadGuard<'a, HashMap<Vec<u8>, Record>>;

/// Reader-writer-locked map from key bytes to the live record.
#[derive(Debug, Default)]
pub struct Index {
    inner: RwLock<HashMap<Vec<u8>, Record>>,
}

impl Index {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Inserts or replaces the entry for `key`.
    pub fn store(&self, key: Vec<u8>, record: Record) {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.insert(key, record);
    }

    /// Returns a copy of the entry for `key`, if present.
    ///
    /// The copy is a complete snapshot; callers answer `get` from it
    /// without holding any lock.
    pub fn load(&self, key: &[u8]) -> Option<Record> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.get(key).cloned()
    }

    /// Removes and returns the entry for `key`, atomically with respect
    /// to concurrent callers.
    pub fn load_and_remove(&self, key: &[u8]) -> Option<Record> {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.remove(key)
    }

    /// Re-stamps the offset of the entry for `key`, but only while it
    /// still points at `old_offset`.
    ///
    /// Compaction uses this to repair surviving entries after records
    /// move; the guard keeps a superseded duplicate of the same key from
    /// clobbering the authoritative entry's location.
    pub(crate) fn update_offset(&self, key: &[u8], old_offset: u32, new_offset: u32) -> bool {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match map.get_mut(key) {
            Some(record) if record.offset() == old_offset => {
                record.set_offset(new_offset);
                true
            }
            _ => false,
        }
    }

    /// Acquires a shared lock over the entire map for the lifetime of
    /// the returned guard. Iteration over all entries happens only
    /// through this guard.
    pub fn read_guard(&self) -> IndexReadGuard<'_> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.len()
    }

    /// Whether the index holds no live keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
