//! # firmusdb
//!
//! An embedded, single-process key-value store that persists records in
//! **one append-only log file** and keeps an in-memory index of every
//! live key. Built for read-heavy workloads where the live key set fits
//! in memory and values run from tens of bytes to ~100 KB.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                      Engine                          │
//! │  ┌─────────────┐             ┌────────────────────┐  │
//! │  │   Index     │    get      │     Log file       │  │
//! │  │  (RwLock)   │◄───────────►│   (append-only,    │  │
//! │  │ key → record│   recover   │    file mutex)     │  │
//! │  └──────┬──────┘             └─────────▲──────────┘  │
//! │         │ set / delete                 │ append /    │
//! │         └─────────────►────────────────┘ tombstone   │
//! │                                                      │
//! │  ┌────────────────────────────────────────────────┐  │
//! │  │   Compaction (vacuum: rewrite, drop dead)      │  │
//! │  └────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`engine`] | Storage engine — open, get, set, delete, snapshot, vacuum, close |
//! | [`record`] | Hand-written binary codec for the 9-byte-header record format |
//! | [`index`] | Reader-writer-locked map from key to the live record |
//! | [`log`] | Database file handle: scan, append, in-place tombstone, sync |
//! | [`compaction`] | In-place rewrite that drops tombstoned and superseded records |
//!
//! ## Key Properties
//!
//! - **Append-only writes** — a `set` never rewrites old data; it
//!   tombstones the superseded record with a single in-place byte and
//!   appends the replacement.
//! - **Memory-speed reads** — `get` is answered entirely from the
//!   index; the file is only read at open and during compaction.
//! - **Crash discipline** — the tombstone lands before the replacement,
//!   so recovery sees at most one live record per key; a torn tail is
//!   detected and refused, never silently dropped.
//! - **Batched durability** — fsync and vacuum run every N writes,
//!   configurable per engine, with `close` always syncing.
//! - **Point-in-time snapshots** — the live key set can be streamed to
//!   a second file under a read lock; the result is itself a database.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use firmusdb::engine::{Engine, EngineConfig};
//!
//! let db = Engine::open("/tmp/my.db", 0o644, EngineConfig::default()).unwrap();
//!
//! // Write
//! db.set(b"hello", b"world").unwrap();
//!
//! // Read
//! assert_eq!(db.get(b"hello"), Some(b"world".to_vec()));
//!
//! // Delete
//! db.delete(b"hello").unwrap();
//! assert_eq!(db.get(b"hello"), None);
//!
//! // Reclaim space and shut down
//! db.vacuum().unwrap();
//! db.close().unwrap();
//! ```

pub mod compaction;
pub mod engine;
pub mod index;
pub mod log;
pub mod record;
