use std::path::Path;

use tracing_subscriber::EnvFilter;

use crate::engine::{Engine, EngineConfig};

/// Initialize tracing subscriber controlled by `RUST_LOG` env var.
/// Safe to call multiple times — only the first call takes effect.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Config with both maintenance batches disabled, so tests drive
/// vacuum and sync explicitly.
pub fn manual_config() -> EngineConfig {
    init_tracing();
    EngineConfig {
        vacuum_batch: 0,
        fsync_batch: 0,
    }
}

/// Opens an engine at `path` with maintenance disabled.
pub fn open(path: &Path) -> Engine {
    Engine::open(path, 0o644, manual_config()).expect("open")
}

/// Reopens an existing database, exercising the recovery scan.
pub fn reopen(path: &Path) -> Engine {
    Engine::open(path, 0o644, manual_config()).expect("reopen")
}

/// Fills the engine with `count` formatted key/value pairs.
pub fn fill(engine: &Engine, count: usize, prefix: &str) {
    for i in 0..count {
        let key = format!("{prefix}-{i:04}").into_bytes();
        let value = format!("value-of-{prefix}-{i:04}").into_bytes();
        engine.set(&key, &value).expect("set");
    }
}

/// On-disk size of one record for the given key/value lengths.
pub fn record_size(key_len: usize, val_len: usize) -> u32 {
    (crate::record::HEADER_SIZE + key_len + val_len) as u32
}
