//! Crash-safe JSON document store for SaveKeep
//!
//! Each collection (games, backups, settings) is one JSON document in the
//! application data directory.
//!
//! # Guarantees
//!
//! - Writes go to a temporary sibling and are renamed over the target, so a
//!   reader sees either the old or the new document, never a partial one.
//! - `update` runs read-modify-write under a per-document lock. Lock files
//!   left behind by a crashed process expire instead of blocking forever.
//! - Missing documents read as `None`; malformed documents are errors and are
//!   never reset.

mod engine;
mod lock;

pub use engine::{JsonStorage, validate_name};
pub use lock::{LockFile, LockOptions};

use savekeep_config::StorageConfig;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed document {name}: {source}")]
    Parse {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize document {name}: {source}")]
    Serialize {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid document name: {0:?}")]
    InvalidName(String),

    #[error("Timed out after {waited:?} waiting for lock on {name}")]
    LockTimeout { name: String, waited: Duration },
}

impl From<&StorageConfig> for LockOptions {
    fn from(config: &StorageConfig) -> Self {
        Self {
            retry_interval: config.lock_retry(),
            stale_after: config.lock_stale_after(),
            max_wait: config.lock_max_wait(),
        }
    }
}
