//! Configuration sections

use crate::Platform;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Data store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the JSON documents (platform data dir when unset)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Interval between lock attempts under contention
    #[serde(default = "default_lock_retry_ms")]
    pub lock_retry_ms: u64,

    /// Age after which a lock file is considered abandoned
    #[serde(default = "default_lock_stale_secs")]
    pub lock_stale_secs: u64,

    /// Optional cap on how long an update waits for the lock
    #[serde(default)]
    pub lock_max_wait_ms: Option<u64>,

    /// Capacity reported by storage statistics, in gigabytes
    #[serde(default = "default_capacity_gb")]
    pub capacity_gb: u64,
}

fn default_lock_retry_ms() -> u64 {
    100
}

fn default_lock_stale_secs() -> u64 {
    30
}

fn default_capacity_gb() -> u64 {
    500
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            lock_retry_ms: default_lock_retry_ms(),
            lock_stale_secs: default_lock_stale_secs(),
            lock_max_wait_ms: None,
            capacity_gb: default_capacity_gb(),
        }
    }
}

impl StorageConfig {
    pub fn lock_retry(&self) -> Duration {
        Duration::from_millis(self.lock_retry_ms)
    }

    pub fn lock_stale_after(&self) -> Duration {
        Duration::from_secs(self.lock_stale_secs)
    }

    pub fn lock_max_wait(&self) -> Option<Duration> {
        self.lock_max_wait_ms.map(Duration::from_millis)
    }
}

/// Save scan tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Directory levels walked below each root
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Files smaller than this many bytes are ignored
    #[serde(default = "default_min_file_size")]
    pub min_file_size: u64,

    /// Force a platform instead of detecting the host
    #[serde(default)]
    pub platform: Option<Platform>,

    /// Additional save extensions, with or without the leading dot
    #[serde(default)]
    pub extra_extensions: Vec<String>,

    /// Additional directory names to skip
    #[serde(default)]
    pub extra_ignore_dirs: Vec<String>,
}

fn default_max_depth() -> usize {
    10
}

fn default_min_file_size() -> u64 {
    1024
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            min_file_size: default_min_file_size(),
            platform: None,
            extra_extensions: Vec::new(),
            extra_ignore_dirs: Vec::new(),
        }
    }
}

impl ScanConfig {
    /// Configured platform, falling back to the host
    pub fn platform(&self) -> Platform {
        self.platform.unwrap_or_else(Platform::current)
    }
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
