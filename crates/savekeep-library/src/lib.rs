//! Game library service for SaveKeep
//!
//! Persists tracked games, their backups and the application settings as JSON
//! documents, and runs save scans over the default locations plus the user's
//! configured paths.

mod ids;
mod models;
mod service;

pub use ids::generate_id;
pub use models::{
    AppSettings, Backup, BackupPatch, BackupStatus, BackupType, Game, GamePatch, GameStatus,
    NewBackup, NewGame, SettingsPatch, StorageStats, Theme,
};
pub use service::{BACKUPS_FILE, DEFAULT_CAPACITY_GB, DataService, GAMES_FILE, SETTINGS_FILE};

use savekeep_config::{ConfigError, SaveKeepConfig};
use savekeep_scanner::{DetectedGame, SaveScanner, ScanError};
use savekeep_storage::{JsonStorage, LockOptions, StorageError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Background task failed: {0}")]
    Task(String),
}

/// Entry point tying the record store to the save scanner
#[derive(Debug)]
pub struct SaveKeep {
    data: DataService,
    scanner: Arc<SaveScanner>,
}

impl SaveKeep {
    /// Open the data directory named by `config` and detect the home directory
    pub fn new(config: &SaveKeepConfig) -> Result<Self, LibraryError> {
        let scanner = SaveScanner::from_config(&config.scan)?;
        Self::with_scanner(config, scanner)
    }

    /// Use a prepared scanner, e.g. one rooted at a different home
    pub fn with_scanner(config: &SaveKeepConfig, scanner: SaveScanner) -> Result<Self, LibraryError> {
        let data_dir = config.resolved_data_dir()?;
        tracing::info!("Using data directory {}", data_dir.display());

        let storage = JsonStorage::with_options(data_dir, LockOptions::from(&config.storage));
        let data = DataService::new(storage).with_capacity_gb(config.storage.capacity_gb);

        Ok(Self {
            data,
            scanner: Arc::new(scanner),
        })
    }

    /// Game, backup and settings operations
    pub fn data(&self) -> &DataService {
        &self.data
    }

    pub fn data_dir(&self) -> &Path {
        self.data.storage().data_dir()
    }

    /// Scan default locations, `custom_paths` and the saved scan paths.
    ///
    /// The walk runs on the blocking pool. Unreadable locations are skipped,
    /// so only a settings read failure or a lost task is an error.
    pub async fn scan_saves<P: AsRef<Path>>(
        &self,
        custom_paths: &[P],
    ) -> Result<Vec<DetectedGame>, LibraryError> {
        let settings = self.data.get_settings().await?;

        let mut paths: Vec<PathBuf> = custom_paths
            .iter()
            .map(|p| p.as_ref().to_path_buf())
            .collect();
        for path in settings.scan_paths {
            if !paths.contains(&path) {
                paths.push(path);
            }
        }

        let scanner = Arc::clone(&self.scanner);
        let result = tokio::task::spawn_blocking(move || scanner.scan(&paths))
            .await
            .map_err(|e| LibraryError::Task(e.to_string()))?;

        tracing::info!(
            games = result.games.len(),
            files = result.report.files_found,
            inaccessible = result.report.inaccessible.len(),
            "Save scan finished"
        );
        Ok(result.games)
    }
}
