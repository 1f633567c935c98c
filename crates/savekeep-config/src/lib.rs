//! Configuration management for SaveKeep
//!
//! Handles the data directory location, scan tuning, lock timing and log level.
//! Configuration is a single TOML file; every section is optional and falls back
//! to built-in defaults.

mod platform;
mod sections;

pub use platform::Platform;
pub use sections::{LoggingConfig, ScanConfig, StorageConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Application directory name under the platform config/data roots
pub const APP_DIR: &str = "savekeep";

/// Sub-directory of the application data dir holding the JSON documents
pub const DATA_SUBDIR: &str = "userData";

/// Configuration file name
pub const CONFIG_FILE: &str = "config.toml";

/// Main SaveKeep configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaveKeepConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SaveKeepConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default location
    pub fn load_default() -> Result<Self, ConfigError> {
        if let Some(path) = Self::existing_default_path() {
            return Self::load(&path);
        }

        tracing::warn!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        tracing::info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// `<config dir>/savekeep/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// The default configuration file, if one has been created
    pub fn existing_default_path() -> Option<PathBuf> {
        Self::default_path().filter(|path| path.exists())
    }

    /// Data directory to use: the configured one, else `<data dir>/savekeep/userData`
    pub fn resolved_data_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = &self.storage.data_dir {
            return Ok(dir.clone());
        }

        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR).join(DATA_SUBDIR))
            .ok_or_else(|| ConfigError::Invalid("no platform data directory available".into()))
    }

    /// Reject values the scanner and store cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.max_depth == 0 {
            return Err(ConfigError::Invalid("scan.max_depth must be at least 1".into()));
        }
        if self.storage.lock_retry_ms == 0 {
            return Err(ConfigError::Invalid(
                "storage.lock_retry_ms must be greater than zero".into(),
            ));
        }
        if self.storage.lock_stale_secs == 0 {
            return Err(ConfigError::Invalid(
                "storage.lock_stale_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_default_config() {
        let config = SaveKeepConfig::default();
        assert_eq!(config.scan.max_depth, 10);
        assert_eq!(config.scan.min_file_size, 1024);
        assert_eq!(config.storage.lock_retry_ms, 100);
        assert_eq!(config.storage.capacity_gb, 500);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let config_content = r#"
[scan]
max_depth = 4
platform = "windows"

[storage]
data_dir = "/tmp/savekeep-data"
"#;
        write!(temp_file, "{}", config_content).unwrap();

        let config = SaveKeepConfig::load(temp_file.path()).unwrap();
        assert_eq!(config.scan.max_depth, 4);
        assert_eq!(config.scan.min_file_size, 1024);
        assert_eq!(config.scan.platform(), Platform::Windows);
        assert_eq!(
            config.resolved_data_dir().unwrap(),
            PathBuf::from("/tmp/savekeep-data")
        );
        assert_eq!(config.storage.lock_stale_secs, 30);
    }

    #[test]
    fn test_save_config_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let mut config = SaveKeepConfig::default();
        config.scan.extra_extensions = vec!["rpgsave".to_string()];
        config.save(&path).unwrap();

        let loaded = SaveKeepConfig::load(&path).unwrap();
        assert_eq!(loaded.scan.extra_extensions, vec!["rpgsave".to_string()]);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = SaveKeepConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "[scan]\nmax_depth = 0\n").unwrap();

        let err = SaveKeepConfig::load(temp_file.path()).unwrap_err();
        assert!(format!("{}", err).contains("max_depth"));
    }

    #[test]
    fn test_lock_durations() {
        let storage = StorageConfig {
            lock_max_wait_ms: Some(250),
            ..Default::default()
        };
        assert_eq!(storage.lock_retry().as_millis(), 100);
        assert_eq!(storage.lock_stale_after().as_secs(), 30);
        assert_eq!(storage.lock_max_wait().unwrap().as_millis(), 250);
    }
}
