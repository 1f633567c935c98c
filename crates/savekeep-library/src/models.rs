//! Persisted records and their create/patch inputs

use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// Game tracking state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    #[default]
    Active,
    Inactive,
    Error,
}

/// A game the user tracks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub save_path: String,
    pub last_backup: Option<String>,
    pub backup_count: u32,
    pub save_size: String,
    pub status: GameStatus,
}

/// Fields for a new game; the id is generated on creation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGame {
    pub name: String,
    #[serde(default)]
    pub icon: String,
    pub save_path: String,
    #[serde(default)]
    pub last_backup: Option<String>,
    #[serde(default)]
    pub backup_count: u32,
    #[serde(default)]
    pub save_size: String,
    #[serde(default)]
    pub status: GameStatus,
}

impl NewGame {
    pub fn new(name: impl Into<String>, save_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: String::new(),
            save_path: save_path.into(),
            last_backup: None,
            backup_count: 0,
            save_size: String::new(),
            status: GameStatus::Active,
        }
    }

    pub(crate) fn into_game(self, id: String) -> Game {
        Game {
            id,
            name: self.name,
            icon: self.icon,
            save_path: self.save_path,
            last_backup: self.last_backup,
            backup_count: self.backup_count,
            save_size: self.save_size,
            status: self.status,
        }
    }
}

/// Partial game update; absent fields are kept.
///
/// `lastBackup: null` clears the timestamp, a missing `lastBackup` keeps it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GamePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_path: Option<String>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_backup: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<GameStatus>,
}

impl GamePatch {
    pub fn apply(self, game: &mut Game) {
        if let Some(name) = self.name {
            game.name = name;
        }
        if let Some(icon) = self.icon {
            game.icon = icon;
        }
        if let Some(save_path) = self.save_path {
            game.save_path = save_path;
        }
        if let Some(last_backup) = self.last_backup {
            game.last_backup = last_backup;
        }
        if let Some(backup_count) = self.backup_count {
            game.backup_count = backup_count;
        }
        if let Some(save_size) = self.save_size {
            game.save_size = save_size;
        }
        if let Some(status) = self.status {
            game.status = status;
        }
    }
}

/// Distinguishes an explicit `null` from a missing field
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// How a backup was triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupType {
    Auto,
    #[default]
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackupStatus {
    #[default]
    Completed,
    InProgress,
    Failed,
}

/// One backup of a game's saves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub id: String,
    /// Not checked against the games document
    pub game_id: String,
    pub game_name: String,
    pub timestamp: String,
    /// Formatted size, e.g. "2.45 MB"
    pub size: String,
    #[serde(rename = "type")]
    pub backup_type: BackupType,
    pub status: BackupStatus,
}

/// Fields for a new backup; a missing timestamp means now
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBackup {
    pub game_id: String,
    pub game_name: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    pub size: String,
    #[serde(rename = "type", default)]
    pub backup_type: BackupType,
    #[serde(default)]
    pub status: BackupStatus,
}

impl NewBackup {
    pub fn new(
        game_id: impl Into<String>,
        game_name: impl Into<String>,
        size: impl Into<String>,
    ) -> Self {
        Self {
            game_id: game_id.into(),
            game_name: game_name.into(),
            timestamp: None,
            size: size.into(),
            backup_type: BackupType::Manual,
            status: BackupStatus::Completed,
        }
    }

    pub(crate) fn into_backup(self, id: String) -> Backup {
        Backup {
            id,
            game_id: self.game_id,
            game_name: self.game_name,
            timestamp: self
                .timestamp
                .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
            size: self.size,
            backup_type: self.backup_type,
            status: self.status,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub backup_type: Option<BackupType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BackupStatus>,
}

impl BackupPatch {
    pub fn apply(self, backup: &mut Backup) {
        if let Some(game_id) = self.game_id {
            backup.game_id = game_id;
        }
        if let Some(game_name) = self.game_name {
            backup.game_name = game_name;
        }
        if let Some(timestamp) = self.timestamp {
            backup.timestamp = timestamp;
        }
        if let Some(size) = self.size {
            backup.size = size;
        }
        if let Some(backup_type) = self.backup_type {
            backup.backup_type = backup_type;
        }
        if let Some(status) = self.status {
            backup.status = status;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

/// Application settings singleton.
///
/// Fields missing from an older document take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub theme: Theme,
    pub auto_backup: bool,
    /// Minutes between automatic backups
    pub backup_interval: u32,
    pub max_backups: u32,
    pub backup_location: String,
    /// Extra scan roots, without duplicates
    pub scan_paths: Vec<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            auto_backup: false,
            backup_interval: 60,
            max_backups: 10,
            backup_location: String::new(),
            scan_paths: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_backup: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_interval: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_backups: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_paths: Option<Vec<PathBuf>>,
}

impl SettingsPatch {
    pub fn apply(self, settings: &mut AppSettings) {
        if let Some(theme) = self.theme {
            settings.theme = theme;
        }
        if let Some(auto_backup) = self.auto_backup {
            settings.auto_backup = auto_backup;
        }
        if let Some(backup_interval) = self.backup_interval {
            settings.backup_interval = backup_interval;
        }
        if let Some(max_backups) = self.max_backups {
            settings.max_backups = max_backups;
        }
        if let Some(backup_location) = self.backup_location {
            settings.backup_location = backup_location;
        }
        if let Some(scan_paths) = self.scan_paths {
            let mut unique: Vec<PathBuf> = Vec::with_capacity(scan_paths.len());
            for path in scan_paths {
                if !unique.contains(&path) {
                    unique.push(path);
                }
            }
            settings.scan_paths = unique;
        }
    }
}

/// Derived storage usage, recomputed on every request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    /// Megabytes used by backups
    pub used: u64,
    /// Capacity in gigabytes
    pub total: u64,
    pub backup_count: usize,
    pub game_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_game() -> Game {
        NewGame::new("Hades", "/saves/Hades").into_game("1".to_string())
    }

    #[test]
    fn test_game_json_shape() {
        let json = serde_json::to_value(sample_game()).unwrap();
        assert_eq!(json["savePath"], "/saves/Hades");
        assert_eq!(json["backupCount"], 0);
        assert!(json["lastBackup"].is_null());
        assert_eq!(json["status"], "active");
    }

    #[test]
    fn test_backup_json_shape() {
        let mut backup = NewBackup::new("1", "Hades", "2.5 MB").into_backup("b1".to_string());
        backup.status = BackupStatus::InProgress;
        backup.backup_type = BackupType::Auto;

        let json = serde_json::to_value(&backup).unwrap();
        assert_eq!(json["type"], "auto");
        assert_eq!(json["status"], "in-progress");
        assert_eq!(json["gameId"], "1");
        assert!(json["timestamp"].as_str().is_some_and(|t| !t.is_empty()));
    }

    #[test]
    fn test_game_patch_null_vs_missing() {
        let mut game = sample_game();
        game.last_backup = Some("2024-01-01T00:00:00Z".to_string());

        let keep: GamePatch = serde_json::from_str(r#"{"backupCount": 3}"#).unwrap();
        keep.apply(&mut game);
        assert_eq!(game.backup_count, 3);
        assert!(game.last_backup.is_some());

        let clear: GamePatch = serde_json::from_str(r#"{"lastBackup": null}"#).unwrap();
        clear.apply(&mut game);
        assert!(game.last_backup.is_none());
    }

    #[test]
    fn test_settings_defaults_fill_missing_fields() {
        let settings: AppSettings =
            serde_json::from_str(r#"{"theme": "dark", "autoBackup": true}"#).unwrap();
        assert_eq!(settings.theme, Theme::Dark);
        assert!(settings.auto_backup);
        assert_eq!(settings.backup_interval, 60);
        assert_eq!(settings.max_backups, 10);
        assert!(settings.scan_paths.is_empty());
    }

    #[test]
    fn test_settings_patch_dedups_scan_paths() {
        let mut settings = AppSettings::default();
        SettingsPatch {
            scan_paths: Some(vec!["/a".into(), "/b".into(), "/a".into()]),
            ..Default::default()
        }
        .apply(&mut settings);

        assert_eq!(
            settings.scan_paths,
            vec![PathBuf::from("/a"), PathBuf::from("/b")]
        );
    }

    #[test]
    fn test_invalid_status_rejected() {
        let result: Result<GamePatch, _> = serde_json::from_str(r#"{"status": "paused"}"#);
        assert!(result.is_err());
    }
}
