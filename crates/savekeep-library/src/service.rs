//! Game, backup and settings records over the JSON store

use crate::LibraryError;
use crate::ids::generate_id;
use crate::models::{
    AppSettings, Backup, BackupPatch, Game, GamePatch, NewBackup, NewGame, SettingsPatch,
    StorageStats,
};
use savekeep_scanner::parse_size;
use savekeep_storage::JsonStorage;

pub const GAMES_FILE: &str = "games.json";
pub const BACKUPS_FILE: &str = "backups.json";
pub const SETTINGS_FILE: &str = "settings.json";

/// Capacity reported by [`StorageStats::total`] when not configured
pub const DEFAULT_CAPACITY_GB: u64 = 500;

const MEGABYTE: f64 = 1024.0 * 1024.0;

/// CRUD over the three persisted documents.
///
/// Every mutation is a locked read-modify-write of one document. There are
/// no cross-document transactions.
#[derive(Debug)]
pub struct DataService {
    storage: JsonStorage,
    capacity_gb: u64,
}

impl DataService {
    pub fn new(storage: JsonStorage) -> Self {
        Self {
            storage,
            capacity_gb: DEFAULT_CAPACITY_GB,
        }
    }

    pub fn with_capacity_gb(mut self, capacity_gb: u64) -> Self {
        self.capacity_gb = capacity_gb;
        self
    }

    pub fn storage(&self) -> &JsonStorage {
        &self.storage
    }

    // Games

    pub async fn list_games(&self) -> Result<Vec<Game>, LibraryError> {
        Ok(self.storage.read::<Vec<Game>>(GAMES_FILE).await?.unwrap_or_default())
    }

    pub async fn get_game(&self, id: &str) -> Result<Option<Game>, LibraryError> {
        let games = self.list_games().await?;
        Ok(games.into_iter().find(|game| game.id == id))
    }

    pub async fn create_game(&self, fields: NewGame) -> Result<Game, LibraryError> {
        let game = fields.into_game(generate_id());

        let created = game.clone();
        self.storage
            .update(GAMES_FILE, move |games: Option<Vec<Game>>| {
                let mut games = games.unwrap_or_default();
                games.push(created);
                games
            })
            .await?;

        tracing::info!("Game created: {}", game.name);
        Ok(game)
    }

    /// Apply `patch` to the game with `id`; `None` when there is no such game
    pub async fn update_game(&self, id: &str, patch: GamePatch) -> Result<Option<Game>, LibraryError> {
        let games = self
            .storage
            .try_update(GAMES_FILE, |games: Option<Vec<Game>>| {
                let mut games = games?;
                let game = games.iter_mut().find(|game| game.id == id)?;
                patch.apply(game);
                Some(games)
            })
            .await?;

        let updated = games.and_then(|games| games.into_iter().find(|game| game.id == id));
        match &updated {
            Some(game) => tracing::info!("Game updated: {}", game.name),
            None => tracing::debug!("Game {} not found, nothing to update", id),
        }
        Ok(updated)
    }

    /// Remove the game with `id`; `false` when there was none.
    ///
    /// Backups referring to it are kept.
    pub async fn delete_game(&self, id: &str) -> Result<bool, LibraryError> {
        let remaining = self
            .storage
            .try_update(GAMES_FILE, |games: Option<Vec<Game>>| {
                let mut games = games?;
                let before = games.len();
                games.retain(|game| game.id != id);
                (games.len() < before).then_some(games)
            })
            .await?;

        let deleted = remaining.is_some();
        if deleted {
            tracing::info!("Game deleted: {}", id);
        }
        Ok(deleted)
    }

    // Backups

    pub async fn list_backups(&self) -> Result<Vec<Backup>, LibraryError> {
        Ok(self.storage.read::<Vec<Backup>>(BACKUPS_FILE).await?.unwrap_or_default())
    }

    pub async fn list_backups_for_game(&self, game_id: &str) -> Result<Vec<Backup>, LibraryError> {
        let backups = self.list_backups().await?;
        Ok(backups
            .into_iter()
            .filter(|backup| backup.game_id == game_id)
            .collect())
    }

    pub async fn get_backup(&self, id: &str) -> Result<Option<Backup>, LibraryError> {
        let backups = self.list_backups().await?;
        Ok(backups.into_iter().find(|backup| backup.id == id))
    }

    pub async fn create_backup(&self, fields: NewBackup) -> Result<Backup, LibraryError> {
        let backup = fields.into_backup(generate_id());

        let created = backup.clone();
        self.storage
            .update(BACKUPS_FILE, move |backups: Option<Vec<Backup>>| {
                let mut backups = backups.unwrap_or_default();
                backups.push(created);
                backups
            })
            .await?;

        tracing::info!("Backup created for game: {}", backup.game_name);
        Ok(backup)
    }

    pub async fn update_backup(
        &self,
        id: &str,
        patch: BackupPatch,
    ) -> Result<Option<Backup>, LibraryError> {
        let backups = self
            .storage
            .try_update(BACKUPS_FILE, |backups: Option<Vec<Backup>>| {
                let mut backups = backups?;
                let backup = backups.iter_mut().find(|backup| backup.id == id)?;
                patch.apply(backup);
                Some(backups)
            })
            .await?;

        let updated = backups.and_then(|backups| backups.into_iter().find(|backup| backup.id == id));
        if updated.is_some() {
            tracing::info!("Backup updated: {}", id);
        }
        Ok(updated)
    }

    pub async fn delete_backup(&self, id: &str) -> Result<bool, LibraryError> {
        let remaining = self
            .storage
            .try_update(BACKUPS_FILE, |backups: Option<Vec<Backup>>| {
                let mut backups = backups?;
                let before = backups.len();
                backups.retain(|backup| backup.id != id);
                (backups.len() < before).then_some(backups)
            })
            .await?;

        let deleted = remaining.is_some();
        if deleted {
            tracing::info!("Backup deleted: {}", id);
        }
        Ok(deleted)
    }

    // Settings

    /// Stored settings, or the defaults when none were saved yet
    pub async fn get_settings(&self) -> Result<AppSettings, LibraryError> {
        Ok(self.storage.read::<AppSettings>(SETTINGS_FILE).await?.unwrap_or_default())
    }

    /// Merge `patch` over the stored settings (or the defaults)
    pub async fn update_settings(&self, patch: SettingsPatch) -> Result<AppSettings, LibraryError> {
        let settings = self
            .storage
            .update(SETTINGS_FILE, |settings: Option<AppSettings>| {
                let mut settings = settings.unwrap_or_default();
                patch.apply(&mut settings);
                settings
            })
            .await?;

        tracing::info!("Settings updated");
        Ok(settings)
    }

    // Stats

    pub async fn get_storage_stats(&self) -> Result<StorageStats, LibraryError> {
        let games = self.list_games().await?;
        let backups = self.list_backups().await?;

        let used_bytes: u64 = backups
            .iter()
            .filter_map(|backup| {
                let bytes = parse_size(&backup.size);
                if bytes.is_none() {
                    tracing::debug!("Ignoring unparsable backup size {:?}", backup.size);
                }
                bytes
            })
            .sum();

        Ok(StorageStats {
            used: (used_bytes as f64 / MEGABYTE).round() as u64,
            total: self.capacity_gb,
            backup_count: backups.len(),
            game_count: games.len(),
        })
    }
}
