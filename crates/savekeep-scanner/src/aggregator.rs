//! Per-game scan records

use crate::format::format_size;
use crate::scanner::DetectedSaveFile;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One game found by a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedGame {
    /// Reversible encoding of `game_name`, stable across scans
    pub id: String,
    pub game_name: String,
    /// Directory of the first file encountered for this game
    pub save_path: PathBuf,
    /// Newest first
    pub files: Vec<DetectedSaveFile>,
    pub total_size_bytes: u64,
    pub total_size: String,
    pub file_count: usize,
}

/// Scan-session id for a game name (lowercase hex of its UTF-8 bytes)
pub fn encode_id(game_name: &str) -> String {
    hex::encode(game_name.as_bytes())
}

/// Inverse of [`encode_id`]
pub fn decode_id(id: &str) -> Option<String> {
    let bytes = hex::decode(id).ok()?;
    String::from_utf8(bytes).ok()
}

/// Turn grouped files into final records sorted by game name
pub fn finalize(groups: BTreeMap<String, Vec<DetectedSaveFile>>) -> Vec<DetectedGame> {
    let mut games: Vec<DetectedGame> = groups
        .into_iter()
        .filter_map(|(game_name, files)| build_game(game_name, files))
        .collect();

    games.sort_by(|a, b| a.game_name.cmp(&b.game_name));
    games
}

fn build_game(game_name: String, mut files: Vec<DetectedSaveFile>) -> Option<DetectedGame> {
    let first = files.first()?;
    let save_path = first
        .path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_default();

    let total_size_bytes: u64 = files.iter().map(|f| f.size_bytes).sum();

    files.sort_by(|a, b| b.modified.cmp(&a.modified));

    Some(DetectedGame {
        id: encode_id(&game_name),
        game_name,
        save_path,
        file_count: files.len(),
        files,
        total_size_bytes,
        total_size: format_size(total_size_bytes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn file(path: &str, size_bytes: u64, modified: DateTime<Utc>) -> DetectedSaveFile {
        let path = PathBuf::from(path);
        DetectedSaveFile {
            name: path.file_name().unwrap().to_string_lossy().to_string(),
            size: format_size(size_bytes),
            size_bytes,
            modified,
            last_modified: crate::format::format_date(modified),
            extension: ".sav".to_string(),
            path,
        }
    }

    #[test]
    fn test_id_roundtrip() {
        let id = encode_id("Hollow Knight");
        assert_eq!(id, "486f6c6c6f77204b6e69676874");
        assert_eq!(decode_id(&id).as_deref(), Some("Hollow Knight"));
        assert_eq!(decode_id("zz"), None);
    }

    #[test]
    fn test_finalize_totals_and_order() {
        let jan = Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap();
        let dec = Utc.with_ymd_and_hms(2023, 12, 31, 0, 0, 0).unwrap();
        let feb = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();

        let mut groups = BTreeMap::new();
        groups.insert(
            "zeta".to_string(),
            vec![file("/g/zeta/a.sav", 2048, jan)],
        );
        groups.insert(
            "Alpha".to_string(),
            vec![
                file("/g/alpha/old/a.sav", 1024, dec),
                file("/g/alpha/new/b.sav", 1536, feb),
                file("/g/alpha/new/c.sav", 2048, jan),
            ],
        );

        let games = finalize(groups);
        assert_eq!(games.len(), 2);
        // Case-sensitive ordering puts uppercase first
        assert_eq!(games[0].game_name, "Alpha");
        assert_eq!(games[1].game_name, "zeta");

        let alpha = &games[0];
        assert_eq!(alpha.file_count, 3);
        assert_eq!(alpha.total_size_bytes, 4608);
        assert_eq!(alpha.total_size, "4.5 KB");
        // Save path comes from the first file in scan order
        assert_eq!(alpha.save_path, PathBuf::from("/g/alpha/old"));
        let names: Vec<_> = alpha.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["b.sav", "c.sav", "a.sav"]);
        assert_eq!(decode_id(&alpha.id).as_deref(), Some("Alpha"));
    }

    #[test]
    fn test_empty_groups_are_dropped() {
        let mut groups = BTreeMap::new();
        groups.insert("ghost".to_string(), Vec::new());
        assert!(finalize(groups).is_empty());
    }
}
