//! Game name inference and grouping
//!
//! On the primary platform each file runs through an ordered cascade:
//!
//! 1. the first known anchor folder in the path names the game
//!    ([`ANCHOR_RULES`]),
//! 2. otherwise the folder above the deepest save-like folder,
//! 3. otherwise the file's parent folder, unless that is a generic root.
//!
//! Other platforms use the parent folder directly. Anything that resolves to
//! nothing usable becomes [`UNKNOWN_GAME`].

use crate::patterns::is_save_folder;
use crate::scanner::DetectedSaveFile;
use savekeep_config::Platform;
use std::collections::BTreeMap;
use std::path::Path;

/// Name given to files no rule could place
pub const UNKNOWN_GAME: &str = "Unknown Game";

/// Parent folder names that never identify a game
pub const GENERIC_ROOTS: &[&str] = &["Documents", "ProgramData"];

/// How an anchor turns the following path segments into a name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameRule {
    /// The segment `n` places after the anchor
    Segment(usize),
    /// Steam `userdata/<user id>/<app id>`, named after the app id
    SteamApp,
}

/// A marker directory and the rule applied after it
#[derive(Debug, Clone, Copy)]
pub struct AnchorRule {
    pub marker: &'static str,
    pub rule: NameRule,
}

/// Anchors in priority order; the first marker present in the path decides.
///
/// `AppData` skips the `Local`/`Roaming`/`LocalLow` level. A save folder
/// below the game folder (`AppData/Local/<Game>/Saves`) is internal
/// structure, so `<Game>` stays the name either way.
pub const ANCHOR_RULES: &[AnchorRule] = &[
    AnchorRule {
        marker: "My Games",
        rule: NameRule::Segment(1),
    },
    AnchorRule {
        marker: "Saved Games",
        rule: NameRule::Segment(1),
    },
    AnchorRule {
        marker: "userdata",
        rule: NameRule::SteamApp,
    },
    AnchorRule {
        marker: "AppData",
        rule: NameRule::Segment(2),
    },
    AnchorRule {
        marker: "ProgramData",
        rule: NameRule::Segment(1),
    },
    AnchorRule {
        marker: "Documents",
        rule: NameRule::Segment(1),
    },
];

/// Assigns each detected file to an inferred game name
#[derive(Debug, Clone, Copy)]
pub struct GameGrouper {
    platform: Platform,
}

impl GameGrouper {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }

    /// Partition files by game name, preserving scan order within each group
    pub fn group(&self, files: Vec<DetectedSaveFile>) -> BTreeMap<String, Vec<DetectedSaveFile>> {
        let total = files.len();
        let mut groups: BTreeMap<String, Vec<DetectedSaveFile>> = BTreeMap::new();

        for file in files {
            let name = self.infer_name(&file.path);
            groups.entry(name).or_default().push(file);
        }

        tracing::info!("Grouped {} files into {} games", total, groups.len());
        for (name, files) in &groups {
            tracing::debug!("  {}: {} files", name, files.len());
        }

        groups
    }

    /// Game name for a single file path
    pub fn infer_name(&self, path: &Path) -> String {
        let segments = self.segments(path);

        let candidate = if self.platform.is_primary() {
            anchor_name(&segments)
                .or_else(|| save_folder_parent(&segments))
                .or_else(|| {
                    immediate_parent(&segments)
                        .filter(|p| !GENERIC_ROOTS.contains(p))
                        .map(str::to_string)
                })
        } else {
            immediate_parent(&segments).map(str::to_string)
        };

        clean_name(candidate)
    }

    /// Path components as strings, file name last.
    ///
    /// Windows paths are split on both separators so they can be classified
    /// from any host.
    fn segments(&self, path: &Path) -> Vec<String> {
        let text = path.to_string_lossy();
        let parts: Vec<&str> = if self.platform == Platform::Windows {
            text.split(['/', '\\']).collect()
        } else {
            text.split('/').collect()
        };

        parts
            .into_iter()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn anchor_name(segments: &[String]) -> Option<String> {
    // Only directories count as names, never the file itself
    let dirs = segments.len().checked_sub(1)?;

    let (index, anchor) = ANCHOR_RULES.iter().find_map(|anchor| {
        segments[..dirs]
            .iter()
            .position(|s| s == anchor.marker)
            .map(|i| (i, anchor))
    })?;

    match anchor.rule {
        NameRule::Segment(offset) => segments[..dirs].get(index + offset).cloned(),
        NameRule::SteamApp => segments[..dirs]
            .get(index + 2)
            .map(|app_id| format!("Steam Game {}", app_id)),
    }
}

fn save_folder_parent(segments: &[String]) -> Option<String> {
    let dirs = &segments[..segments.len().saturating_sub(1)];

    (1..dirs.len())
        .rev()
        .find(|&i| is_save_folder(&dirs[i]))
        .map(|i| dirs[i - 1].clone())
}

fn immediate_parent(segments: &[String]) -> Option<&str> {
    let len = segments.len();
    if len < 2 {
        return None;
    }
    Some(segments[len - 2].as_str())
}

fn clean_name(candidate: Option<String>) -> String {
    match candidate.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() && name != "." && name != ".." => name.to_string(),
        _ => UNKNOWN_GAME.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn windows() -> GameGrouper {
        GameGrouper::new(Platform::Windows)
    }

    fn name(grouper: &GameGrouper, path: &str) -> String {
        grouper.infer_name(&PathBuf::from(path))
    }

    #[test]
    fn test_my_games_anchor() {
        assert_eq!(
            name(&windows(), r"C:\Users\al\Documents\My Games\Skyrim\Saves\quick.ess"),
            "Skyrim"
        );
    }

    #[test]
    fn test_saved_games_anchor() {
        assert_eq!(
            name(&windows(), r"C:\Users\al\Saved Games\CD Projekt Red\Cyberpunk 2077\s.sav"),
            "CD Projekt Red"
        );
    }

    #[test]
    fn test_steam_userdata_anchor() {
        assert_eq!(
            name(
                &windows(),
                r"C:\Program Files (x86)\Steam\userdata\1234\570\remote\slot.sav"
            ),
            "Steam Game 570"
        );
    }

    #[test]
    fn test_appdata_anchor_skips_roaming_level() {
        assert_eq!(
            name(&windows(), r"C:\Users\al\AppData\LocalLow\Hollow\Saves\user1.dat"),
            "Hollow"
        );
        assert_eq!(
            name(&windows(), r"C:\Users\al\AppData\Roaming\Stardew\profile.dat"),
            "Stardew"
        );
    }

    #[test]
    fn test_documents_anchor_ignores_loose_files() {
        // A save sitting directly in Documents has no game folder
        assert_eq!(name(&windows(), r"C:\Users\al\Documents\game.sav"), UNKNOWN_GAME);
        assert_eq!(
            name(&windows(), r"C:\Users\al\Documents\Witcher\game.sav"),
            "Witcher"
        );
    }

    #[test]
    fn test_anchor_priority_follows_table_order() {
        // "My Games" outranks the earlier "Documents" segment
        assert_eq!(
            name(&windows(), r"C:\Users\al\Documents\My Games\Fallout4\Saves\a.fos"),
            "Fallout4"
        );
    }

    #[test]
    fn test_save_folder_parent_fallback() {
        assert_eq!(
            name(&windows(), r"D:\Games\Celeste\Saves\0.celeste.sav"),
            "Celeste"
        );
        // Deepest save-like folder wins
        assert_eq!(
            name(&windows(), r"D:\SaveStuff\Hades\SaveData\Profile1.sav"),
            "Hades"
        );
    }

    #[test]
    fn test_immediate_parent_fallback() {
        assert_eq!(name(&windows(), r"D:\Games\Celeste\0.sav"), "Celeste");
    }

    #[test]
    fn test_generic_parent_is_unknown() {
        assert_eq!(name(&windows(), r"ProgramData\x.sav"), UNKNOWN_GAME);
        assert_eq!(name(&windows(), r"Documents\x.sav"), UNKNOWN_GAME);
        assert_eq!(name(&windows(), "x.sav"), UNKNOWN_GAME);
    }

    #[test]
    fn test_anchor_with_forward_slashes() {
        assert_eq!(
            name(&windows(), "/mnt/c/Users/al/Documents/My Games/Skyrim/quick.ess"),
            "Skyrim"
        );
    }

    #[test]
    fn test_non_primary_uses_parent() {
        let linux = GameGrouper::new(Platform::Linux);
        assert_eq!(
            name(&linux, "/home/al/.local/share/Terraria/Players/hero.plr.bak"),
            "Players"
        );
        assert_eq!(name(&linux, "/home/al/Documents/My Games/Skyrim/Saves/a.ess"), "Saves");
        assert_eq!(name(&linux, "/slot.sav"), UNKNOWN_GAME);
    }

    #[test]
    fn test_clean_name() {
        assert_eq!(clean_name(Some("  Celeste ".into())), "Celeste");
        assert_eq!(clean_name(Some("..".into())), UNKNOWN_GAME);
        assert_eq!(clean_name(Some("   ".into())), UNKNOWN_GAME);
        assert_eq!(clean_name(None), UNKNOWN_GAME);
    }
}
