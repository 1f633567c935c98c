//! Save file patterns and directory filters

use glob::{MatchOptions, Pattern};
use std::collections::HashSet;

/// Literal save extensions, matched case-insensitively against the file name suffix
pub const SAVE_EXTENSIONS: &[&str] = &[
    ".sav",
    ".save",
    ".savegame",
    ".dat",
    ".profile",
    ".slot",
    ".ess",
    ".fos",
    ".gamesave",
    ".sg",
    ".bak",
    ".backup",
    ".tmp",
    ".autosave",
    ".svd",
    ".savdata",
    ".usr",
];

/// Wildcards for numbered slots and `save*` naming the extension list misses
pub const SAVE_GLOBS: &[&str] = &[
    "*.sav[0-9]",
    "*.sav[0-9][0-9]",
    "*.save[0-9]",
    "*.save[0-9][0-9]",
    "*.slot[0-9]",
    "*.slot[0-9][0-9]",
    "save*.dat",
    "save*.sav",
    "save_*.sav",
    "save[0-9]*.dat",
    "save[0-9]*.sav",
];

/// Directory names never descended into
pub const IGNORED_DIRS: &[&str] = &[
    "node_modules",
    "cache",
    "temp",
    "tmp",
    ".git",
    "backup",
    "recycler",
    "$recycle.bin",
    "system volume information",
    "windows",
    "microsoft",
    "adobe",
];

/// Conventional names of folders that hold saves
pub const SAVE_FOLDER_NAMES: &[&str] = &["save", "saves", "savedata", "savegames", "saved", "savedgames"];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Fuzzy check for a save-holding directory name.
///
/// True for any of [`SAVE_FOLDER_NAMES`] or any name containing `save`,
/// ignoring case. This is the loosest rule in name inference.
pub fn is_save_folder(name: &str) -> bool {
    let lower = name.to_lowercase();
    SAVE_FOLDER_NAMES.iter().any(|n| *n == lower) || lower.contains("save")
}

/// Combined extension and wildcard matcher
#[derive(Debug, Clone)]
pub struct SavePatterns {
    extensions: Vec<String>,
    globs: Vec<Pattern>,
    ignored_dirs: HashSet<String>,
}

impl Default for SavePatterns {
    fn default() -> Self {
        Self::new()
    }
}

impl SavePatterns {
    /// Built-in pattern set
    pub fn new() -> Self {
        Self::with_extras(&[], &[])
    }

    /// Built-in set plus caller extensions and ignored directory names
    pub fn with_extras(extra_extensions: &[String], extra_ignore_dirs: &[String]) -> Self {
        let mut extensions: Vec<String> = SAVE_EXTENSIONS.iter().map(|e| e.to_string()).collect();
        for ext in extra_extensions {
            let ext = ext.trim().to_lowercase();
            if ext.is_empty() || ext == "." {
                continue;
            }
            let ext = if ext.starts_with('.') { ext } else { format!(".{}", ext) };
            if !extensions.contains(&ext) {
                extensions.push(ext);
            }
        }

        let globs = SAVE_GLOBS
            .iter()
            .filter_map(|glob| match Pattern::new(glob) {
                Ok(p) => Some(p),
                Err(e) => {
                    tracing::error!("Invalid save pattern '{}': {}", glob, e);
                    None
                }
            })
            .collect();

        let ignored_dirs = IGNORED_DIRS
            .iter()
            .map(|d| d.to_string())
            .chain(extra_ignore_dirs.iter().map(|d| d.trim().to_lowercase()))
            .filter(|d| !d.is_empty())
            .collect();

        Self {
            extensions,
            globs,
            ignored_dirs,
        }
    }

    /// Does this file name look like a save?
    pub fn matches(&self, file_name: &str) -> bool {
        let lower = file_name.to_lowercase();
        self.extensions.iter().any(|ext| lower.ends_with(ext.as_str()))
            || self
                .globs
                .iter()
                .any(|p| p.matches_with(file_name, MATCH_OPTIONS))
    }

    /// Should the walk skip this directory?
    pub fn is_ignored_dir(&self, dir_name: &str) -> bool {
        self.ignored_dirs.contains(&dir_name.to_lowercase())
    }

    pub fn extension_count(&self) -> usize {
        self.extensions.len()
    }

    pub fn glob_count(&self) -> usize {
        self.globs.len()
    }
}
