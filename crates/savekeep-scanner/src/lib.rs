//! Game save discovery for SaveKeep
//!
//! Finds save files under well-known per-platform locations plus user paths,
//! infers which game each file belongs to and reports one record per game.
//!
//! # Pipeline
//!
//! - [`PathCatalog`]: candidate roots for the platform
//! - [`FileScanner`]: bounded walk, pattern match, size filter
//! - [`GameGrouper`]: game name inference
//! - [`finalize`]: per-game totals and ordering

mod aggregator;
mod catalog;
mod format;
mod grouper;
mod patterns;
mod scanner;

pub use aggregator::{DetectedGame, decode_id, encode_id, finalize};
pub use catalog::{CandidateRoot, PathCatalog};
pub use format::{format_date, format_size, parse_size};
pub use grouper::{ANCHOR_RULES, AnchorRule, GENERIC_ROOTS, GameGrouper, NameRule, UNKNOWN_GAME};
pub use patterns::{
    IGNORED_DIRS, SAVE_EXTENSIONS, SAVE_FOLDER_NAMES, SAVE_GLOBS, SavePatterns, is_save_folder,
};
pub use scanner::{
    DetectedSaveFile, FileScanner, MAX_SCAN_DEPTH, MIN_FILE_SIZE, ScanOutcome, ScanReport,
};

use savekeep_config::{Platform, ScanConfig};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Path not accessible: {path}: {source}")]
    Inaccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Home directory could not be determined")]
    NoHomeDir,
}

/// Result of a full scan
#[derive(Debug, Default)]
pub struct SaveScanResult {
    pub games: Vec<DetectedGame>,
    pub report: ScanReport,
}

/// Runs the whole pipeline for one platform
#[derive(Debug, Clone)]
pub struct SaveScanner {
    catalog: PathCatalog,
    files: FileScanner,
    grouper: GameGrouper,
}

impl SaveScanner {
    pub fn new(catalog: PathCatalog, files: FileScanner) -> Self {
        let grouper = GameGrouper::new(catalog.platform());
        Self {
            catalog,
            files,
            grouper,
        }
    }

    /// Scanner for the current user, tuned by configuration
    pub fn from_config(config: &ScanConfig) -> Result<Self, ScanError> {
        let catalog = PathCatalog::detect(config.platform()).ok_or(ScanError::NoHomeDir)?;
        Ok(Self::new(catalog, Self::file_scanner(config)))
    }

    /// Scanner with an explicit home directory
    pub fn with_home(config: &ScanConfig, home: impl Into<PathBuf>) -> Self {
        let catalog = PathCatalog::new(config.platform(), home);
        Self::new(catalog, Self::file_scanner(config))
    }

    fn file_scanner(config: &ScanConfig) -> FileScanner {
        FileScanner::new()
            .with_patterns(SavePatterns::with_extras(
                &config.extra_extensions,
                &config.extra_ignore_dirs,
            ))
            .with_max_depth(config.max_depth)
            .with_min_file_size(config.min_file_size)
    }

    pub fn platform(&self) -> Platform {
        self.catalog.platform()
    }

    /// Scan default locations plus `custom_paths`
    pub fn scan<P: AsRef<Path>>(&self, custom_paths: &[P]) -> SaveScanResult {
        let roots = self.catalog.roots_for(custom_paths);
        self.scan_roots(&roots)
    }

    /// Scan an explicit set of roots
    pub fn scan_roots(&self, roots: &[CandidateRoot]) -> SaveScanResult {
        tracing::info!("Starting game save scan");
        tracing::info!(
            platform = %self.platform(),
            depth = self.files.max_depth(),
            min_size = self.files.min_file_size(),
            extensions = self.files.patterns().extension_count(),
            globs = self.files.patterns().glob_count(),
            "Scan configuration"
        );
        tracing::info!("Scanning {} locations:", roots.len());
        for (i, root) in roots.iter().enumerate() {
            tracing::info!(
                "  {}. {}{}",
                i + 1,
                root.path.display(),
                if root.custom { " (custom)" } else { "" }
            );
        }

        let outcome = self.files.scan_all(roots);
        let report = outcome.report;

        tracing::info!(
            scanned = report.roots_scanned,
            accessible = report.roots_accessible,
            files = report.files_found,
            "Scan summary"
        );

        if outcome.files.is_empty() {
            tracing::warn!("No save files detected in any scanned location");
            return SaveScanResult {
                games: Vec::new(),
                report,
            };
        }

        let groups = self.grouper.group(outcome.files);
        let games = finalize(groups);

        tracing::info!("Scan complete, detected {} games", games.len());
        for (i, game) in games.iter().enumerate() {
            tracing::info!(
                "  {}. {} ({} files, {})",
                i + 1,
                game.game_name,
                game.file_count,
                game.total_size
            );
        }

        SaveScanResult { games, report }
    }
}
