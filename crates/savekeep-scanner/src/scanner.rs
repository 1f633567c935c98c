//! Bounded-depth save file walking

use crate::catalog::CandidateRoot;
use crate::format::{format_date, format_size};
use crate::patterns::SavePatterns;
use crate::ScanError;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Default minimum save size in bytes
pub const MIN_FILE_SIZE: u64 = 1024;

/// Default number of directory levels walked below a root
pub const MAX_SCAN_DEPTH: usize = 10;

/// A candidate save file that passed pattern and size filtering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedSaveFile {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Formatted from `size_bytes`, e.g. `"2 KB"`
    pub size: String,
    pub modified: DateTime<Utc>,
    /// Formatted from `modified`, e.g. `"Jan 5, 2024"`
    pub last_modified: String,
    /// Final extension including the dot, empty when there is none
    pub extension: String,
}

impl DetectedSaveFile {
    /// Build from a path and its metadata
    pub fn from_metadata(path: &Path, metadata: &fs::Metadata) -> Self {
        let size_bytes = metadata.len();
        let modified: DateTime<Utc> = metadata
            .modified()
            .map(DateTime::from)
            .unwrap_or_default();

        Self {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            path: path.to_path_buf(),
            size_bytes,
            size: format_size(size_bytes),
            modified,
            last_modified: format_date(modified),
            extension: path
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default(),
        }
    }
}

/// Outcome of scanning one or more roots
#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub roots_scanned: usize,
    pub roots_accessible: usize,
    pub inaccessible: Vec<PathBuf>,
    /// Pattern matches before size filtering
    pub files_matched: usize,
    /// Matches dropped for being too small or failing to stat
    pub files_skipped: usize,
    pub files_found: usize,
}

/// Flattened files from all roots plus the accounting
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub files: Vec<DetectedSaveFile>,
    pub report: ScanReport,
}

/// Walks roots and collects candidate save files
#[derive(Debug, Clone)]
pub struct FileScanner {
    patterns: SavePatterns,
    max_depth: usize,
    min_file_size: u64,
}

impl Default for FileScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl FileScanner {
    /// Scanner with the built-in patterns and limits
    pub fn new() -> Self {
        Self {
            patterns: SavePatterns::new(),
            max_depth: MAX_SCAN_DEPTH,
            min_file_size: MIN_FILE_SIZE,
        }
    }

    pub fn with_patterns(mut self, patterns: SavePatterns) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_min_file_size(mut self, min_file_size: u64) -> Self {
        self.min_file_size = min_file_size;
        self
    }

    pub fn patterns(&self) -> &SavePatterns {
        &self.patterns
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn min_file_size(&self) -> u64 {
        self.min_file_size
    }

    /// Scan one root.
    ///
    /// Fails only when the root itself cannot be opened; unreadable entries
    /// and files that cannot be stat'ed below it are skipped.
    pub fn scan(&self, root: &CandidateRoot) -> Result<Vec<DetectedSaveFile>, ScanError> {
        let (files, _, _) = self.scan_counted(&root.path)?;
        Ok(files)
    }

    /// Scan every root, absorbing per-root failures into the report
    pub fn scan_all(&self, roots: &[CandidateRoot]) -> ScanOutcome {
        let mut outcome = ScanOutcome::default();

        for root in roots {
            outcome.report.roots_scanned += 1;

            match self.scan_counted(&root.path) {
                Ok((files, matched, skipped)) => {
                    outcome.report.roots_accessible += 1;
                    outcome.report.files_matched += matched;
                    outcome.report.files_skipped += skipped;
                    outcome.files.extend(files);
                }
                Err(e) => {
                    tracing::warn!(root = %root.path.display(), "Path not accessible: {}", e);
                    outcome.report.inaccessible.push(root.path.clone());
                }
            }
        }

        outcome.report.files_found = outcome.files.len();
        outcome
    }

    /// Returns kept files, pattern match count and skipped count
    fn scan_counted(&self, root: &Path) -> Result<(Vec<DetectedSaveFile>, usize, usize), ScanError> {
        fs::read_dir(root).map_err(|source| ScanError::Inaccessible {
            path: root.to_path_buf(),
            source,
        })?;

        tracing::info!(root = %root.display(), "Scanning directory");

        let candidates = self.collect_candidates(root);
        let matched = candidates.len();
        tracing::info!(root = %root.display(), "Found {} potential save files", matched);

        let files: Vec<DetectedSaveFile> = candidates
            .par_iter()
            .filter_map(|path| self.stat_candidate(path))
            .collect();

        tracing::info!(
            root = %root.display(),
            "{} files passed filtering (>= {} bytes)",
            files.len(),
            self.min_file_size
        );

        let skipped = matched - files.len();
        Ok((files, matched, skipped))
    }

    /// Walk the tree and return paths whose names match a save pattern
    fn collect_candidates(&self, root: &Path) -> Vec<PathBuf> {
        let walker = WalkDir::new(root)
            .max_depth(self.max_depth)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !entry.file_type().is_dir()
                    || !self
                        .patterns
                        .is_ignored_dir(&entry.file_name().to_string_lossy())
            });

        let mut candidates = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if entry.file_type().is_file()
                && self.patterns.matches(&entry.file_name().to_string_lossy())
            {
                candidates.push(entry.into_path());
            }
        }

        candidates
    }

    fn stat_candidate(&self, path: &Path) -> Option<DetectedSaveFile> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!("Failed to get stats for file {}: {}", path.display(), e);
                return None;
            }
        };

        if metadata.len() < self.min_file_size {
            tracing::debug!(
                "Skipping small file ({} bytes): {}",
                metadata.len(),
                path.display()
            );
            return None;
        }

        Some(DetectedSaveFile::from_metadata(path, &metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_file(root: &Path, rel: &str, size: usize) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, vec![0u8; size]).unwrap();
        path
    }

    #[test]
    fn test_scan_filters_small_files() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "Game/slot1.sav", 2048);
        write_file(dir.path(), "Game/slot2.sav", 500);
        write_file(dir.path(), "Game/exact.sav", 1024);

        let scanner = FileScanner::new();
        let files = scanner
            .scan(&CandidateRoot::default_root(dir.path()))
            .unwrap();

        let mut names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["exact.sav", "slot1.sav"]);
        assert!(files.iter().all(|f| f.size_bytes >= MIN_FILE_SIZE));
    }

    #[test]
    fn test_scan_skips_ignored_directories() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "Game/Cache/junk.sav", 4096);
        write_file(dir.path(), "Game/.git/objects.dat", 4096);
        write_file(dir.path(), "Game/Saves/real.sav", 4096);

        let files = FileScanner::new()
            .scan(&CandidateRoot::default_root(dir.path()))
            .unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "real.sav");
    }

    #[test]
    fn test_scan_respects_depth() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a/top.sav", 2048);
        write_file(dir.path(), "a/b/c/deep.sav", 2048);

        let files = FileScanner::new()
            .with_max_depth(2)
            .scan(&CandidateRoot::default_root(dir.path()))
            .unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "top.sav");
    }

    #[test]
    fn test_scan_missing_root_is_error() {
        let dir = TempDir::new().unwrap();
        let missing = CandidateRoot::custom_root(dir.path().join("nope"));
        let err = FileScanner::new().scan(&missing).unwrap_err();
        assert!(matches!(err, ScanError::Inaccessible { .. }));
    }

    #[test]
    fn test_scan_all_records_inaccessible_roots() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "Game/slot1.sav", 2048);
        write_file(dir.path(), "Game/tiny.sav", 10);

        let roots = vec![
            CandidateRoot::default_root(dir.path().join("missing")),
            CandidateRoot::default_root(dir.path()),
        ];
        let outcome = FileScanner::new().scan_all(&roots);

        assert_eq!(outcome.files.len(), 1);
        assert_eq!(outcome.report.roots_scanned, 2);
        assert_eq!(outcome.report.roots_accessible, 1);
        assert_eq!(outcome.report.inaccessible, vec![dir.path().join("missing")]);
        assert_eq!(outcome.report.files_matched, 2);
        assert_eq!(outcome.report.files_skipped, 1);
        assert_eq!(outcome.report.files_found, 1);
    }

    #[test]
    fn test_detected_file_fields() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "Game/Profile.SAV", 3072);

        let files = FileScanner::new()
            .scan(&CandidateRoot::default_root(dir.path()))
            .unwrap();

        assert_eq!(files.len(), 1);
        let file = &files[0];
        assert_eq!(file.name, "Profile.SAV");
        assert_eq!(file.path, path);
        assert_eq!(file.size, "3 KB");
        assert_eq!(file.extension, ".SAV");
        assert!(!file.last_modified.is_empty());
    }
}
