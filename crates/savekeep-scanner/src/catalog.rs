//! Candidate scan roots per platform

use savekeep_config::Platform;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A directory the scanner walks from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRoot {
    pub path: PathBuf,
    /// `false` for platform-known locations, `true` for user-added ones
    pub custom: bool,
}

impl CandidateRoot {
    pub fn default_root(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            custom: false,
        }
    }

    pub fn custom_root(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            custom: true,
        }
    }
}

/// Builds the ordered list of conventional save locations.
///
/// Pure path construction; existence is checked by the scanner.
#[derive(Debug, Clone)]
pub struct PathCatalog {
    platform: Platform,
    home: PathBuf,
}

impl PathCatalog {
    pub fn new(platform: Platform, home: impl Into<PathBuf>) -> Self {
        Self {
            platform,
            home: home.into(),
        }
    }

    /// Catalog rooted at the current user's home directory
    pub fn detect(platform: Platform) -> Option<Self> {
        dirs::home_dir().map(|home| Self::new(platform, home))
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Platform-known locations, in scan order
    pub fn default_roots(&self) -> Vec<PathBuf> {
        let home = self.home.as_path();
        match self.platform {
            Platform::Windows => vec![
                home.join("Documents").join("My Games"),
                home.join("Documents"),
                home.join("AppData").join("Roaming"),
                home.join("AppData").join("Local"),
                // Unity titles
                home.join("AppData").join("LocalLow"),
                home.join("Saved Games"),
                home.join("OneDrive").join("Documents"),
                home.join("OneDrive").join("Documents").join("My Games"),
                PathBuf::from(r"C:\Program Files (x86)\Steam\userdata"),
                PathBuf::from(r"C:\ProgramData"),
            ],
            Platform::MacOs => vec![
                home.join("Library").join("Application Support"),
                home.join("Documents"),
                home.join(".local").join("share"),
            ],
            Platform::Linux => vec![
                home.join(".local").join("share"),
                home.join(".config"),
                home.join("Documents"),
            ],
        }
    }

    /// Default roots followed by the caller's custom paths.
    ///
    /// A custom path equal to an earlier root is dropped.
    pub fn roots_for<P: AsRef<Path>>(&self, custom_paths: &[P]) -> Vec<CandidateRoot> {
        let mut roots: Vec<CandidateRoot> = self
            .default_roots()
            .into_iter()
            .map(CandidateRoot::default_root)
            .collect();

        for custom in custom_paths {
            let custom = custom.as_ref();
            if custom.as_os_str().is_empty() {
                continue;
            }
            if roots.iter().any(|r| r.path.as_path() == custom) {
                tracing::debug!("Skipping duplicate scan path {}", custom.display());
                continue;
            }
            roots.push(CandidateRoot::custom_root(custom));
        }

        roots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linux_roots() {
        let catalog = PathCatalog::new(Platform::Linux, "/home/alice");
        let roots = catalog.roots_for::<PathBuf>(&[]);
        assert_eq!(
            roots,
            vec![
                CandidateRoot::default_root("/home/alice/.local/share"),
                CandidateRoot::default_root("/home/alice/.config"),
                CandidateRoot::default_root("/home/alice/Documents"),
            ]
        );
    }

    #[test]
    fn test_macos_roots() {
        let catalog = PathCatalog::new(Platform::MacOs, "/Users/bob");
        let roots = catalog.default_roots();
        assert_eq!(roots.len(), 3);
        assert_eq!(roots[0], PathBuf::from("/Users/bob/Library/Application Support"));
    }

    #[test]
    fn test_windows_roots_include_launchers() {
        let catalog = PathCatalog::new(Platform::Windows, "/users/carol");
        let roots = catalog.default_roots();
        assert_eq!(roots.len(), 10);
        assert_eq!(roots[0], PathBuf::from("/users/carol/Documents/My Games"));
        assert!(roots.contains(&PathBuf::from(r"C:\Program Files (x86)\Steam\userdata")));
        assert!(roots.contains(&PathBuf::from("/users/carol/AppData/LocalLow")));
    }

    #[test]
    fn test_custom_paths_follow_defaults() {
        let catalog = PathCatalog::new(Platform::Linux, "/home/alice");
        let roots = catalog.roots_for(&["/mnt/games", "", "/home/alice/.config", "/srv/saves"]);

        assert_eq!(roots.len(), 5);
        assert!(roots[..3].iter().all(|r| !r.custom));
        assert_eq!(roots[3], CandidateRoot::custom_root("/mnt/games"));
        assert_eq!(roots[4], CandidateRoot::custom_root("/srv/saves"));
    }
}
