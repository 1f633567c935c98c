//! Host platform identity

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operating system family the scanner targets.
///
/// The scanner only uses this to pick candidate roots and to decide whether
/// the full name-inference cascade applies, so it can be overridden from
/// configuration to scan a mounted drive from another OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    #[serde(alias = "darwin")]
    MacOs,
    Linux,
}

impl Platform {
    /// Platform of the running binary
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }

    /// The primary platform gets the full folder-anchor cascade
    pub fn is_primary(&self) -> bool {
        matches!(self, Platform::Windows)
    }

    /// Short lowercase name, matches the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::MacOs => "macos",
            Platform::Linux => "linux",
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_windows_is_primary() {
        assert!(Platform::Windows.is_primary());
        assert!(!Platform::MacOs.is_primary());
        assert!(!Platform::Linux.is_primary());
    }

    #[test]
    fn test_platform_serde_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            platform: Platform,
        }

        let parsed: Wrapper = toml::from_str(r#"platform = "darwin""#).unwrap();
        assert_eq!(parsed.platform, Platform::MacOs);

        let parsed: Wrapper = toml::from_str(r#"platform = "windows""#).unwrap();
        assert_eq!(parsed.platform, Platform::Windows);
        assert_eq!(Platform::Linux.to_string(), "linux");
    }
}
