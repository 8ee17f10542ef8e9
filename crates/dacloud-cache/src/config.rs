//! Cache configuration structures

use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

/// Environment variable that overrides the file cache base directory
pub const FILE_CACHE_DIR_ENV: &str = "DACLOUD_FILE_CACHE_DIR";

/// Environment variable pointing at the file cache settings file
pub const FILE_CACHE_SETTINGS_ENV: &str = "DACLOUD_FILE_CACHE_SETTINGS";

/// Settings file looked up in the working directory
pub const FILE_CACHE_SETTINGS_FILE: &str = "dacloud-filecache.ini";

/// Directory created under the base directory to hold entries
pub const FILE_CACHE_ROOT_NAME: &str = "DaCloud_FileCacheProvider";

/// Default capacity of the memory provider
pub const DEFAULT_MAX_ENTRIES: usize = 4096;

/// Default entry lifetime of the file provider
pub const DEFAULT_EXPIRY: Duration = Duration::from_secs(3600);

/// Memory cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryCacheConfig {
    /// Number of entries that triggers a full clear on the next insert
    pub max_entries: usize,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl MemoryCacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_entries == 0 {
            return Err("max_entries must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// File cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCacheConfig {
    /// Directory under which [`FILE_CACHE_ROOT_NAME`] is created
    pub base_dir: PathBuf,
    /// Entries whose file is at least this old are evicted on read
    pub expiry: Duration,
}

impl Default for FileCacheConfig {
    fn default() -> Self {
        Self {
            base_dir: std::env::temp_dir(),
            expiry: DEFAULT_EXPIRY,
        }
    }
}

impl FileCacheConfig {
    /// Configuration rooted at `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    /// Resolve the base directory from the environment.
    ///
    /// Lookup order: `DACLOUD_FILE_CACHE_DIR`, then the `directory=` line of
    /// the settings file (`DACLOUD_FILE_CACHE_SETTINGS` or
    /// `./dacloud-filecache.ini`), then the platform temp directory.
    pub fn from_env() -> Self {
        let settings = std::env::var_os(FILE_CACHE_SETTINGS_ENV)
            .map_or_else(|| PathBuf::from(FILE_CACHE_SETTINGS_FILE), PathBuf::from);

        let base_dir = std::env::var_os(FILE_CACHE_DIR_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| read_settings_directory(&settings))
            .unwrap_or_else(std::env::temp_dir);

        Self {
            base_dir,
            ..Self::default()
        }
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry = expiry;
        self
    }

    /// Directory that holds the entry files
    pub fn root(&self) -> PathBuf {
        self.base_dir.join(FILE_CACHE_ROOT_NAME)
    }
}

/// Read the `directory=<path>` line of a settings file.
///
/// Returns `None` when the file is missing, unreadable, or has no
/// non-empty `directory` entry.
pub fn read_settings_directory(path: &Path) -> Option<PathBuf> {
    let content = std::fs::read_to_string(path).ok()?;
    content.lines().find_map(|line| {
        let (name, value) = line.split_once('=')?;
        let value = value.trim();
        (name.trim() == "directory" && !value.is_empty()).then(|| PathBuf::from(value))
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_config_defaults() {
        let config = MemoryCacheConfig::default();
        assert_eq!(config.max_entries, 4096);
        assert!(config.validate().is_ok());
        assert!(MemoryCacheConfig::new().with_max_entries(0).validate().is_err());
    }

    #[test]
    fn test_file_config_root() {
        let config = FileCacheConfig::new("/var/cache").with_expiry(Duration::from_secs(5));
        assert_eq!(
            config.root(),
            PathBuf::from("/var/cache").join("DaCloud_FileCacheProvider")
        );
        assert_eq!(config.expiry, Duration::from_secs(5));
        assert_eq!(FileCacheConfig::default().expiry, Duration::from_secs(3600));
    }

    #[test]
    fn test_settings_directory() {
        let dir = tempfile::tempdir().expect("Test operation should succeed");
        let settings = dir.path().join(FILE_CACHE_SETTINGS_FILE);

        assert_eq!(read_settings_directory(&settings), None);

        std::fs::write(&settings, "# file cache\ndirectory = /srv/dacloud\n")
            .expect("Test operation should succeed");
        assert_eq!(
            read_settings_directory(&settings),
            Some(PathBuf::from("/srv/dacloud"))
        );

        std::fs::write(&settings, "directory=\n").expect("Test operation should succeed");
        assert_eq!(read_settings_directory(&settings), None);
    }
}
