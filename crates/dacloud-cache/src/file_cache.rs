//! Expiring file-backed cache provider
//!
//! Each key is stored in its own `.dat` file below the provider root (see
//! [`crate::key`] for the layout). All entries are loaded into an in-memory
//! index at construction time; the file modification time stays the source
//! of truth for expiry.
//!
//! Writes hold an exclusive advisory lock on the target file for their whole
//! duration. A writer that finds the file already locked fails with
//! [`CacheError::WriteFailed`] instead of waiting.
#![allow(clippy::significant_drop_tightening)] // lock must cover the whole write

use crate::{
    config::FileCacheConfig,
    error::{CacheError, CacheResult},
    key::{self, ENTRY_EXTENSION},
    traits::CacheProvider,
};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::{
    fs::{self, File, OpenOptions, TryLockError},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, SystemTime},
};
use walkdir::WalkDir;

/// File-backed cache provider with per-entry expiry
pub struct FileCacheProvider {
    root: PathBuf,
    index: DashMap<String, Bytes>,
    /// Entry lifetime in milliseconds
    expiry_ms: AtomicU64,
    initialized: bool,
}

impl FileCacheProvider {
    /// Create the provider and load every entry found under its root.
    ///
    /// Never fails: when the root directory cannot be created the provider
    /// is left uninitialized and every operation reports
    /// [`CacheError::Unavailable`].
    pub fn new(config: FileCacheConfig) -> Self {
        let root = config.root();
        let provider = Self {
            index: DashMap::new(),
            expiry_ms: AtomicU64::new(duration_to_ms(config.expiry)),
            initialized: fs::create_dir_all(&root).is_ok(),
            root,
        };

        if provider.initialized {
            provider.load_entries();
        } else {
            #[cfg(feature = "tracing")]
            tracing::warn!(root = %provider.root.display(), "File cache root could not be created");
        }

        provider
    }

    /// Provider rooted at the location resolved by [`FileCacheConfig::from_env`]
    pub fn from_env() -> Self {
        Self::new(FileCacheConfig::from_env())
    }

    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Directory holding the entry files
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn expiry(&self) -> Duration {
        Duration::from_millis(self.expiry_ms.load(Ordering::Relaxed))
    }

    /// Number of entries in the in-memory index
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn ensure_initialized(&self) -> CacheResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(CacheError::Unavailable(format!(
                "file cache root {} could not be created",
                self.root.display()
            )))
        }
    }

    fn load_entries(&self) {
        for (path, key) in entry_files(&self.root) {
            match fs::read(&path) {
                Ok(data) => {
                    self.index.insert(key, Bytes::from(data));
                }
                Err(_e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(path = %path.display(), error = %_e, "Skipping unreadable cache file");
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(root = %self.root.display(), entries = self.index.len(), "File cache loaded");
    }

    fn is_expired(&self, modified: SystemTime) -> bool {
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        age >= self.expiry()
    }

    fn evict(&self, key: &str, path: &Path) -> CacheResult<()> {
        self.index.remove(key);
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_entry(key: &str, path: &Path, value: &[u8]) -> CacheResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| CacheError::write_failed(key, e))?;
        }

        // Truncation waits until the lock is held
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(|e| CacheError::write_failed(key, e))?;

        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => {
                return Err(CacheError::write_failed(
                    key,
                    format!("{} is locked by another writer", path.display()),
                ));
            }
            Err(TryLockError::Error(e)) => return Err(CacheError::write_failed(key, e)),
        }

        let written = write_locked(&mut file, value);
        let unlocked = file.unlock();
        written.map_err(|e| CacheError::write_failed(key, e))?;
        unlocked.map_err(|e| CacheError::write_failed(key, e))
    }
}

fn write_locked(file: &mut File, value: &[u8]) -> io::Result<()> {
    file.set_len(0)?;
    file.write_all(value)?;
    file.flush()
}

fn duration_to_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Entry files under `root` paired with the key they store
fn entry_files(root: &Path) -> impl Iterator<Item = (PathBuf, String)> + '_ {
    WalkDir::new(root)
        .max_depth(3)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| {
            entry.file_type().is_file()
                && entry.path().extension().and_then(|e| e.to_str()) == Some(ENTRY_EXTENSION)
        })
        .filter_map(|entry| {
            let path = entry.into_path();
            key::path_to_key(root, &path).map(|key| (path, key))
        })
}

#[async_trait]
impl CacheProvider for FileCacheProvider {
    async fn get(&self, key: &str) -> CacheResult<Option<Bytes>> {
        self.ensure_initialized()?;
        let path = key::key_to_path(&self.root, key)?;

        let modified = match fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.index.remove(key);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        if self.is_expired(modified) {
            #[cfg(feature = "tracing")]
            tracing::debug!(key, "Evicting expired cache entry");
            self.evict(key, &path)?;
            return Ok(None);
        }

        if let Some(value) = self.index.get(key) {
            return Ok(Some(value.clone()));
        }

        // Written by another process since the index was loaded
        match fs::read(&path) {
            Ok(data) => {
                let value = Bytes::from(data);
                self.index.insert(key.to_string(), value.clone());
                Ok(Some(value))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: Bytes) -> CacheResult<()> {
        self.ensure_initialized()?;
        let path = key::key_to_path(&self.root, key)?;

        let previous = self.index.insert(key.to_string(), value.clone());
        let result = Self::write_entry(key, &path, &value);

        if let Err(_e) = &result {
            #[cfg(feature = "tracing")]
            tracing::warn!(key, error = %_e, "Failed to persist cache entry");

            // Roll back unless another writer replaced the entry meanwhile
            match previous {
                Some(old) => {
                    if let Some(mut current) = self.index.get_mut(key) {
                        if *current == value {
                            *current = old;
                        }
                    }
                }
                None => {
                    self.index.remove_if(key, |_, current| *current == value);
                }
            }
        }

        result
    }

    async fn remove(&self, key: &str) -> CacheResult<()> {
        self.ensure_initialized()?;
        let path = key::key_to_path(&self.root, key)?;
        self.evict(key, &path)
    }

    async fn clear(&self) -> CacheResult<()> {
        self.ensure_initialized()?;

        let mut keys: Vec<String> = self.index.iter().map(|e| e.key().clone()).collect();
        keys.extend(entry_files(&self.root).map(|(_, key)| key));
        keys.sort_unstable();
        keys.dedup();

        for key in &keys {
            let path = key::key_to_path(&self.root, key)?;
            self.evict(key, &path)?;
        }

        #[cfg(feature = "tracing")]
        tracing::info!(removed = keys.len(), "File cache cleared");
        Ok(())
    }

    async fn shutdown(&self) -> CacheResult<()> {
        self.ensure_initialized()
    }

    async fn list_keys(&self) -> CacheResult<Vec<String>> {
        self.ensure_initialized()?;
        Ok(self.index.iter().map(|e| e.key().clone()).collect())
    }

    fn set_expiry(&self, expiry: Duration) {
        self.expiry_ms
            .store(duration_to_ms(expiry), Ordering::Relaxed);
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::key::{AUTO_RANKED_KEY, MANUAL_RANKED_KEY};
    use tempfile::TempDir;

    const HASH: &str = "d41d8cd98f00b204e9800998ecf8427e";

    fn provider(dir: &TempDir) -> FileCacheProvider {
        FileCacheProvider::new(FileCacheConfig::new(dir.path()))
    }

    #[tokio::test]
    async fn test_set_writes_sharded_file() {
        let dir = TempDir::new().expect("Test operation should succeed");
        let cache = provider(&dir);
        assert!(cache.is_initialized());

        cache
            .set(HASH, Bytes::from_static(b"{\"a\":1}"))
            .await
            .expect("Test operation should succeed");

        let path = cache.root().join("d4").join("1d").join("8cd98f00b204e9800998ecf8427e.dat");
        assert_eq!(
            fs::read(&path).expect("Test operation should succeed"),
            b"{\"a\":1}"
        );
    }

    #[tokio::test]
    async fn test_shorter_rewrite_truncates() {
        let dir = TempDir::new().expect("Test operation should succeed");
        let cache = provider(&dir);

        cache.set(AUTO_RANKED_KEY, Bytes::from_static(b"a long first value")).await.expect("Test operation should succeed");
        cache.set(AUTO_RANKED_KEY, Bytes::from_static(b"short")).await.expect("Test operation should succeed");

        let path = cache.root().join("deviceatlas_servers_cache_auto.dat");
        assert_eq!(fs::read(path).expect("Test operation should succeed"), b"short");
    }

    #[tokio::test]
    async fn test_entries_are_loaded_on_construction() {
        let dir = TempDir::new().expect("Test operation should succeed");
        {
            let cache = provider(&dir);
            cache.set(HASH, Bytes::from_static(b"props")).await.expect("Test operation should succeed");
            cache.set(MANUAL_RANKED_KEY, Bytes::from_static(b"[]")).await.expect("Test operation should succeed");
        }

        // Foreign files are ignored
        fs::write(dir.path().join("DaCloud_FileCacheProvider").join("README.txt"), "x")
            .expect("Test operation should succeed");

        let cache = provider(&dir);
        assert_eq!(cache.len(), 2);
        let mut keys = cache.list_keys().await.expect("Test operation should succeed");
        keys.sort();
        assert_eq!(keys, vec![HASH.to_string(), MANUAL_RANKED_KEY.to_string()]);
    }

    #[tokio::test]
    async fn test_get_reads_file_written_elsewhere() {
        let dir = TempDir::new().expect("Test operation should succeed");
        let reader = provider(&dir);
        let writer = provider(&dir);

        writer.set(HASH, Bytes::from_static(b"fresh")).await.expect("Test operation should succeed");

        assert!(reader.is_empty());
        assert_eq!(
            reader.get(HASH).await.expect("Test operation should succeed"),
            Some(Bytes::from_static(b"fresh"))
        );
    }

    #[tokio::test]
    async fn test_deleted_file_is_a_miss() {
        let dir = TempDir::new().expect("Test operation should succeed");
        let cache = provider(&dir);
        cache.set(HASH, Bytes::from_static(b"v")).await.expect("Test operation should succeed");

        fs::remove_file(key::key_to_path(cache.root(), HASH).expect("Test operation should succeed"))
            .expect("Test operation should succeed");

        assert_eq!(cache.get(HASH).await.expect("Test operation should succeed"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_expired_entry_is_evicted() {
        let dir = TempDir::new().expect("Test operation should succeed");
        let cache = provider(&dir);
        cache.set(HASH, Bytes::from_static(b"v")).await.expect("Test operation should succeed");
        let path = key::key_to_path(cache.root(), HASH).expect("Test operation should succeed");
        assert!(path.exists());

        cache.set_expiry(Duration::ZERO);
        assert_eq!(cache.expiry(), Duration::ZERO);

        assert_eq!(cache.get(HASH).await.expect("Test operation should succeed"), None);
        assert!(!path.exists());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_locked_file_fails_write() {
        let dir = TempDir::new().expect("Test operation should succeed");
        let cache = provider(&dir);
        cache.set(HASH, Bytes::from_static(b"first")).await.expect("Test operation should succeed");

        let path = key::key_to_path(cache.root(), HASH).expect("Test operation should succeed");
        let holder = OpenOptions::new()
            .write(true)
            .open(&path)
            .expect("Test operation should succeed");
        holder.lock().expect("Test operation should succeed");

        let err = cache
            .set(HASH, Bytes::from_static(b"second"))
            .await
            .expect_err("Write to a locked file should fail");
        assert!(matches!(err, CacheError::WriteFailed { .. }));

        // The on-disk content and the index are untouched
        assert_eq!(fs::read(&path).expect("Test operation should succeed"), b"first");
        assert_eq!(
            cache.get(HASH).await.expect("Test operation should succeed"),
            Some(Bytes::from_static(b"first"))
        );
        assert_eq!(cache.len(), 1);

        holder.unlock().expect("Test operation should succeed");
        cache.set(HASH, Bytes::from_static(b"third")).await.expect("Test operation should succeed");
        assert_eq!(fs::read(&path).expect("Test operation should succeed"), b"third");
    }

    #[tokio::test]
    async fn test_failed_write_of_new_key_leaves_no_entry() {
        let dir = TempDir::new().expect("Test operation should succeed");
        let cache = provider(&dir);

        // A directory where the entry file belongs cannot be opened for writing
        let path = key::key_to_path(cache.root(), HASH).expect("Test operation should succeed");
        fs::create_dir_all(&path).expect("Test operation should succeed");

        let err = cache
            .set(HASH, Bytes::from_static(b"value"))
            .await
            .expect_err("Write over a directory should fail");
        assert!(matches!(err, CacheError::WriteFailed { .. }));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_key_is_rejected() {
        let dir = TempDir::new().expect("Test operation should succeed");
        let cache = provider(&dir);
        let err = cache
            .set("../x", Bytes::from_static(b"v"))
            .await
            .expect_err("Invalid keys are rejected");
        assert!(matches!(err, CacheError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn test_uninitialized_provider_is_unavailable() {
        let file = tempfile::NamedTempFile::new().expect("Test operation should succeed");
        // A regular file cannot hold the cache root
        let cache = FileCacheProvider::new(FileCacheConfig::new(file.path()));
        assert!(!cache.is_initialized());

        assert!(cache.get(HASH).await.expect_err("should fail").is_unavailable());
        assert!(cache.set(HASH, Bytes::new()).await.expect_err("should fail").is_unavailable());
        assert!(cache.remove(HASH).await.expect_err("should fail").is_unavailable());
        assert!(cache.clear().await.expect_err("should fail").is_unavailable());
        assert!(cache.list_keys().await.expect_err("should fail").is_unavailable());
        assert!(cache.shutdown().await.expect_err("should fail").is_unavailable());
    }
}
