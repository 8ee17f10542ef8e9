//! Bounded in-memory cache provider
//!
//! Entries never expire. When the entry count reaches the configured
//! capacity the next `set` drops every entry before inserting, so the
//! provider stays bounded without tracking recency.

use crate::{
    config::MemoryCacheConfig,
    error::CacheResult,
    traits::CacheProvider,
};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::time::Duration;

const CAPACITY_SLACK: usize = 5;

/// In-memory cache provider backed by a concurrent map
pub struct MemoryCacheProvider {
    entries: DashMap<String, Bytes>,
    max_entries: usize,
    /// Serializes the capacity check with the insert
    write_lock: Mutex<()>,
}

impl MemoryCacheProvider {
    /// Create a provider with the default capacity
    pub fn new() -> Self {
        Self::with_config(&MemoryCacheConfig::default())
    }

    pub fn with_config(config: &MemoryCacheConfig) -> Self {
        let max_entries = config.max_entries.max(1);
        Self {
            entries: DashMap::with_capacity(max_entries + CAPACITY_SLACK),
            max_entries,
            write_lock: Mutex::new(()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub const fn max_entries(&self) -> usize {
        self.max_entries
    }
}

impl Default for MemoryCacheProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    async fn get(&self, key: &str) -> CacheResult<Option<Bytes>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &str, value: Bytes) -> CacheResult<()> {
        let _guard = self.write_lock.lock();
        if self.entries.len() >= self.max_entries {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                entries = self.entries.len(),
                "Memory cache at capacity, clearing"
            );
            self.entries.clear();
        }
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> CacheResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn clear(&self) -> CacheResult<()> {
        let _guard = self.write_lock.lock();
        self.entries.clear();
        Ok(())
    }

    async fn shutdown(&self) -> CacheResult<()> {
        Ok(())
    }

    async fn list_keys(&self) -> CacheResult<Vec<String>> {
        Ok(self.entries.iter().map(|e| e.key().clone()).collect())
    }

    fn set_expiry(&self, _expiry: Duration) {}
}
