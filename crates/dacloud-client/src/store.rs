//! Persistence of endpoint lists

use crate::endpoint::{Endpoint, EndpointListKind};
use crate::error::Result;
use dacloud_cache::{CacheProvider, CacheProviderExt};
use std::sync::Arc;
use std::time::Duration;

/// Reads and writes the auto and manual endpoint lists through a cache
/// provider whose expiry is the ranking lifetime
#[derive(Clone)]
pub struct EndpointStore {
    provider: Arc<dyn CacheProvider>,
    lifetime_minutes: u64,
}

impl EndpointStore {
    pub fn new(provider: Arc<dyn CacheProvider>, lifetime_minutes: u64) -> Self {
        provider.set_expiry(Duration::from_secs(lifetime_minutes.saturating_mul(60)));
        Self {
            provider,
            lifetime_minutes,
        }
    }

    pub fn provider(&self) -> &Arc<dyn CacheProvider> {
        &self.provider
    }

    /// Whether lists are persisted at all
    pub const fn is_enabled(&self) -> bool {
        self.lifetime_minutes > 0
    }

    /// The list stored under `kind`, if present, fresh and non-empty.
    ///
    /// Read failures are logged and treated as a miss.
    pub async fn cached_list(&self, kind: EndpointListKind) -> Option<Vec<Endpoint>> {
        match self.provider.get_json::<Vec<Endpoint>>(kind.cache_key()).await {
            Ok(list) => list.filter(|l| !l.is_empty()),
            Err(e) => {
                tracing::warn!(key = kind.cache_key(), error = %e, "Failed to read cached endpoint list");
                None
            }
        }
    }

    /// Store `list` under `kind`. Does nothing when the lifetime is zero.
    pub async fn persist(&self, kind: EndpointListKind, list: &[Endpoint]) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        self.provider.set_json(kind.cache_key(), list).await?;
        tracing::debug!(key = kind.cache_key(), endpoints = list.len(), "Endpoint list persisted");
        Ok(())
    }

    /// Drop both persisted lists
    pub async fn clear(&self) -> Result<()> {
        self.provider.remove(EndpointListKind::Auto.cache_key()).await?;
        self.provider.remove(EndpointListKind::Manual.cache_key()).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use dacloud_cache::MemoryCacheProvider;

    fn list() -> Vec<Endpoint> {
        vec![
            Endpoint::new("http://a.example.com", 80),
            Endpoint::new("http://b.example.com", 80),
        ]
    }

    #[tokio::test]
    async fn test_persist_and_read() {
        let store = EndpointStore::new(Arc::new(MemoryCacheProvider::new()), 60);
        assert!(store.cached_list(EndpointListKind::Auto).await.is_none());

        store
            .persist(EndpointListKind::Auto, &list())
            .await
            .expect("Test operation should succeed");
        assert_eq!(store.cached_list(EndpointListKind::Auto).await, Some(list()));
        assert!(store.cached_list(EndpointListKind::Manual).await.is_none());

        store.clear().await.expect("Test operation should succeed");
        assert!(store.cached_list(EndpointListKind::Auto).await.is_none());
    }

    #[tokio::test]
    async fn test_zero_lifetime_disables_persistence() {
        let store = EndpointStore::new(Arc::new(MemoryCacheProvider::new()), 0);
        store
            .persist(EndpointListKind::Manual, &list())
            .await
            .expect("Test operation should succeed");
        assert!(store.cached_list(EndpointListKind::Manual).await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_a_miss() {
        let store = EndpointStore::new(Arc::new(MemoryCacheProvider::new()), 60);
        store
            .provider()
            .set(EndpointListKind::Auto.cache_key(), b"not json".to_vec().into())
            .await
            .expect("Test operation should succeed");
        assert!(store.cached_list(EndpointListKind::Auto).await.is_none());
    }
}
