//! Cache provider capability
//!
//! Every backend (memory, file, or an external store supplied by the
//! caller) implements [`CacheProvider`]. Values are opaque bytes; typed
//! access goes through [`CacheProviderExt`].

use crate::error::CacheResult;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;

/// Expiring key/value store used for endpoint lists and device properties
#[async_trait]
pub trait CacheProvider: Send + Sync {
    /// Returns `None` on a miss or when the entry has expired.
    async fn get(&self, key: &str) -> CacheResult<Option<Bytes>>;

    async fn set(&self, key: &str, value: Bytes) -> CacheResult<()>;

    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> CacheResult<()>;

    async fn clear(&self) -> CacheResult<()>;

    /// Release provider-wide resources. Must be idempotent.
    async fn shutdown(&self) -> CacheResult<()>;

    /// Keys currently held, in no particular order
    async fn list_keys(&self) -> CacheResult<Vec<String>>;

    /// Providers without expiry ignore this.
    fn set_expiry(&self, expiry: Duration);
}

/// JSON helpers layered over any [`CacheProvider`]
#[async_trait]
pub trait CacheProviderExt: CacheProvider {
    /// Fetch and deserialize an entry.
    async fn get_json<T>(&self, key: &str) -> CacheResult<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        match self.get(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Serialize and store an entry.
    async fn set_json<T>(&self, key: &str, value: &T) -> CacheResult<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        let bytes = serde_json::to_vec(value)?;
        self.set(key, Bytes::from(bytes)).await
    }
}

impl<P: CacheProvider + ?Sized> CacheProviderExt for P {}
