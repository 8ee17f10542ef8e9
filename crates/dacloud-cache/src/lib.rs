//! Expiring cache providers for the DeviceAtlas Cloud client
//!
//! The client keeps two kinds of data between calls: the ranked endpoint
//! lists and the device properties resolved for a request fingerprint. Both
//! go through the [`CacheProvider`] trait so the storage tier can be chosen
//! when the client is built:
//!
//! - [`MemoryCacheProvider`]: concurrent map, bounded by clearing everything
//!   once capacity is reached, no expiry
//! - [`FileCacheProvider`]: one file per key under a root directory, entry
//!   age taken from the file modification time, writes under an exclusive
//!   advisory lock
//! - any external store implementing [`CacheProvider`]
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use dacloud_cache::{CacheProvider, CacheProviderExt, MemoryCacheProvider};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let cache = MemoryCacheProvider::new();
//! cache.set_json("3fa29c0d", &vec![1, 2, 3]).await.expect("set");
//! let back: Option<Vec<u32>> = cache.get_json("3fa29c0d").await.expect("get");
//! assert_eq!(back, Some(vec![1, 2, 3]));
//!
//! cache.set("k0001", Bytes::from_static(b"raw")).await.expect("set");
//! assert_eq!(cache.list_keys().await.expect("keys").len(), 2);
//! # }
//! ```

pub mod config;
pub mod error;
pub mod file_cache;
pub mod key;
pub mod memory_cache;
pub mod traits;

pub use config::{FileCacheConfig, MemoryCacheConfig};
pub use error::{CacheError, CacheResult};
pub use file_cache::FileCacheProvider;
pub use key::{AUTO_RANKED_KEY, MANUAL_RANKED_KEY};
pub use memory_cache::MemoryCacheProvider;
pub use traits::{CacheProvider, CacheProviderExt};
