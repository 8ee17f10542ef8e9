//! DeviceAtlas Cloud client
//!
//! Resolves HTTP requests to device properties through the DeviceAtlas
//! Cloud service. Around the single GET request the client adds:
//!
//! - a properties cache keyed by an md5 fingerprint of the identifying
//!   headers
//! - latency ranking of the service endpoints, persisted for a configurable
//!   lifetime
//! - failover across endpoints, where endpoints that failed move to the
//!   tail of the persisted list
//!
//! # Example
//!
//! ```no_run
//! use dacloud_client::{ClientConfig, CloudClient};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> dacloud_client::Result<()> {
//! let client = CloudClient::new(ClientConfig::new("my-licence-key"))?;
//!
//! let result = client
//!     .result_by_headers([
//!         ("User-Agent", "Mozilla/5.0 (Linux; Android 14; Pixel 7)"),
//!         ("Accept-Language", "en-GB"),
//!     ])
//!     .await?;
//!
//! if let Some(properties) = &result.properties {
//!     println!("mobile: {}", properties.contains("isMobilePhone", true));
//! }
//! println!("served from {}", result.source);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod connector;
pub mod endpoint;
pub mod error;
pub mod headers;
pub mod properties;
pub mod ranking;
pub mod registry;
pub mod service;
pub mod store;
pub mod transport;

pub use client::CloudClient;
pub use config::ClientConfig;
pub use connector::{CallOutcome, Connector, FailoverAction};
pub use endpoint::{Endpoint, EndpointListKind, UNREACHABLE, default_endpoints};
pub use error::{ClientError, Result};
pub use headers::RequestIdentity;
pub use properties::{DeviceResult, Properties, Property, Source};
pub use registry::{Candidates, EndpointRegistry, RankingStatus};
pub use service::ResponseCacheService;
pub use store::EndpointStore;
pub use transport::{FetchRequest, FetchResponse, HttpTransport, HttpTransportConfig, Transport};
