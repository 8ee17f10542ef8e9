//! Cloud endpoint records

use crate::error::{ClientError, Result};
use dacloud_cache::{AUTO_RANKED_KEY, MANUAL_RANKED_KEY};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Latency or average of an endpoint that could not be reached
pub const UNREACHABLE: f64 = -1.0;

/// Detection path used when an endpoint does not name one
pub const DEFAULT_PATH: &str = "/v1/detect/properties";

/// One remote service instance.
///
/// `host` keeps its scheme (`http://region0.deviceatlascloud.com`) so that
/// [`Endpoint::url`] is directly usable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_path")]
    pub path: String,
    /// Measured probe latencies in milliseconds
    #[serde(default)]
    pub latencies: Vec<f64>,
    #[serde(rename = "avg", default = "unreachable")]
    pub average: f64,
}

fn default_path() -> String {
    DEFAULT_PATH.to_string()
}

const fn unreachable() -> f64 {
    UNREACHABLE
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::with_path(host, port, DEFAULT_PATH)
    }

    pub fn with_path(host: impl Into<String>, port: u16, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            path: path.into(),
            latencies: Vec::new(),
            average: UNREACHABLE,
        }
    }

    /// Parse `scheme://host[:port][/path]`.
    ///
    /// The port defaults to the scheme's well-known port and an empty path
    /// to [`DEFAULT_PATH`].
    pub fn parse(input: &str) -> Result<Self> {
        let url = Url::parse(input.trim())
            .map_err(|e| ClientError::InvalidEndpoint(format!("{input}: {e}")))?;
        let host = url
            .host_str()
            .ok_or_else(|| ClientError::InvalidEndpoint(format!("{input}: missing host")))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| ClientError::InvalidEndpoint(format!("{input}: missing port")))?;

        let path = match url.path() {
            "" | "/" => DEFAULT_PATH,
            path => path,
        };
        Ok(Self::with_path(format!("{}://{host}", url.scheme()), port, path))
    }

    /// Base request URL, `host:port/path`
    pub fn url(&self) -> String {
        format!("{}:{}{}", self.host, self.port, self.path)
    }

    pub fn is_reachable(&self) -> bool {
        self.average >= 0.0
    }

    /// Same endpoint with measurements cleared
    pub fn without_measurements(&self) -> Self {
        Self::with_path(self.host.clone(), self.port, self.path.clone())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// The public DeviceAtlas Cloud regions
pub fn default_endpoints() -> Vec<Endpoint> {
    (0..4)
        .map(|region| Endpoint::new(format!("http://region{region}.deviceatlascloud.com"), 80))
        .collect()
}

/// Which persisted endpoint list an operation refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndpointListKind {
    /// Ordered by measured latency
    Auto,
    /// Reordered after failures of the top endpoint
    Manual,
}

impl EndpointListKind {
    pub const fn cache_key(self) -> &'static str {
        match self {
            Self::Auto => AUTO_RANKED_KEY,
            Self::Manual => MANUAL_RANKED_KEY,
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::panic, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_url() {
        let endpoint = Endpoint::new("http://region0.deviceatlascloud.com", 80);
        assert_eq!(
            endpoint.url(),
            "http://region0.deviceatlascloud.com:80/v1/detect/properties"
        );
        assert_eq!(endpoint.to_string(), "http://region0.deviceatlascloud.com:80");
        assert!(!endpoint.is_reachable());
    }

    #[test]
    fn test_parse() {
        let endpoint = Endpoint::parse("http://127.0.0.1:8123").expect("Test operation should succeed");
        assert_eq!(endpoint.host, "http://127.0.0.1");
        assert_eq!(endpoint.port, 8123);
        assert_eq!(endpoint.path, DEFAULT_PATH);

        let endpoint = Endpoint::parse("https://cloud.example.com/v2/detect").expect("Test operation should succeed");
        assert_eq!(endpoint.port, 443);
        assert_eq!(endpoint.path, "/v2/detect");

        assert!(matches!(
            Endpoint::parse("not a url"),
            Err(ClientError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_default_endpoints() {
        let endpoints = default_endpoints();
        assert_eq!(endpoints.len(), 4);
        assert_eq!(endpoints[3].host, "http://region3.deviceatlascloud.com");
        assert!(endpoints.iter().all(|e| e.port == 80));
    }

    #[test]
    fn test_serde_round_trip_keeps_sentinel() {
        let mut endpoint = Endpoint::new("http://a.example.com", 80);
        endpoint.latencies = vec![12.0, UNREACHABLE];

        let json = serde_json::to_string(&endpoint).expect("Test operation should succeed");
        assert!(json.contains("\"avg\":-1.0"));

        let back: Endpoint = serde_json::from_str(&json).expect("Test operation should succeed");
        assert_eq!(back, endpoint);

        let minimal: Endpoint = serde_json::from_str(r#"{"host":"http://b","port":8080}"#)
            .expect("Test operation should succeed");
        assert_eq!(minimal.path, DEFAULT_PATH);
        assert_eq!(minimal.average, UNREACHABLE);
    }

    #[test]
    fn test_list_keys() {
        assert_eq!(EndpointListKind::Auto.cache_key(), "deviceatlas_servers_cache_auto");
        assert_eq!(EndpointListKind::Manual.cache_key(), "deviceatlas_servers_cache_manual");
    }
}
