//! Client configuration
//!
//! Defaults match the public cloud service. [`ClientConfig::from_env`]
//! overrides them from `DACLOUD_*` variables.

use crate::endpoint::{Endpoint, default_endpoints};
use crate::error::{ClientError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub licence_key: String,
    /// Configured endpoints, in the order used when nothing is cached
    pub endpoints: Vec<Endpoint>,
    /// Rank endpoints by measured latency
    pub auto_ranking: bool,
    /// Timed probes per endpoint, on top of one warm-up probe
    pub ranking_requests: u32,
    /// Failed probes after which an endpoint is given up
    pub ranking_max_failures: u32,
    /// Per-request timeout
    pub timeout: Duration,
    /// Lifetime of persisted endpoint lists in minutes; 0 disables
    /// persistence
    pub ranking_lifetime_minutes: u64,
    /// Cache resolved properties by request fingerprint
    pub use_cache: bool,
    /// Include the client-side `DAPROPS` cookie in requests
    pub use_client_cookie: bool,
    /// Forward proxy and client-address headers
    pub send_extra_headers: bool,
    pub proxy: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            licence_key: String::new(),
            endpoints: default_endpoints(),
            auto_ranking: true,
            ranking_requests: 3,
            ranking_max_failures: 1,
            timeout: Duration::from_secs(3),
            ranking_lifetime_minutes: 1440,
            use_cache: true,
            use_client_cookie: true,
            send_extra_headers: false,
            proxy: None,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl ClientConfig {
    pub fn new(licence_key: impl Into<String>) -> Self {
        Self {
            licence_key: licence_key.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables keep their default. `DACLOUD_ENDPOINTS`
    /// is a comma separated list of `scheme://host[:port][/path]`; entries
    /// that do not parse are skipped.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let endpoints = std::env::var("DACLOUD_ENDPOINTS")
            .ok()
            .map(|list| {
                list.split(',')
                    .filter(|s| !s.trim().is_empty())
                    .filter_map(|s| Endpoint::parse(s).ok())
                    .collect::<Vec<_>>()
            })
            .filter(|list| !list.is_empty())
            .unwrap_or(defaults.endpoints);

        Self {
            licence_key: std::env::var("DACLOUD_LICENCE_KEY").unwrap_or_default(),
            endpoints,
            auto_ranking: env_or("DACLOUD_AUTO_RANKING", defaults.auto_ranking),
            ranking_requests: env_or("DACLOUD_RANKING_REQUESTS", defaults.ranking_requests),
            ranking_max_failures: env_or(
                "DACLOUD_RANKING_MAX_FAILURES",
                defaults.ranking_max_failures,
            ),
            timeout: Duration::from_secs(env_or("DACLOUD_TIMEOUT", defaults.timeout.as_secs())),
            ranking_lifetime_minutes: env_or(
                "DACLOUD_RANKING_LIFETIME",
                defaults.ranking_lifetime_minutes,
            ),
            use_cache: env_or("DACLOUD_USE_CACHE", defaults.use_cache),
            use_client_cookie: env_or("DACLOUD_USE_CLIENT_COOKIE", defaults.use_client_cookie),
            send_extra_headers: env_or(
                "DACLOUD_SEND_EXTRA_HEADERS",
                defaults.send_extra_headers,
            ),
            proxy: std::env::var("DACLOUD_PROXY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        }
    }

    pub fn with_licence_key(mut self, licence_key: impl Into<String>) -> Self {
        self.licence_key = licence_key.into();
        self
    }

    pub fn with_endpoints(mut self, endpoints: Vec<Endpoint>) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_auto_ranking(mut self, auto_ranking: bool) -> Self {
        self.auto_ranking = auto_ranking;
        self
    }

    pub fn with_ranking_requests(mut self, requests: u32, max_failures: u32) -> Self {
        self.ranking_requests = requests;
        self.ranking_max_failures = max_failures;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_ranking_lifetime_minutes(mut self, minutes: u64) -> Self {
        self.ranking_lifetime_minutes = minutes;
        self
    }

    pub fn with_use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn with_use_client_cookie(mut self, use_client_cookie: bool) -> Self {
        self.use_client_cookie = use_client_cookie;
        self
    }

    pub fn with_send_extra_headers(mut self, send_extra_headers: bool) -> Self {
        self.send_extra_headers = send_extra_headers;
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Persisted endpoint list lifetime
    pub fn ranking_lifetime(&self) -> Duration {
        Duration::from_secs(self.ranking_lifetime_minutes.saturating_mul(60))
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoints.is_empty() {
            return Err(ClientError::NoEndpointsConfigured);
        }

        if self.ranking_requests == 0 {
            return Err(ClientError::Config(
                "ranking_requests must be greater than 0".to_string(),
            ));
        }

        if self.timeout.is_zero() {
            return Err(ClientError::Config(
                "timeout must be greater than 0".to_string(),
            ));
        }

        for endpoint in &self.endpoints {
            Url::parse(&endpoint.url())
                .map_err(|e| ClientError::InvalidEndpoint(format!("{}: {e}", endpoint.url())))?;
        }

        if let Some(proxy) = &self.proxy {
            Url::parse(proxy).map_err(|e| ClientError::Config(format!("invalid proxy {proxy}: {e}")))?;
        }

        Ok(())
    }
}
