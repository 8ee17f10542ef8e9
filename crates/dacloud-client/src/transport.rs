//! HTTP transport
//!
//! [`Transport`] is the seam between the endpoint logic and the network.
//! [`HttpTransport`] implements it on top of reqwest; tests substitute
//! their own implementation.

use crate::config::ClientConfig;
use crate::error::Result;
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode, header};
use std::time::Duration;

/// Message reported for a successful status with an empty body
pub const EMPTY_BODY_MESSAGE: &str = "Returned empty!";

/// Default user agent sent with every request
pub const USER_AGENT: &str = concat!("dacloud-client/", env!("CARGO_PKG_VERSION"));

/// One outgoing GET request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    /// Header names are sent as given
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

/// Outcome of a request that reached the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    /// Error body or reason for a failure, reason phrase on success
    pub message: String,
    /// Decoded body of a successful response; `None` otherwise
    pub body: Option<String>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Fetch operation used for probes and lookups
#[async_trait]
pub trait Transport: Send + Sync {
    /// Network level failures (connect, timeout, body read) are returned as
    /// errors. Any HTTP status is a response.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse>;
}

/// Settings for [`HttpTransport`]
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    pub connect_timeout: Duration,
    pub pool_idle_timeout: Duration,
    pub proxy: Option<String>,
    pub user_agent: String,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(3),
            pool_idle_timeout: Duration::from_secs(30),
            proxy: None,
            user_agent: USER_AGENT.to_string(),
        }
    }
}

impl From<&ClientConfig> for HttpTransportConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            connect_timeout: config.timeout,
            proxy: config.proxy.clone(),
            ..Self::default()
        }
    }
}

/// reqwest-backed transport
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        Self::with_config(&HttpTransportConfig::default())
    }

    pub fn with_config(config: &HttpTransportConfig) -> Result<Self> {
        // Another crate may already have installed a provider
        let _ = rustls::crypto::ring::default_provider().install_default();

        let mut builder = ClientBuilder::new()
            .pool_idle_timeout(config.pool_idle_timeout)
            .connect_timeout(config.connect_timeout)
            .use_rustls_tls()
            // Only gzip is advertised and decoded
            .gzip(true)
            .brotli(false)
            .deflate(false)
            .user_agent(config.user_agent.as_str());

        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy.as_str())?);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Get the underlying reqwest client
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

fn reason(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or_default().to_string()
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
        let mut builder = self
            .client
            .get(&request.url)
            .timeout(request.timeout)
            .header(header::ACCEPT, "application/json");
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        tracing::trace!(url = %request.url, status = status.as_u16(), bytes = body.len(), "Cloud response");

        let response = if !status.is_success() {
            FetchResponse {
                status: status.as_u16(),
                message: if body.trim().is_empty() {
                    reason(status)
                } else {
                    body
                },
                body: None,
            }
        } else if body.is_empty() {
            FetchResponse {
                status: status.as_u16(),
                message: EMPTY_BODY_MESSAGE.to_string(),
                body: None,
            }
        } else {
            FetchResponse {
                status: status.as_u16(),
                message: reason(status),
                body: Some(body),
            }
        };
        Ok(response)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_is_versioned() {
        assert!(USER_AGENT.starts_with("dacloud-client/"));
        assert_eq!(HttpTransportConfig::default().user_agent, USER_AGENT);
    }

    #[test]
    fn test_config_from_client_config() {
        let client = ClientConfig::new("key")
            .with_timeout(Duration::from_secs(7))
            .with_proxy("http://proxy.local:3128");
        let config = HttpTransportConfig::from(&client);
        assert_eq!(config.connect_timeout, Duration::from_secs(7));
        assert_eq!(config.proxy.as_deref(), Some("http://proxy.local:3128"));
        assert!(HttpTransport::with_config(&config).is_ok());
    }

    #[test]
    fn test_response_success_range() {
        let response = FetchResponse {
            status: 204,
            message: String::new(),
            body: None,
        };
        assert!(response.is_success());
        assert!(!FetchResponse { status: 301, ..response }.is_success());
    }
}
