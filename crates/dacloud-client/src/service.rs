//! Response cache service
//!
//! Resolves a request identity to device properties: from the properties
//! cache when the fingerprint is known, otherwise from the first endpoint
//! in the registry's candidate list that answers.

use crate::config::ClientConfig;
use crate::connector::{CallOutcome, FailoverAction};
use crate::error::{ClientError, Result};
use crate::headers::RequestIdentity;
use crate::properties::{DeviceResult, Properties, Source};
use crate::registry::EndpointRegistry;
use dacloud_cache::{CacheProvider, CacheProviderExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub struct ResponseCacheService {
    registry: Arc<EndpointRegistry>,
    cache: Arc<dyn CacheProvider>,
    use_cache: AtomicBool,
    use_client_cookie: AtomicBool,
    send_extra_headers: AtomicBool,
}

impl ResponseCacheService {
    pub fn new(
        registry: Arc<EndpointRegistry>,
        cache: Arc<dyn CacheProvider>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            registry,
            cache,
            use_cache: AtomicBool::new(config.use_cache),
            use_client_cookie: AtomicBool::new(config.use_client_cookie),
            send_extra_headers: AtomicBool::new(config.send_extra_headers),
        }
    }

    pub fn registry(&self) -> &Arc<EndpointRegistry> {
        &self.registry
    }

    /// Provider holding resolved properties
    pub fn cache(&self) -> &Arc<dyn CacheProvider> {
        &self.cache
    }

    pub fn use_cache(&self) -> bool {
        self.use_cache.load(Ordering::Relaxed)
    }

    pub fn set_use_cache(&self, enabled: bool) {
        self.use_cache.store(enabled, Ordering::Relaxed);
    }

    pub fn use_client_cookie(&self) -> bool {
        self.use_client_cookie.load(Ordering::Relaxed)
    }

    pub fn set_use_client_cookie(&self, enabled: bool) {
        self.use_client_cookie.store(enabled, Ordering::Relaxed);
    }

    pub fn send_extra_headers(&self) -> bool {
        self.send_extra_headers.load(Ordering::Relaxed)
    }

    pub fn set_send_extra_headers(&self, enabled: bool) {
        self.send_extra_headers.store(enabled, Ordering::Relaxed);
    }

    /// Build the identity of a request from its headers
    pub fn identify<I, K, V>(&self, headers: I) -> RequestIdentity
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        RequestIdentity::from_headers(headers, self.use_client_cookie())
    }

    /// Resolve `identity` to device properties.
    ///
    /// Fails with [`ClientError::Fatal`] as soon as an endpoint refuses the
    /// licence, or with [`ClientError::AllEndpointsFailed`] carrying one
    /// message per endpoint when none answered.
    pub async fn lookup(&self, identity: &RequestIdentity) -> Result<DeviceResult> {
        let fingerprint = identity.fingerprint();

        if self.use_cache() {
            match self.cache.get_json::<Properties>(&fingerprint).await {
                Ok(Some(properties)) => {
                    tracing::debug!(%fingerprint, "Properties cache hit");
                    return Ok(DeviceResult {
                        source: Source::Cache,
                        properties: Some(properties),
                        ..DeviceResult::default()
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(%fingerprint, error = %e, "Properties cache read failed");
                }
            }
        }

        let candidates = self.registry.candidates().await?;
        if candidates.endpoints.is_empty() {
            return Err(ClientError::NoEndpointsConfigured);
        }

        let headers = identity.forwarded_headers(self.send_extra_headers());
        let connector = self.registry.connector();
        let mut errors = Vec::new();

        for (index, endpoint) in candidates.endpoints.iter().enumerate() {
            match connector.call(endpoint, &identity.user_agent, &headers).await {
                CallOutcome::Success(properties) => {
                    self.registry.report_success(&candidates, index).await;

                    let properties = properties.as_ref().map(Properties::from);
                    if let Some(properties) = &properties {
                        self.store(&fingerprint, properties).await;
                    }

                    tracing::debug!(
                        endpoint = %endpoint,
                        status = %candidates.status,
                        failed = index,
                        "Properties fetched from cloud"
                    );
                    return Ok(DeviceResult {
                        source: Source::Cloud,
                        properties,
                        cloud_url: Some(endpoint.url()),
                        ranking_status: Some(candidates.status),
                    });
                }
                CallOutcome::Failed {
                    action: FailoverAction::Stop,
                    message,
                } => {
                    tracing::error!(endpoint = %endpoint, %message, "Endpoint refused request");
                    return Err(ClientError::Fatal(message));
                }
                CallOutcome::Failed { message, .. } => {
                    tracing::warn!(endpoint = %endpoint, %message, "Endpoint failed, trying next");
                    errors.push(message);
                }
            }
        }

        Err(ClientError::AllEndpointsFailed(errors))
    }

    async fn store(&self, fingerprint: &str, properties: &Properties) {
        if !self.use_cache() {
            return;
        }
        if let Err(e) = self.cache.set_json(fingerprint, properties).await {
            tracing::warn!(%fingerprint, error = %e, "Properties cache write failed");
        }
    }
}
