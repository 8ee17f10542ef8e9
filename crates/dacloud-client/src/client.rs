//! Client facade

use crate::config::ClientConfig;
use crate::connector::Connector;
use crate::endpoint::{Endpoint, EndpointListKind};
use crate::error::Result;
use crate::headers::RequestIdentity;
use crate::properties::DeviceResult;
use crate::registry::{Candidates, EndpointRegistry};
use crate::service::ResponseCacheService;
use crate::store::EndpointStore;
use crate::transport::{HttpTransport, HttpTransportConfig, Transport};
use dacloud_cache::{CacheProvider, FileCacheProvider, MemoryCacheProvider};
use std::sync::Arc;

/// Handle to the DeviceAtlas Cloud service.
///
/// Cheap to share behind an [`Arc`]; every operation takes `&self`.
pub struct CloudClient {
    config: ClientConfig,
    service: ResponseCacheService,
}

impl CloudClient {
    /// Client with an HTTP transport, an in-memory properties cache and
    /// endpoint lists persisted through a [`FileCacheProvider`] configured
    /// from the environment
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::with_config(&HttpTransportConfig::from(&config))?;
        Self::with_components(
            config,
            Arc::new(transport),
            Arc::new(MemoryCacheProvider::new()),
            Arc::new(FileCacheProvider::from_env()),
        )
    }

    /// Client configured from `DACLOUD_*` variables
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env())
    }

    /// Client built from explicit components.
    ///
    /// `properties_cache` holds resolved properties by fingerprint and
    /// `ranking_cache` the persisted endpoint lists. Both may be the same
    /// provider.
    pub fn with_components(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        properties_cache: Arc<dyn CacheProvider>,
        ranking_cache: Arc<dyn CacheProvider>,
    ) -> Result<Self> {
        config.validate()?;

        let connector = Connector::new(transport, config.licence_key.clone(), config.timeout);
        let store = EndpointStore::new(ranking_cache, config.ranking_lifetime_minutes);
        let registry = Arc::new(EndpointRegistry::new(&config, connector, store));
        let service = ResponseCacheService::new(registry, properties_cache, &config);

        tracing::debug!(
            endpoints = config.endpoints.len(),
            auto_ranking = config.auto_ranking,
            use_cache = config.use_cache,
            "Cloud client created"
        );
        Ok(Self { config, service })
    }

    /// Configuration the client was built with; flag setters are not
    /// reflected here
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn service(&self) -> &ResponseCacheService {
        &self.service
    }

    pub fn registry(&self) -> &EndpointRegistry {
        self.service.registry()
    }

    /// Look up the properties of a bare user agent
    pub async fn result_by_user_agent(&self, user_agent: &str) -> Result<DeviceResult> {
        let identity = RequestIdentity::from_user_agent(user_agent);
        self.service.lookup(&identity).await
    }

    /// Look up the properties of a request from its headers
    pub async fn result_by_headers<I, K, V>(&self, headers: I) -> Result<DeviceResult>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let identity = self.service.identify(headers);
        self.service.lookup(&identity).await
    }

    /// Rank endpoints by latency now and persist the result
    pub async fn rank_servers(&self) -> Result<Vec<Endpoint>> {
        self.registry().rank_servers().await
    }

    /// Probe every configured endpoint, in configured order
    pub async fn server_latencies(&self) -> Result<Vec<Endpoint>> {
        self.registry().server_latencies().await
    }

    /// Endpoints the next lookup would try, with their origin
    pub async fn endpoints(&self) -> Result<Candidates> {
        self.registry().candidates().await
    }

    pub async fn cached_endpoints(&self, kind: EndpointListKind) -> Option<Vec<Endpoint>> {
        self.registry().cached_list(kind).await
    }

    /// Drop cached properties and both persisted endpoint lists
    pub async fn clear_cache(&self) -> Result<()> {
        self.service.cache().clear().await?;
        self.registry().store().clear().await?;
        Ok(())
    }

    /// Flush and release both cache providers
    pub async fn shutdown(&self) -> Result<()> {
        self.service.cache().shutdown().await?;
        self.registry().store().provider().shutdown().await?;
        Ok(())
    }

    pub fn set_use_cache(&self, enabled: bool) {
        self.service.set_use_cache(enabled);
    }

    pub fn set_use_client_cookie(&self, enabled: bool) {
        self.service.set_use_client_cookie(enabled);
    }

    pub fn set_send_extra_headers(&self, enabled: bool) {
        self.service.set_send_extra_headers(enabled);
    }
}
