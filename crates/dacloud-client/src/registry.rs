//! Endpoint registry
//!
//! Decides which ordered endpoint list a lookup should walk:
//!
//! 1. with auto ranking on, a fresh cached auto-ranked list
//! 2. with auto ranking on, the result of a new latency run
//! 3. a fresh cached manual (failover) list
//! 4. the configured list
//!
//! Lists are never mutated in place. Ranking and failover rotation build a
//! new list which replaces the persisted one.

use crate::config::ClientConfig;
use crate::connector::Connector;
use crate::endpoint::{Endpoint, EndpointListKind};
use crate::error::Result;
use crate::ranking::{self, ProbeSettings};
use crate::store::EndpointStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Where the current candidate list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RankingStatus {
    /// Cached auto-ranked list
    Auto,
    /// Produced by a latency run during this call
    AutoFreshlyRanked,
    /// Cached failover list
    Manual,
    /// Configured list
    Default,
}

impl RankingStatus {
    /// One-letter code reported by the other DeviceAtlas clients
    pub const fn code(self) -> &'static str {
        match self {
            Self::Auto => "A",
            Self::AutoFreshlyRanked => "L",
            Self::Manual => "M",
            Self::Default => "D",
        }
    }

    /// Persisted list a reordering of this list belongs to
    pub const fn list_kind(self) -> EndpointListKind {
        match self {
            Self::Auto | Self::AutoFreshlyRanked => EndpointListKind::Auto,
            Self::Manual | Self::Default => EndpointListKind::Manual,
        }
    }
}

impl fmt::Display for RankingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Ordered endpoints to try for one lookup
#[derive(Debug, Clone, PartialEq)]
pub struct Candidates {
    pub endpoints: Vec<Endpoint>,
    pub status: RankingStatus,
}

/// Clears the ranking flag when the run ends, on every path
struct RankingGuard<'a>(&'a AtomicBool);

impl<'a> RankingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RankingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Holds the configured endpoints and chooses, ranks and reorders them
pub struct EndpointRegistry {
    endpoints: Vec<Endpoint>,
    connector: Connector,
    store: EndpointStore,
    auto_ranking: bool,
    requests: u32,
    max_failures: u32,
    timeout_secs: u64,
    lifetime_minutes: u64,
    ranking: AtomicBool,
}

impl EndpointRegistry {
    pub fn new(config: &ClientConfig, connector: Connector, store: EndpointStore) -> Self {
        Self {
            endpoints: config.endpoints.clone(),
            connector,
            store,
            auto_ranking: config.auto_ranking,
            requests: config.ranking_requests,
            max_failures: config.ranking_max_failures,
            timeout_secs: config.timeout.as_secs(),
            lifetime_minutes: config.ranking_lifetime_minutes,
            ranking: AtomicBool::new(false),
        }
    }

    pub fn connector(&self) -> &Connector {
        &self.connector
    }

    pub fn store(&self) -> &EndpointStore {
        &self.store
    }

    /// Configured endpoints, unranked
    pub fn configured(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub const fn auto_ranking(&self) -> bool {
        self.auto_ranking
    }

    /// Whether a latency run is currently in progress
    pub fn is_ranking(&self) -> bool {
        self.ranking.load(Ordering::Acquire)
    }

    fn probe_settings(&self, self_ranking: bool) -> ProbeSettings {
        ProbeSettings {
            requests: self.requests,
            max_failures: self.max_failures,
            fingerprint: ranking::settings_fingerprint(
                self_ranking,
                self.auto_ranking,
                self.timeout_secs,
                self.max_failures,
                self.requests,
                self.lifetime_minutes,
            ),
        }
    }

    /// Ordered endpoints for the next lookup.
    ///
    /// Only a fatal refusal during a latency run is an error; every other
    /// problem falls through to the next source.
    pub async fn candidates(&self) -> Result<Candidates> {
        if self.auto_ranking {
            if let Some(endpoints) = self.store.cached_list(EndpointListKind::Auto).await {
                return Ok(Candidates {
                    endpoints,
                    status: RankingStatus::Auto,
                });
            }

            let ranked = self.rank(true).await?;
            if !ranked.is_empty() {
                return Ok(Candidates {
                    endpoints: ranked,
                    status: RankingStatus::AutoFreshlyRanked,
                });
            }
        }

        Ok(self.fallback().await)
    }

    async fn fallback(&self) -> Candidates {
        match self.store.cached_list(EndpointListKind::Manual).await {
            Some(endpoints) => Candidates {
                endpoints,
                status: RankingStatus::Manual,
            },
            None => Candidates {
                endpoints: self.endpoints.clone(),
                status: RankingStatus::Default,
            },
        }
    }

    /// Run a latency ranking now and persist the result.
    ///
    /// Returns an empty list when auto ranking is disabled, another run is
    /// in progress, or no endpoint answered.
    pub async fn rank_servers(&self) -> Result<Vec<Endpoint>> {
        if !self.auto_ranking {
            return Ok(Vec::new());
        }
        self.rank(false).await
    }

    async fn rank(&self, self_ranking: bool) -> Result<Vec<Endpoint>> {
        let Some(_guard) = RankingGuard::acquire(&self.ranking) else {
            tracing::debug!("Endpoint ranking already in progress");
            return Ok(Vec::new());
        };

        let measured = ranking::measure_all(
            &self.connector,
            &self.endpoints,
            &self.probe_settings(self_ranking),
        )
        .await?;
        let ranked = ranking::rank(measured);

        if ranked.is_empty() {
            // Keep serving the unranked order until the lifetime runs out
            // instead of probing again on every lookup
            let fallback = self.fallback().await;
            tracing::warn!(
                status = %fallback.status,
                "No endpoint answered the latency probes"
            );
            self.persist(EndpointListKind::Auto, &fallback.endpoints).await;
            return Ok(Vec::new());
        }

        tracing::info!(
            best = %ranked[0],
            reachable = ranked.len(),
            configured = self.endpoints.len(),
            "Endpoints ranked"
        );
        self.persist(EndpointListKind::Auto, &ranked).await;
        Ok(ranked)
    }

    /// Probe every configured endpoint without ranking or persisting.
    ///
    /// The result keeps the configured order.
    pub async fn server_latencies(&self) -> Result<Vec<Endpoint>> {
        ranking::measure_all(&self.connector, &self.endpoints, &self.probe_settings(false)).await
    }

    /// Record that `candidates.endpoints[index]` answered after every
    /// endpoint before it failed. The failed endpoints move to the tail of
    /// the persisted list.
    pub async fn report_success(&self, candidates: &Candidates, index: usize) {
        if index == 0 || candidates.endpoints.is_empty() {
            return;
        }
        let rotated = ranking::rotate_failed(&candidates.endpoints, index);
        self.persist(candidates.status.list_kind(), &rotated).await;
    }

    /// Persisted list of `kind`, if any
    pub async fn cached_list(&self, kind: EndpointListKind) -> Option<Vec<Endpoint>> {
        self.store.cached_list(kind).await
    }

    async fn persist(&self, kind: EndpointListKind, list: &[Endpoint]) {
        if let Err(e) = self.store.persist(kind, list).await {
            tracing::warn!(key = kind.cache_key(), error = %e, "Failed to persist endpoint list");
        }
    }
}
