//! Latency probing and ranking
//!
//! Each endpoint gets `requests + 1` sequential probes; the first one only
//! warms the connection and its timing is dropped. Probing an endpoint stops
//! after `max_failures` failed probes, and any failure makes the endpoint
//! unreachable for this run.

use crate::connector::{CallOutcome, Connector, FailoverAction};
use crate::endpoint::{Endpoint, UNREACHABLE};
use crate::error::{ClientError, Result};
use rand::{RngExt, rng};
use tokio::time::Instant;

/// Probe header; the connector sends it as `X-DA-Latency-Checker`
pub const LATENCY_HEADER: &str = "Latency-Checker";

/// Probe parameters for one ranking run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSettings {
    /// Timed probes per endpoint
    pub requests: u32,
    pub max_failures: u32,
    /// Sent with the warm-up probe so the service can see how the
    /// client ranks
    pub fingerprint: String,
}

/// Settings summary sent with each warm-up probe.
///
/// Concatenation of the self-ranking flag (`y`/`n`), the auto-ranking
/// flag, the timeout in seconds, max failures, request count and the
/// ranking lifetime in minutes.
pub fn settings_fingerprint(
    self_ranking: bool,
    auto_ranking: bool,
    timeout_secs: u64,
    max_failures: u32,
    requests: u32,
    lifetime_minutes: u64,
) -> String {
    format!(
        "{}{auto_ranking}{timeout_secs}{max_failures}{requests}{lifetime_minutes}",
        if self_ranking { "y" } else { "n" }
    )
}

/// Probe one endpoint.
///
/// Returns the timed latencies in milliseconds, with [`UNREACHABLE`] for
/// each failed probe. A refusal from the service aborts with
/// [`ClientError::Fatal`].
pub async fn probe_latencies(
    connector: &Connector,
    endpoint: &Endpoint,
    settings: &ProbeSettings,
) -> Result<Vec<f64>> {
    let mut latencies = Vec::with_capacity(settings.requests as usize);
    let mut failures = 0;
    let mut probe = 0;

    while probe <= settings.requests && failures < settings.max_failures {
        let header_value = if probe == 0 {
            settings.fingerprint.clone()
        } else {
            probe.to_string()
        };
        let headers = [(LATENCY_HEADER.to_string(), header_value)];

        let started = Instant::now();
        match connector.call(endpoint, "", &headers).await {
            CallOutcome::Success(_) => {
                if probe > 0 {
                    latencies.push(started.elapsed().as_secs_f64() * 1000.0);
                }
            }
            CallOutcome::Failed {
                action: FailoverAction::Stop,
                message,
            } => {
                tracing::error!(endpoint = %endpoint, %message, "Endpoint refused latency probe");
                return Err(ClientError::Fatal(message));
            }
            CallOutcome::Failed { message, .. } => {
                tracing::debug!(endpoint = %endpoint, probe, %message, "Latency probe failed");
                failures += 1;
                latencies.push(UNREACHABLE);
            }
        }
        probe += 1;
    }

    Ok(latencies)
}

/// Average over the configured request count, or [`UNREACHABLE`] when any
/// probe failed or nothing was measured
pub fn average(latencies: &[f64], requests: u32) -> f64 {
    if latencies.is_empty() || requests == 0 || latencies.iter().any(|l| *l < 0.0) {
        return UNREACHABLE;
    }
    latencies.iter().sum::<f64>() / f64::from(requests)
}

/// Measure every endpoint, visiting them in random order.
///
/// The result keeps the order of `endpoints`, each entry carrying its
/// latencies and average. The first fatal refusal aborts the whole run.
pub async fn measure_all(
    connector: &Connector,
    endpoints: &[Endpoint],
    settings: &ProbeSettings,
) -> Result<Vec<Endpoint>> {
    let mut measured: Vec<Endpoint> = endpoints.iter().map(Endpoint::without_measurements).collect();
    let mut pending: Vec<usize> = (0..measured.len()).collect();

    while !pending.is_empty() {
        let index = pending.swap_remove(rng().random_range(0..pending.len()));
        let latencies = probe_latencies(connector, &measured[index], settings).await?;

        let endpoint = &mut measured[index];
        endpoint.average = average(&latencies, settings.requests);
        endpoint.latencies = latencies;
        tracing::debug!(endpoint = %endpoint, average = endpoint.average, "Endpoint measured");
    }

    Ok(measured)
}

/// Insert `endpoint` before the first entry with a strictly greater
/// average. Unreachable endpoints are dropped.
pub fn insert_ranked(ranked: &mut Vec<Endpoint>, endpoint: Endpoint) {
    if !endpoint.is_reachable() {
        return;
    }
    let position = ranked
        .iter()
        .position(|e| endpoint.average < e.average)
        .unwrap_or(ranked.len());
    ranked.insert(position, endpoint);
}

/// Reachable endpoints ordered by ascending average; ties keep input order
pub fn rank(measured: Vec<Endpoint>) -> Vec<Endpoint> {
    let mut ranked = Vec::with_capacity(measured.len());
    for endpoint in measured {
        insert_ranked(&mut ranked, endpoint);
    }
    ranked
}

/// Move the first `failed` entries to the tail, keeping relative order
pub fn rotate_failed(endpoints: &[Endpoint], failed: usize) -> Vec<Endpoint> {
    let mut rotated = endpoints.to_vec();
    if !rotated.is_empty() {
        let len = rotated.len();
        rotated.rotate_left(failed % len);
    }
    rotated
}
