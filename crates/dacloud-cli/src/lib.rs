//! Shared pieces of the DeviceAtlas Cloud command-line tools
//!
//! Both tools take a licence key, build a [`CloudClient`] from the
//! `DACLOUD_*` environment and print a plain-text report to stdout. Logs go
//! to stderr.

use clap::Args;
use dacloud_client::{ClientConfig, CloudClient, Endpoint};
use std::fmt::Write;
use std::time::Duration;

/// Arguments shared by both tools
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// DeviceAtlas Cloud licence key
    #[arg(env = "DACLOUD_LICENCE_KEY")]
    pub licence_key: Option<String>,

    /// Endpoint URL to use instead of the configured list; repeatable
    #[arg(long = "endpoint", value_name = "URL")]
    pub endpoints: Vec<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

impl CommonArgs {
    /// Licence key, or `None` after printing the usage for `tool` to stderr
    pub fn licence_key_or_usage(&self, tool: &str) -> Option<&str> {
        match self.licence_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Some(key),
            _ => {
                eprintln!("\nNo licence key provided.\n");
                eprintln!("usage: {tool} LICENCE-KEY\n");
                None
            }
        }
    }

    /// Client configuration from the environment with these arguments on top
    pub fn client_config(&self, licence_key: &str) -> anyhow::Result<ClientConfig> {
        let mut config = ClientConfig::from_env().with_licence_key(licence_key);

        if !self.endpoints.is_empty() {
            let endpoints = self
                .endpoints
                .iter()
                .map(|url| Endpoint::parse(url))
                .collect::<Result<Vec<_>, _>>()?;
            config = config.with_endpoints(endpoints);
        }
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(Duration::from_secs(timeout));
        }

        config.validate()?;
        tracing::debug!(
            endpoints = config.endpoints.len(),
            timeout_secs = config.timeout.as_secs(),
            auto_ranking = config.auto_ranking,
            "Client configuration loaded"
        );
        Ok(config)
    }

    pub fn client(&self, licence_key: &str) -> anyhow::Result<CloudClient> {
        Ok(CloudClient::new(self.client_config(licence_key)?)?)
    }
}

/// Log to stderr, filtered by `RUST_LOG` with `info` as default
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn format_latency(latency: f64) -> String {
    if latency < 0.0 {
        "n/a".to_string()
    } else {
        format!("{latency:.2}ms")
    }
}

/// Report of a persisted endpoint list.
///
/// Measurements are shown for endpoints that were unreachable when the
/// list was ranked.
pub fn format_cached_list(title: &str, endpoints: Option<&[Endpoint]>) -> String {
    let mut out = format!("********** {title} **********\n");
    let Some(endpoints) = endpoints else {
        out.push_str("    (none)\n");
        return out;
    };

    for endpoint in endpoints {
        let _ = writeln!(out, "    {endpoint}");
        if !endpoint.is_reachable() && !endpoint.latencies.is_empty() {
            for latency in &endpoint.latencies {
                let _ = writeln!(out, "\t{}", format_latency(*latency));
            }
            let _ = writeln!(out, "        * average: {}ms", endpoint.average);
        }
    }
    out
}

/// Endpoint with the lowest non-negative average; the first wins ties
pub fn best_endpoint(endpoints: &[Endpoint]) -> Option<&Endpoint> {
    endpoints
        .iter()
        .filter(|e| e.is_reachable())
        .fold(None, |best: Option<&Endpoint>, e| match best {
            Some(b) if b.average <= e.average => Some(b),
            _ => Some(e),
        })
}

/// Report of measured endpoints, ending with the best one
pub fn format_latency_report(endpoints: &[Endpoint]) -> String {
    let mut out = String::new();

    for endpoint in endpoints {
        let _ = writeln!(out, "\n    {endpoint}");
        if !endpoint.is_reachable() {
            out.push_str("\t(Couldn't connect to host)\n");
        }
        for latency in &endpoint.latencies {
            let _ = writeln!(out, "\t\t{}", format_latency(*latency));
        }
        if endpoint.is_reachable() {
            let _ = writeln!(out, "        * average: {}", format_latency(endpoint.average));
        } else {
            out.push_str("        * average: n/a\n");
        }
    }

    match best_endpoint(endpoints) {
        Some(best) => {
            let _ = writeln!(out, "\nBest endPoint >> {} <<", best.host);
        }
        None => out.push_str("\nNo good server found!\n"),
    }
    out
}
