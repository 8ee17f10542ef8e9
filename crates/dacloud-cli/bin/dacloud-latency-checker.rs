//! Probe every configured DeviceAtlas Cloud endpoint and report latencies

use anyhow::Result;
use clap::Parser;
use dacloud_cli::{CommonArgs, format_latency_report, init_tracing};

const TOOL: &str = "dacloud-latency-checker";

/// Measure endpoint latencies and name the fastest endpoint
#[derive(Debug, Parser)]
#[command(name = TOOL, version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    println!("\nDeviceAtlas Cloud latency checker\n");
    let Some(licence_key) = cli.common.licence_key_or_usage(TOOL) else {
        return Ok(());
    };

    if let Err(e) = run(&cli.common, licence_key).await {
        tracing::error!(error = %e, "Latency check failed");
        return Err(e);
    }
    println!(
        "\nPlease see https://deviceatlas.com/resources/cloud-service-end-points for more information.\n"
    );
    Ok(())
}

async fn run(common: &CommonArgs, licence_key: &str) -> Result<()> {
    println!("Running tests, this may take a while...");
    let client = common.client(licence_key)?;
    let endpoints = client.server_latencies().await?;
    tracing::info!(
        endpoints = endpoints.len(),
        reachable = endpoints.iter().filter(|e| e.is_reachable()).count(),
        "Latency check finished"
    );
    print!("{}", format_latency_report(&endpoints));

    client.shutdown().await?;
    Ok(())
}
