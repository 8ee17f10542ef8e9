//! Print the endpoint lists persisted by the DeviceAtlas Cloud client

use anyhow::Result;
use clap::Parser;
use dacloud_cli::{CommonArgs, format_cached_list, init_tracing};
use dacloud_client::EndpointListKind;

const TOOL: &str = "dacloud-cached-endpoints";

/// Show the cached auto-ranked and manual failover endpoint lists
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

    println!("\nDeviceAtlas Cloud\n");
    let Some(licence_key) = cli.common.licence_key_or_usage(TOOL) else {
        return Ok(());
    };

    if let Err(e) = run(&cli.common, licence_key).await {
        tracing::error!(error = %e, "Reading cached endpoint lists failed");
        return Err(e);
    }
    Ok(())
}

async fn run(common: &CommonArgs, licence_key: &str) -> Result<()> {
    let client = common.client(licence_key)?;

    let auto = client.cached_endpoints(EndpointListKind::Auto).await;
    print!(
        "{}",
        format_cached_list("CACHED SERVER AUTO RANKED LIST", auto.as_deref())
    );

    let manual = client.cached_endpoints(EndpointListKind::Manual).await;
    print!(
        "\n{}",
        format_cached_list("CACHED SERVER MANUAL FAILOVER LIST", manual.as_deref())
    );

    client.shutdown().await?;
    Ok(())
}
