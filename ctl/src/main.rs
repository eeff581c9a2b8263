//! proxymanctl
//!
//! Manages users on a running Xray engine's inbounds through the handler
//! service gateway.
//!
//! Usage:
//!   proxymanctl --endpoint http://127.0.0.1:8080 list-users --tag vless-in
//!   proxymanctl add-user --tag vless-in --email alice --protocol vless \
//!       --credential 2d4f8a4e-6b8c-4c57-9a55-5f0f3b1d2a10 --flow xtls-rprx-vision

use anyhow::{Context, Result};
use clap::Parser;
use proxyman_client::{HttpHandlerService, Proxyman};
use proxyman_ctl::{Cli, run};
use tracing::{Level, debug};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    debug!("Using endpoint {}", cli.endpoint);
    let channel =
        HttpHandlerService::new(cli.channel_config()).context("Failed to create channel")?;
    let client = Proxyman::new(channel);

    for line in run(&client, &cli.command).await? {
        println!("{line}");
    }
    Ok(())
}
