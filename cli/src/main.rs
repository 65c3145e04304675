//! Command-line front end for the Reverse IP/DNS client.

mod args;
mod commands;

use anyhow::Result;
use clap::Parser;
use reverseip_core::{CancellationToken, ReverseIpClient};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::args::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v when set.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let client = ReverseIpClient::new(cli.api_key.clone(), cli.client_params())?;
    info!(base_url = %client.base_url(), "Client ready");

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling request");
            on_ctrl_c.cancel();
        }
    });

    match cli.command {
        Command::Lookup {
            target,
            from,
            show_raw,
        } => commands::lookup(&client, &cancel, &target.ip, from, show_raw).await,
        Command::All { target, page_limit } => {
            commands::all(&client, &cancel, &target.ip, page_limit).await
        }
        Command::Raw {
            target,
            format,
            from,
        } => commands::raw(&client, &cancel, &target.ip, &format, from).await,
    }
}
