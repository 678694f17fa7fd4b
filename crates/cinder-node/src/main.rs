//! # cinder-node
//!
//! Development node binary — boots the JSON-RPC gateway over the built-in
//! block-producing provider.

#![deny(unsafe_code)]

mod dev_provider;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cinder_server::{RpcServer, ServerConfig};
use dev_provider::DevProvider;

/// Cinder development node.
#[derive(Parser, Debug)]
#[command(name = "cinder-node", about = "Ethereum-compatible JSON-RPC development node")]
struct Cli {
    /// Host to bind (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides config).
    #[arg(long)]
    port: Option<u16>,

    /// Path to a JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Chain id reported by `eth_chainId` / `net_version`.
    #[arg(long, default_value = "31337")]
    chain_id: u64,

    /// Milliseconds between simulated blocks.
    #[arg(long, default_value = "2000")]
    block_interval_ms: u64,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn resolve_config(args: &Cli) -> Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load_from_path(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Cli::parse();
    let config = resolve_config(&args)?;

    let provider = Arc::new(DevProvider::new(args.chain_id));
    let miner = provider
        .clone()
        .spawn_miner(Duration::from_millis(args.block_interval_ms));

    let server = RpcServer::new(config, provider);
    let (addr, handle) = server.listen().await.context("failed to bind server")?;
    info!(chain_id = args.chain_id, "cinder listening on http://{addr} (ws://{addr})");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    info!("shutting down...");
    miner.abort();
    server.shutdown().trigger();
    let _ = handle.await;
    info!("shutdown complete");
    Ok(())
}
