//! Sync Helper
//!
//! Sidecar for a SilverBitcoin node. Talks to the node over its IPC socket
//! and to the enode registry over HTTP:
//!
//! - publishes the node's enode (every 15s)
//! - dials every other registered node (every 9s)
//! - registers the node once and reports completed updates (every 60s)

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

mod agent;
mod config;
mod error;
mod host;
mod identity;
mod registry_client;
mod scheduler;
mod transport;
mod types;

#[cfg(test)]
mod test_support;

use agent::SyncAgent;
use config::AgentConfig;

/// Sync Helper - keeps a node peered and reports rollout progress
#[derive(Parser, Debug)]
#[command(name = "sync-helper")]
#[command(author = "SilverBitcoin Contributors")]
#[command(version)]
#[command(about = "Peer sync and update reporting sidecar for SilverBitcoin nodes", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "sync-helper.toml")]
    config: PathBuf,

    /// Node IPC socket
    #[arg(long, env = "IPC_PATH")]
    ipc_path: Option<PathBuf>,

    /// Enode registry base URL
    #[arg(long, env = "SYNC_HELPER_REGISTRY_URL")]
    registry_url: Option<String>,

    /// Registry access token
    #[arg(long, env = "ENODE_REGISTRY_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Source checkout used for the reported commit hash
    #[arg(long, env = "SYNC_HELPER_SOURCE_DIR")]
    source_dir: Option<PathBuf>,

    /// Report an update completion once at startup
    #[arg(long)]
    report_on_startup: bool,

    /// Write the effective configuration to this path and exit
    #[arg(long)]
    dump_config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .init();

    // Load configuration
    let config = if args.config.exists() {
        AgentConfig::load(&args.config)?
    } else {
        warn!("Config file not found, using defaults");
        AgentConfig::default()
    };

    // Override config with CLI args
    let config = config
        .with_ipc_path(args.ipc_path)
        .with_registry_url(args.registry_url)
        .with_access_token(args.access_token)
        .with_source_dir(args.source_dir)
        .with_report_on_startup(args.report_on_startup);

    if let Some(path) = args.dump_config {
        config.save(&path)?;
        info!("💾 Configuration written to {}", path.display());
        return Ok(());
    }

    config.validate()?;

    info!("🚀 SilverBitcoin Sync Helper v{}", env!("CARGO_PKG_VERSION"));
    info!("   Registry: {}", config.registry_url);
    info!("   IPC path: {}", config.ipc_path.display());
    info!(
        "   Intervals: publish {}s, peers {}s, update check {}s",
        config.publish_interval_secs,
        config.peer_pull_interval_secs,
        config.update_check_interval_secs
    );
    info!("   Waiting for node to start...");

    let agent = Arc::new(SyncAgent::new(config)?);

    agent
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            info!("🛑 Shutdown signal received");
        })
        .await;

    info!("👋 Sync Helper stopped");
    Ok(())
}
