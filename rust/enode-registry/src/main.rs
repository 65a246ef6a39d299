//! Enode Registry Service
//!
//! Central coordination point for a private SilverBitcoin network.
//!
//! ## Responsibilities
//!
//! - **Peer discovery**: nodes post their enode, everyone pulls the list
//! - **Rollout tracking**: validators register and report applied updates
//! - **Observation**: status, pending and history views for the dashboard
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ENODE REGISTRY                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  HTTP API (3000)      ←── sync helpers and dashboard        │
//! │  Registry (in-memory) ←── peers, validators, history        │
//! │  Maintenance          ←── trims peer list every 5m          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! State is volatile: a restart starts from an empty registry and nodes
//! repopulate it on their next publish cycle.

use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

mod api;
mod config;
mod registry;
mod types;

use api::Metrics;
use config::RegistryConfig;
use registry::Registry;

/// Enode Registry - peer discovery and validator update tracking
#[derive(Parser, Debug)]
#[command(name = "enode-registry")]
#[command(author = "SilverBitcoin Contributors")]
#[command(version)]
#[command(about = "Coordination registry for private-network nodes", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "enode-registry.toml")]
    config: PathBuf,

    /// HTTP API port
    #[arg(long, env = "ENODE_REGISTRY_PORT")]
    api_port: Option<u16>,

    /// Address to bind the HTTP API to
    #[arg(long, env = "ENODE_REGISTRY_BIND")]
    bind_address: Option<IpAddr>,

    /// Shared secret required on mutating endpoints
    #[arg(long, env = "ENODE_REGISTRY_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

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

    info!("🌐 Enode Registry v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = if args.config.exists() {
        RegistryConfig::load(&args.config)?
    } else {
        warn!("Config file not found, using defaults");
        RegistryConfig::default()
    };

    // Override config with CLI args
    let config = config
        .with_api_port(args.api_port)
        .with_bind_address(args.bind_address)
        .with_access_token(args.access_token);

    if let Some(path) = args.dump_config {
        config.save(&path)?;
        info!("💾 Configuration written to {}", path.display());
        return Ok(());
    }

    config.validate()?;

    info!("⚙️  Configuration:");
    info!("   API: {}:{}", config.bind_address, config.api_port);
    info!("   Max enodes: {}", config.max_peers);
    info!("   Max history events: {}", config.max_history);
    info!("   Maintenance interval: {}s", config.maintenance_interval_secs);

    let shared_config = Arc::new(config);

    let registry = Arc::new(RwLock::new(Registry::from_config(&shared_config)));
    info!("📦 Validator tracking initialized - waiting for registrations");

    let metrics = Arc::new(Metrics::new());

    // Start all services concurrently
    let api_handle = tokio::spawn(api::run_api_server(
        shared_config.clone(),
        registry.clone(),
        metrics.clone(),
    ));

    let maintenance_handle = tokio::spawn(run_maintenance(
        shared_config.clone(),
        registry.clone(),
    ));

    info!("✅ All services started");
    info!("   Press Ctrl+C to shutdown gracefully");

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("🛑 Shutdown signal received");
        }
        result = api_handle => {
            error!("HTTP API exited: {:?}", result);
        }
        result = maintenance_handle => {
            error!("Maintenance task exited: {:?}", result);
        }
    }

    info!("👋 Enode Registry shutting down (state is not persisted)");
    Ok(())
}

/// Periodic maintenance tasks
async fn run_maintenance(
    config: Arc<RegistryConfig>,
    registry: Arc<RwLock<Registry>>,
) -> anyhow::Result<()> {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(
        config.maintenance_interval_secs,
    ));
    // The first tick completes immediately
    interval.tick().await;

    loop {
        interval.tick().await;

        let mut reg = registry.write().await;
        let stats = reg.stats();
        info!(
            "📊 Status: {} enodes, {} validators, {} history events",
            stats.enode_count, stats.validator_count, stats.update_history_count
        );

        reg.trim_peers(config.max_peers);
    }
}
