//! Registry Configuration
//!
//! Configurable parameters for the enode registry service.
//! Defaults match the values the sync helpers in the field are deployed against.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::Path;

/// Main configuration for the registry service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    // === Network ===

    /// Address the HTTP API binds to
    pub bind_address: IpAddr,

    /// Port for the HTTP API
    pub api_port: u16,

    // === Security ===

    /// Shared secret expected in the Authorization header of mutating requests
    pub access_token: String,

    // === Limits ===

    /// Maximum enodes kept in the peer directory (oldest dropped first)
    pub max_peers: usize,

    /// Maximum update events kept in the history log
    pub max_history: usize,

    /// Number of history events returned when no limit is requested
    pub default_history_limit: usize,

    // === Timing ===

    /// Interval for maintenance tasks (seconds)
    pub maintenance_interval_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::from([0, 0, 0, 0]),
            api_port: 3000,

            access_token: String::new(),

            max_peers: 10,
            max_history: 100,
            default_history_limit: 50,

            maintenance_interval_secs: 300, // 5 minutes
        }
    }
}

impl RegistryConfig {
    /// Load configuration from TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    // Builder-style methods for CLI overrides

    pub fn with_api_port(mut self, port: Option<u16>) -> Self {
        if let Some(port) = port {
            self.api_port = port;
        }
        self
    }

    pub fn with_bind_address(mut self, address: Option<IpAddr>) -> Self {
        if let Some(address) = address {
            self.bind_address = address;
        }
        self
    }

    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        if let Some(token) = token {
            self.access_token = token;
        }
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.access_token.trim().is_empty() {
            anyhow::bail!("access_token must be set (config file, --access-token or ENODE_REGISTRY_TOKEN)");
        }

        if self.max_peers == 0 {
            anyhow::bail!("max_peers must be greater than zero");
        }

        if self.max_history == 0 {
            anyhow::bail!("max_history must be greater than zero");
        }

        if self.default_history_limit > self.max_history {
            anyhow::bail!(
                "default_history_limit ({}) should not exceed max_history ({})",
                self.default_history_limit,
                self.max_history
            );
        }

        if self.maintenance_interval_secs == 0 {
            anyhow::bail!("maintenance_interval_secs must be greater than zero");
        }

        Ok(())
    }
}
