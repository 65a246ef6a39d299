//! Sync Helper Configuration
//!
//! Endpoints, credential and task cadences. Everything here is read-only once
//! the agent starts.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default IPC endpoint of the local node
pub const DEFAULT_IPC_PATH: &str = "/root/.silverbitcoin/geth.ipc";

/// Flag file dropped by the update script once a new build is running
pub const DEFAULT_UPDATE_FLAG_FILE: &str = "/var/tmp/silverbitcoin-update-completed";

/// Public IP lookup service
pub const DEFAULT_IP_LOOKUP_URL: &str = "https://api.ipify.org?format=json";

/// Main configuration for the sync helper
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    // === Local node ===

    /// Path of the node's IPC socket
    pub ipc_path: PathBuf,

    /// Directory holding marker files and address.txt
    /// (defaults to the directory of the IPC socket)
    pub data_dir: Option<PathBuf>,

    /// Source checkout used to derive the running commit hash
    pub source_dir: PathBuf,

    // === Registry ===

    /// Base URL of the enode registry
    pub registry_url: String,

    /// Shared secret sent in the Authorization header
    pub access_token: String,

    // === Timing (seconds) ===

    pub publish_interval_secs: u64,
    pub peer_pull_interval_secs: u64,
    pub update_check_interval_secs: u64,

    /// Poll interval while waiting for the IPC socket to appear
    pub transport_poll_interval_secs: u64,

    /// Delay between the socket appearing and the first registration
    pub init_delay_secs: u64,

    /// Timeout for every outbound call (registry, node, IP lookup)
    pub request_timeout_secs: u64,

    // === Update reporting ===

    pub update_flag_file: PathBuf,

    /// Report an update completion once at startup, flag file or not
    pub report_on_startup: bool,

    pub ip_lookup_url: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            ipc_path: PathBuf::from(DEFAULT_IPC_PATH),
            data_dir: None,
            source_dir: PathBuf::from("."),

            registry_url: "http://127.0.0.1:3000".to_string(),
            access_token: String::new(),

            publish_interval_secs: 15,
            peer_pull_interval_secs: 9,
            update_check_interval_secs: 60,
            transport_poll_interval_secs: 5,
            init_delay_secs: 5,
            request_timeout_secs: 5,

            update_flag_file: PathBuf::from(DEFAULT_UPDATE_FLAG_FILE),
            report_on_startup: false,
            ip_lookup_url: DEFAULT_IP_LOOKUP_URL.to_string(),
        }
    }
}

impl AgentConfig {
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

    pub fn with_ipc_path(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.ipc_path = path;
        }
        self
    }

    pub fn with_registry_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url {
            self.registry_url = url;
        }
        self
    }

    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        if let Some(token) = token {
            self.access_token = token;
        }
        self
    }

    pub fn with_source_dir(mut self, dir: Option<PathBuf>) -> Self {
        if let Some(dir) = dir {
            self.source_dir = dir;
        }
        self
    }

    pub fn with_report_on_startup(mut self, enabled: bool) -> Self {
        self.report_on_startup |= enabled;
        self
    }

    /// Directory containing the node's marker files
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            self.ipc_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate configuration values
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.registry_url.starts_with("http://") || self.registry_url.starts_with("https://")) {
            anyhow::bail!("registry_url must be an http(s) URL, got '{}'", self.registry_url);
        }

        if self.access_token.trim().is_empty() {
            anyhow::bail!("access_token must be set (config file, --access-token or ENODE_REGISTRY_TOKEN)");
        }

        let intervals = [
            ("publish_interval_secs", self.publish_interval_secs),
            ("peer_pull_interval_secs", self.peer_pull_interval_secs),
            ("update_check_interval_secs", self.update_check_interval_secs),
            ("transport_poll_interval_secs", self.transport_poll_interval_secs),
            ("request_timeout_secs", self.request_timeout_secs),
        ];
        for (name, value) in intervals {
            if value == 0 {
                anyhow::bail!("{} must be greater than zero", name);
            }
        }

        Ok(())
    }
}
