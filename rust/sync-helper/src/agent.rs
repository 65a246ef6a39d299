//! Sync Agent
//!
//! Keeps the local node connected to the rest of the network and reports
//! rollout progress to the registry.
//!
//! ## Lifecycle
//!
//! ```text
//! WaitForTransport ── socket appears ──▶ Active
//!   (poll every 5s)                        │
//!                                          ├─ init delay, register once, check update flag
//!                                          └─ periodic: publish enode / pull peers / update check
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::AgentConfig;
use crate::error::{AgentError, IdentityError, RegistryClientError};
use crate::identity::{self, NodeIdentity};
use crate::host::HostInfo;
use crate::registry_client::RegistryClient;
use crate::scheduler::PeriodicTask;
use crate::transport::IpcClient;
use crate::types::{RegisterValidatorRequest, UpdateCompleteRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentPhase {
    WaitForTransport,
    Active,
}

/// Outcome of the one-time registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    Registered(NodeIdentity),
    AlreadyRegistered(NodeIdentity),
    /// No address could be determined
    Skipped,
}

pub struct SyncAgent {
    config: AgentConfig,
    ipc: IpcClient,
    registry: RegistryClient,
    host: HostInfo,
    active: AtomicBool,
}

impl SyncAgent {
    pub fn new(config: AgentConfig) -> Result<Self, AgentError> {
        let timeout = config.request_timeout();
        let ipc = IpcClient::new(config.ipc_path.clone(), timeout);
        let registry = RegistryClient::new(&config.registry_url, &config.access_token, timeout)?;
        let host = HostInfo::new(
            config.ip_lookup_url.clone(),
            config.source_dir.clone(),
            timeout,
        )
        .map_err(RegistryClientError::from)?;

        Ok(Self {
            config,
            ipc,
            registry,
            host,
            active: AtomicBool::new(false),
        })
    }

    pub fn phase(&self) -> AgentPhase {
        if self.active.load(Ordering::SeqCst) {
            AgentPhase::Active
        } else {
            AgentPhase::WaitForTransport
        }
    }

    // === Operations ===

    /// Post our enode to the registry
    pub async fn publish_own_address(&self) -> Result<(), AgentError> {
        let enode = self.ipc.enode().await?;
        debug!("📡 Posting enode to registry");
        self.registry.post_enode(&enode).await?;
        debug!("✅ Enode posted");
        Ok(())
    }

    /// Ask the node to dial every registered peer except itself.
    ///
    /// Returns how many peers the node accepted. A failing peer is logged and
    /// skipped.
    pub async fn pull_and_apply_peers(&self) -> Result<usize, AgentError> {
        let peers = self.registry.get_enodes().await?;
        let own = self.ipc.enode().await?;

        let mut added = 0;
        for peer in peers.iter().filter(|p| **p != own) {
            match self.ipc.add_peer(peer).await {
                Ok(true) => added += 1,
                Ok(false) => debug!("Node declined peer {}", peer),
                Err(e) => debug!("Failed to add peer {}: {}", peer, e),
            }
        }

        if added > 0 {
            info!("🔗 Added {} peers", added);
        }
        Ok(added)
    }

    pub async fn resolve_identity(&self) -> Result<NodeIdentity, IdentityError> {
        identity::resolve_identity(&self.ipc, &self.config.data_dir()).await
    }

    /// Register this node with the registry. An existing registration counts
    /// as success.
    pub async fn register_once(&self) -> Result<Registration, AgentError> {
        let identity = match self.resolve_identity().await {
            Ok(identity) => identity,
            Err(e) => {
                warn!("⚠️  Could not determine node address, skipping registration: {}", e);
                return Ok(Registration::Skipped);
            }
        };

        let ip = self.host.public_ip().await;
        info!("📝 Registering {} node: {}", identity.role, identity.address);

        let request = RegisterValidatorRequest {
            validator_address: &identity.address,
            validator_ip: &ip,
            node_type: identity.role.as_str(),
        };

        match self.registry.register_validator(&request).await {
            Ok(()) => {
                info!("✅ {} node registered", identity.role.as_str().to_uppercase());
                Ok(Registration::Registered(identity))
            }
            Err(RegistryClientError::Conflict(_)) => {
                info!("✅ Node already registered");
                Ok(Registration::AlreadyRegistered(identity))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Tell the registry this node is running the current build
    pub async fn report_update_completion(&self) -> Result<(), AgentError> {
        let identity = self.resolve_identity().await?;
        let ip = self.host.public_ip().await;
        let commit = self.host.commit_hash().await;
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        let request = UpdateCompleteRequest {
            validator_address: &identity.address,
            validator_ip: &ip,
            commit_hash: &commit,
            timestamp: &timestamp,
            node_type: identity.role.as_str(),
        };
        self.registry.report_update(&request).await?;

        info!("✅ Update completion reported ({} @ {})", identity.address, commit);
        Ok(())
    }

    /// Report and remove the update flag file if it exists.
    ///
    /// Returns whether a report was sent. The flag stays in place when the
    /// report fails so the next check retries.
    pub async fn check_and_report_update(&self) -> Result<bool, AgentError> {
        let flag = &self.config.update_flag_file;
        if !flag.exists() {
            return Ok(false);
        }

        info!("🔄 Update flag file found, reporting...");
        self.report_update_completion().await?;

        match tokio::fs::remove_file(flag).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(AgentError::Flag {
                    path: flag.clone(),
                    source,
                })
            }
        }

        info!("✅ Update reported and flag removed");
        Ok(true)
    }

    // === Lifecycle ===

    /// One-time work once the node is reachable
    pub async fn initialize(&self) {
        info!("🚀 Initializing node tracking...");

        match self.register_once().await {
            Ok(Registration::Registered(identity) | Registration::AlreadyRegistered(identity)) => {
                debug!("Tracking as {} ({})", identity.address, identity.role)
            }
            Ok(Registration::Skipped) => {}
            Err(e) if matches!(&e, AgentError::Registry(r) if r.is_unreachable()) => {
                warn!("❌ Cannot connect to registry at {}", self.config.registry_url)
            }
            Err(e) => warn!("❌ Registration failed: {}", e),
        }

        if self.config.report_on_startup {
            if let Err(e) = self.report_update_completion().await {
                warn!("❌ Startup update report failed: {}", e);
            }
        }

        if let Err(e) = self.check_and_report_update().await {
            warn!("❌ Update check failed: {}", e);
        }
    }

    /// Start the three periodic tasks
    pub fn spawn_tasks(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        let secs = Duration::from_secs;

        let publish = {
            let agent = self.clone();
            PeriodicTask::new("publish enode", secs(self.config.publish_interval_secs)).spawn(
                move || {
                    let agent = agent.clone();
                    async move { agent.publish_own_address().await }
                },
            )
        };

        let peers = {
            let agent = self.clone();
            PeriodicTask::new("pull peers", secs(self.config.peer_pull_interval_secs)).spawn(
                move || {
                    let agent = agent.clone();
                    async move { agent.pull_and_apply_peers().await }
                },
            )
        };

        let updates = {
            let agent = self.clone();
            PeriodicTask::new("update check", secs(self.config.update_check_interval_secs))
                .spawn(move || {
                    let agent = agent.clone();
                    async move { agent.check_and_report_update().await }
                })
        };

        vec![publish, peers, updates]
    }

    /// Drive the agent until `shutdown` resolves
    pub async fn run_until<S>(self: Arc<Self>, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let poll = Duration::from_secs(self.config.transport_poll_interval_secs);
        while !self.ipc.endpoint_exists() {
            info!("⏳ Waiting for IPC file at {}", self.ipc.path().display());
            tokio::select! {
                _ = &mut shutdown => return,
                _ = tokio::time::sleep(poll) => {}
            }
        }

        info!("✅ IPC file found");
        self.active.store(true, Ordering::SeqCst);
        debug!("Agent phase: {:?}", self.phase());

        let init_delay = Duration::from_secs(self.config.init_delay_secs);
        tokio::select! {
            _ = &mut shutdown => return,
            _ = tokio::time::sleep(init_delay) => {}
        }

        tokio::select! {
            _ = &mut shutdown => return,
            _ = self.initialize() => {}
        }

        let handles = self.spawn_tasks();
        info!("✅ Periodic tasks started");

        shutdown.await;

        for handle in handles {
            handle.abort();
        }
    }
}
