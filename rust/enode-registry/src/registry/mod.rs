//! Coordination Registry Module
//!
//! Owns all shared state: the peer directory, the validator directory and the
//! update history. State is volatile and lives only as long as the process.
//!
//! The registry is shared as `Arc<RwLock<Registry>>`; every mutating request
//! holds the write guard for its whole duration, so mutations are totally
//! ordered. Readers get owned snapshots, never references into the state.

mod history;
mod peers;
pub mod query;
mod validators;

pub use history::UpdateHistory;
pub use peers::PeerDirectory;
pub use validators::ValidatorDirectory;

use chrono::{SecondsFormat, Utc};
use tracing::info;

use crate::config::RegistryConfig;
use crate::types::{
    HistoryPage, NewValidator, PeerAddress, PendingSummary, StatusSummary, UpdateEvent,
    UpdateReport, ValidatorRecord,
};

/// Errors raised by registry operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("{0}")]
    MissingField(String),

    #[error("{0}")]
    InvalidFormat(String),

    #[error("{0}")]
    Conflict(String),
}

/// Counters exposed by the health endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub enode_count: usize,
    pub validator_count: usize,
    pub update_history_count: usize,
}

/// The registry state object
#[derive(Debug, Clone)]
pub struct Registry {
    peers: PeerDirectory,
    validators: ValidatorDirectory,
    history: UpdateHistory,
}

impl Registry {
    pub fn new(max_peers: usize, max_history: usize) -> Self {
        Self {
            peers: PeerDirectory::new(max_peers),
            validators: ValidatorDirectory::new(),
            history: UpdateHistory::new(max_history),
        }
    }

    pub fn from_config(config: &RegistryConfig) -> Self {
        Self::new(config.max_peers, config.max_history)
    }

    // === Peers ===

    /// Add a peer; returns false when it was already known
    pub fn add_peer(&mut self, peer: PeerAddress) -> bool {
        let enode = peer.to_string();
        let added = self.peers.insert(peer);
        if added {
            info!("➕ Added enode: {}", enode);
        }
        added
    }

    pub fn list_peers(&self) -> Vec<String> {
        self.peers.list()
    }

    /// Periodic trim of the peer directory to `max_peers`; returns the number of evicted peers
    pub fn trim_peers(&mut self, max_peers: usize) -> usize {
        let removed = self.peers.trim_to(max_peers);
        if removed > 0 {
            info!("🧹 Cleaned up enodes, now have: {}", self.peers.len());
        }
        removed
    }

    // === Validators ===

    pub fn register_validator(
        &mut self,
        validator: NewValidator,
    ) -> Result<ValidatorRecord, RegistryError> {
        let record = self.validators.register(validator, &now())?;
        info!("📝 Registered new validator: {}", record.address);
        Ok(record)
    }

    /// Upsert the validator as COMPLETED and append one history event
    pub fn report_update(&mut self, report: UpdateReport) -> ValidatorRecord {
        let now = now();
        let record = self.validators.apply_report(&report, &now);

        self.history.push(UpdateEvent {
            validator_address: report.address,
            validator_ip: record.ip.clone(),
            commit_hash: report.commit_hash,
            timestamp: report.timestamp,
            node_type: report.node_type,
            event_time: now,
        });

        info!(
            "✅ Update completed for validator: {} at {}",
            record.address,
            record.last_update.as_deref().unwrap_or_default()
        );
        record
    }

    // === Queries ===

    pub fn status(&self) -> StatusSummary {
        let total = self.validators.len();
        let completed = query::count_completed(self.validators.iter());

        StatusSummary {
            total_validators: total,
            completed,
            pending: total - completed,
            progress_percentage: query::progress_percentage(completed, total),
            last_update: query::latest_update(self.validators.iter()),
            validators: self.validators.iter().cloned().collect(),
        }
    }

    pub fn pending(&self) -> PendingSummary {
        let validators = query::pending(self.validators.iter());
        PendingSummary {
            count: validators.len(),
            validators,
        }
    }

    pub fn history(&self, limit: usize) -> HistoryPage {
        let history = self.history.recent(limit);
        HistoryPage {
            count: history.len(),
            total_events: self.history.len(),
            history,
        }
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            enode_count: self.peers.len(),
            validator_count: self.validators.len(),
            update_history_count: self.history.len(),
        }
    }
}

/// Current server time as RFC 3339 with millisecond precision
pub fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
