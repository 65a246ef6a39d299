//! Metrics Collection
//!
//! Request counters for monitoring the registry.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::registry::RegistryStats;

/// Metrics collector for the registry API
#[derive(Debug, Default)]
pub struct Metrics {
    /// Start time for uptime calculation
    start_time: Option<Instant>,

    /// Accepted POST /post-enode calls (including duplicates)
    pub enodes_posted: AtomicU64,

    /// Successful validator registrations
    pub validators_registered: AtomicU64,

    /// Recorded update completions
    pub updates_reported: AtomicU64,

    /// Requests rejected for a missing or wrong token
    pub unauthorized_requests: AtomicU64,

    /// Requests rejected for missing or malformed fields
    pub invalid_requests: AtomicU64,

    /// Duplicate registrations
    pub conflicts: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time
            .map(|t| t.elapsed().as_secs())
            .unwrap_or(0)
    }

    pub fn inc_enodes_posted(&self) {
        self.enodes_posted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_validators_registered(&self) {
        self.validators_registered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_updates_reported(&self) {
        self.updates_reported.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_unauthorized(&self) {
        self.unauthorized_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_invalid(&self) {
        self.invalid_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_conflicts(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
    }

    /// Export metrics in Prometheus format, together with current state sizes
    pub fn to_prometheus(&self, stats: &RegistryStats) -> String {
        let mut output = String::new();

        let gauges = [
            ("uptime_seconds", "Registry uptime in seconds", self.uptime_secs()),
            ("enodes", "Enodes currently known", stats.enode_count as u64),
            ("validators", "Validators currently tracked", stats.validator_count as u64),
            ("history_events", "Update events in the history log", stats.update_history_count as u64),
        ];
        for (name, help, value) in gauges {
            let _ = write!(
                output,
                "# HELP enode_registry_{name} {help}\n\
                 # TYPE enode_registry_{name} gauge\n\
                 enode_registry_{name} {value}\n\n"
            );
        }

        let counters = [
            ("enodes_posted_total", "Accepted enode posts", &self.enodes_posted),
            ("validators_registered_total", "Validator registrations", &self.validators_registered),
            ("updates_reported_total", "Update completions recorded", &self.updates_reported),
            ("unauthorized_total", "Requests rejected for bad credentials", &self.unauthorized_requests),
            ("invalid_requests_total", "Requests rejected for bad input", &self.invalid_requests),
            ("conflicts_total", "Duplicate registrations", &self.conflicts),
        ];
        for (name, help, counter) in counters {
            let _ = write!(
                output,
                "# HELP enode_registry_{name} {help}\n\
                 # TYPE enode_registry_{name} counter\n\
                 enode_registry_{name} {}\n\n",
                counter.load(Ordering::Relaxed)
            );
        }

        output
    }
}
