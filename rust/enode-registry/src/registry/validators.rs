//! Validator Directory
//!
//! Insertion-ordered map of validator records keyed by address.

use indexmap::IndexMap;
use tracing::debug;

use super::RegistryError;
use crate::types::{NewValidator, UpdateReport, ValidatorRecord, ValidatorStatus, UNKNOWN};

#[derive(Debug, Clone, Default)]
pub struct ValidatorDirectory {
    records: IndexMap<String, ValidatorRecord>,
}

impl ValidatorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a PENDING record; fails if the address is already tracked
    pub fn register(
        &mut self,
        validator: NewValidator,
        now: &str,
    ) -> Result<ValidatorRecord, RegistryError> {
        if self.records.contains_key(&validator.address) {
            return Err(RegistryError::Conflict(
                "Validator already registered".to_string(),
            ));
        }

        let record = ValidatorRecord {
            address: validator.address.clone(),
            ip: validator.ip.unwrap_or_else(|| UNKNOWN.to_string()),
            status: ValidatorStatus::Pending,
            registered_at: now.to_string(),
            last_update: None,
            commit_hash: None,
            node_type: validator.node_type.unwrap_or_else(|| UNKNOWN.to_string()),
        };

        self.records.insert(validator.address, record.clone());
        Ok(record)
    }

    /// Mark a validator COMPLETED, creating it first if unseen
    ///
    /// Last write wins: no ordering check against the previous timestamp.
    pub fn apply_report(&mut self, report: &UpdateReport, now: &str) -> ValidatorRecord {
        let record = self
            .records
            .entry(report.address.clone())
            .or_insert_with(|| {
                debug!("Creating record for unregistered validator {}", report.address);
                ValidatorRecord {
                    address: report.address.clone(),
                    ip: UNKNOWN.to_string(),
                    status: ValidatorStatus::Pending,
                    registered_at: now.to_string(),
                    last_update: None,
                    commit_hash: None,
                    node_type: UNKNOWN.to_string(),
                }
            });

        record.status = ValidatorStatus::Completed;
        record.last_update = Some(report.timestamp.clone());
        record.commit_hash = Some(report.commit_hash.clone());
        record.node_type = report
            .node_type
            .clone()
            .unwrap_or_else(|| UNKNOWN.to_string());
        if let Some(ip) = &report.ip {
            record.ip = ip.clone();
        }

        record.clone()
    }

    #[cfg(test)]
    pub fn get(&self, address: &str) -> Option<&ValidatorRecord> {
        self.records.get(address)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidatorRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}
