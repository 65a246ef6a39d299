//! Core types for registry communication
//!
//! These types define the JSON protocol between sync helpers, the dashboard
//! and the registry. Field names on the wire are kept stable because the
//! dashboard and deployed helpers read them verbatim.

use serde::{Deserialize, Serialize};

use crate::registry::RegistryError;

// =============================================================================
// PEER ADDRESSES
// =============================================================================

/// Accepted peer address schemes
pub const ENODE_PREFIX: &str = "enode://";
pub const ENR_PREFIX: &str = "enr:-";

/// A validated peer address ("enode")
///
/// Opaque to the registry beyond its scheme prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerAddress(String);

impl PeerAddress {
    /// Parse a peer address, accepting `enode://...` and `enr:-...`
    pub fn parse(raw: &str) -> Result<Self, RegistryError> {
        if raw.starts_with(ENODE_PREFIX) || raw.starts_with(ENR_PREFIX) {
            Ok(Self(raw.to_string()))
        } else {
            Err(RegistryError::InvalidFormat(
                "Invalid enode format. Must start with 'enode://' or 'enr:-'".to_string(),
            ))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// VALIDATORS
// =============================================================================

/// Value used for unknown IPs and node types
pub const UNKNOWN: &str = "unknown";

/// Rollout status of a validator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidatorStatus {
    /// Registered, no update reported yet
    Pending,

    /// At least one update completion reported
    Completed,
}

/// A tracked validator (or relay) node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorRecord {
    /// Validator address, unique key
    pub address: String,

    /// Last known IP
    pub ip: String,

    pub status: ValidatorStatus,

    /// Server time of record creation (RFC 3339)
    pub registered_at: String,

    /// Client-supplied timestamp of the last reported update
    pub last_update: Option<String>,

    /// Commit hash from the last reported update
    pub commit_hash: Option<String>,

    /// Free-form node type ("validator", "rpc", ...)
    pub node_type: String,
}

/// One reported update completion, immutable once logged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateEvent {
    pub validator_address: String,
    pub validator_ip: String,
    pub commit_hash: String,

    /// Client-supplied completion time
    pub timestamp: String,

    /// Node type exactly as reported (may be absent)
    pub node_type: Option<String>,

    /// Server time the event was recorded
    #[serde(rename = "eventTime")]
    pub event_time: String,
}

// =============================================================================
// VALIDATED COMMANDS
// =============================================================================

/// Validated registration request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewValidator {
    pub address: String,
    pub ip: Option<String>,
    pub node_type: Option<String>,
}

/// Validated update-completion report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    pub address: String,
    pub ip: Option<String>,
    pub commit_hash: String,
    pub timestamp: String,
    pub node_type: Option<String>,
}

// =============================================================================
// REQUEST BODIES
// =============================================================================

/// Body of POST /post-enode
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostEnodeRequest {
    #[serde(default)]
    pub enode: Option<String>,
}

impl PostEnodeRequest {
    pub fn validate(self) -> Result<PeerAddress, RegistryError> {
        let enode = required(self.enode).ok_or_else(|| {
            RegistryError::MissingField("Enode is required".to_string())
        })?;
        PeerAddress::parse(&enode)
    }
}

/// Body of POST /api/register-validator
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterValidatorRequest {
    #[serde(default)]
    pub validator_address: Option<String>,
    #[serde(default)]
    pub validator_ip: Option<String>,
    #[serde(default)]
    pub node_type: Option<String>,
}

impl RegisterValidatorRequest {
    pub fn validate(self) -> Result<NewValidator, RegistryError> {
        let address = required(self.validator_address).ok_or_else(|| {
            RegistryError::MissingField("validator_address is required".to_string())
        })?;

        Ok(NewValidator {
            address,
            ip: required(self.validator_ip),
            node_type: required(self.node_type),
        })
    }
}

/// Body of POST /api/update-complete
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCompleteRequest {
    #[serde(default)]
    pub validator_address: Option<String>,
    #[serde(default)]
    pub validator_ip: Option<String>,
    #[serde(default)]
    pub commit_hash: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub node_type: Option<String>,
}

impl UpdateCompleteRequest {
    pub fn validate(self) -> Result<UpdateReport, RegistryError> {
        match (
            required(self.validator_address),
            required(self.commit_hash),
            required(self.timestamp),
        ) {
            (Some(address), Some(commit_hash), Some(timestamp)) => Ok(UpdateReport {
                address,
                ip: required(self.validator_ip),
                commit_hash,
                timestamp,
                node_type: required(self.node_type),
            }),
            _ => Err(RegistryError::MissingField(
                "Missing required fields: validator_address, commit_hash, timestamp".to_string(),
            )),
        }
    }
}

/// Query string of GET /api/history
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub limit: Option<String>,
}

impl HistoryQuery {
    /// Requested limit, read from the leading digits (`10abc` is 10).
    /// Absent, non-numeric or non-positive values use the default.
    pub fn resolve(&self, default: usize) -> usize {
        self.limit
            .as_deref()
            .and_then(leading_integer)
            .filter(|l| *l > 0)
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(default)
    }
}

/// Optional sign followed by at least one digit, after leading whitespace
fn leading_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits_end == 0 {
        return None;
    }

    let magnitude = rest[..digits_end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

/// Empty strings count as missing
fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

// =============================================================================
// RESPONSE BODIES
// =============================================================================

/// Generic acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
    pub message: String,
}

/// Acknowledgement carrying the affected validator record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorAck {
    pub success: bool,
    pub message: String,
    pub validator: ValidatorRecord,
}

/// GET /api/status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub total_validators: usize,
    pub completed: usize,
    pub pending: usize,
    pub progress_percentage: u32,
    pub last_update: Option<String>,
    pub validators: Vec<ValidatorRecord>,
}

/// GET /api/pending
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSummary {
    pub count: usize,
    pub validators: Vec<ValidatorRecord>,
}

/// GET /api/history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPage {
    pub count: usize,
    pub total_events: usize,
    pub history: Vec<UpdateEvent>,
}

/// GET /health
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: String,
    pub enode_count: usize,
    pub validator_count: usize,
    pub update_history_count: usize,
    pub uptime_secs: u64,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_address_schemes() {
        assert!(PeerAddress::parse("enode://abcd@10.0.0.1:30303").is_ok());
        assert!(PeerAddress::parse("enr:-IS4QHCYrYZbAKW").is_ok());
        assert!(matches!(
            PeerAddress::parse("bad-format"),
            Err(RegistryError::InvalidFormat(_))
        ));
        assert!(PeerAddress::parse("ENODE://abcd").is_err());
    }

    #[test]
    fn test_post_enode_missing_vs_invalid() {
        let empty = PostEnodeRequest { enode: Some(String::new()) };
        assert!(matches!(empty.validate(), Err(RegistryError::MissingField(_))));

        let absent = PostEnodeRequest::default();
        assert!(matches!(absent.validate(), Err(RegistryError::MissingField(_))));

        let bad = PostEnodeRequest { enode: Some("bad-format".to_string()) };
        assert!(matches!(bad.validate(), Err(RegistryError::InvalidFormat(_))));
    }

    #[test]
    fn test_update_request_requires_all_core_fields() {
        let req: UpdateCompleteRequest = serde_json::from_value(serde_json::json!({
            "validator_address": "0xAA",
            "commit_hash": "deadbeef",
        }))
        .unwrap();
        assert!(matches!(req.validate(), Err(RegistryError::MissingField(_))));

        let req: UpdateCompleteRequest = serde_json::from_value(serde_json::json!({
            "validator_address": "0xAA",
            "commit_hash": "deadbeef",
            "timestamp": "2024-01-01T00:00:00Z",
            "validator_ip": "",
        }))
        .unwrap();
        let report = req.validate().unwrap();
        assert_eq!(report.ip, None);
        assert_eq!(report.node_type, None);
    }

    #[test]
    fn test_history_limit_resolution() {
        let q = |l: Option<&str>| HistoryQuery { limit: l.map(str::to_string) };
        assert_eq!(q(None).resolve(50), 50);
        assert_eq!(q(Some("10")).resolve(50), 10);
        assert_eq!(q(Some("0")).resolve(50), 50);
        assert_eq!(q(Some("-3")).resolve(50), 50);
        assert_eq!(q(Some("abc")).resolve(50), 50);
        assert_eq!(q(Some("10abc")).resolve(50), 10);
        assert_eq!(q(Some(" 7")).resolve(50), 7);
        assert_eq!(q(Some("+4")).resolve(50), 4);
        assert_eq!(q(Some("-")).resolve(50), 50);
        assert_eq!(q(Some("-2x")).resolve(50), 50);
    }

    #[test]
    fn test_validator_record_wire_format() {
        let record = ValidatorRecord {
            address: "0xAA".to_string(),
            ip: UNKNOWN.to_string(),
            status: ValidatorStatus::Pending,
            registered_at: "2024-01-01T00:00:00Z".to_string(),
            last_update: None,
            commit_hash: None,
            node_type: "validator".to_string(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "PENDING");
        assert_eq!(json["registeredAt"], "2024-01-01T00:00:00Z");
        assert!(json["lastUpdate"].is_null());
        assert_eq!(json["nodeType"], "validator");
    }
}
