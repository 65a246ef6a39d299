//! Node identity
//!
//! A node is either a validator, identified by its account address, or a
//! relay (RPC) node, identified by a short prefix of its enode id. The role
//! comes from marker files next to the IPC socket.

use std::fmt;
use std::path::Path;
use tracing::{debug, info};

use crate::error::IdentityError;
use crate::transport::IpcClient;

pub const VALIDATOR_MARKER: &str = ".validator";
pub const RELAY_MARKER: &str = ".rpc";
pub const ADDRESS_FILE: &str = "address.txt";

const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";
const RELAY_ID_PREFIX: &str = "rpc-";
const RELAY_ID_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Validator,
    Relay,
}

impl NodeRole {
    /// Node type string sent to the registry
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeRole::Validator => "validator",
            NodeRole::Relay => "rpc",
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentity {
    pub role: NodeRole,
    pub address: String,
}

/// `.validator` wins over `.rpc`; no marker means validator
pub fn detect_role(data_dir: &Path) -> NodeRole {
    if data_dir.join(VALIDATOR_MARKER).exists() {
        NodeRole::Validator
    } else if data_dir.join(RELAY_MARKER).exists() {
        NodeRole::Relay
    } else {
        NodeRole::Validator
    }
}

pub fn is_zero_address(address: &str) -> bool {
    address.eq_ignore_ascii_case(ZERO_ADDRESS)
}

/// `rpc-` followed by the first 16 characters of the enode's node id
pub fn relay_identifier(enode: &str) -> Result<String, IdentityError> {
    let node_id = enode
        .strip_prefix("enode://")
        .and_then(|rest| rest.split('@').next())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| IdentityError::MalformedEnode(enode.to_string()))?;

    let short: String = node_id.chars().take(RELAY_ID_LEN).collect();
    Ok(format!("{}{}", RELAY_ID_PREFIX, short))
}

/// Work out the role and registry address of the local node
pub async fn resolve_identity(
    ipc: &IpcClient,
    data_dir: &Path,
) -> Result<NodeIdentity, IdentityError> {
    let role = detect_role(data_dir);

    let address = match role {
        NodeRole::Validator => validator_address(ipc, data_dir).await?,
        NodeRole::Relay => {
            let enode = ipc.enode().await?;
            let identifier = relay_identifier(&enode)?;
            debug!("Generated relay identifier: {}", identifier);
            identifier
        }
    };

    Ok(NodeIdentity { role, address })
}

/// Coinbase, then the first local account, then `address.txt`
async fn validator_address(ipc: &IpcClient, data_dir: &Path) -> Result<String, IdentityError> {
    match ipc.coinbase().await {
        Ok(Some(coinbase)) if !coinbase.is_empty() && !is_zero_address(&coinbase) => {
            debug!("Found validator coinbase address: {}", coinbase);
            return Ok(coinbase);
        }
        Ok(_) => debug!("Coinbase unset"),
        Err(e) => debug!("eth_coinbase failed: {}", e),
    }

    match ipc.accounts().await {
        Ok(accounts) => {
            if let Some(first) = accounts.into_iter().next() {
                debug!("Found validator account address: {}", first);
                return Ok(first);
            }
        }
        Err(e) => debug!("eth_accounts failed: {}", e),
    }

    let path = data_dir.join(ADDRESS_FILE);
    if let Ok(content) = tokio::fs::read_to_string(&path).await {
        let address = content.trim();
        if !address.is_empty() {
            info!("📄 Using validator address from {}", path.display());
            return Ok(address.to_string());
        }
    }

    Err(IdentityError::AddressUnavailable)
}
