//! Wire types (compatible with enode-registry)

use serde::{Deserialize, Serialize};

/// Body of `POST /post-enode`
#[derive(Debug, Clone, Serialize)]
pub struct EnodeRequest<'a> {
    pub enode: &'a str,
}

/// Body of `POST /api/register-validator`
#[derive(Debug, Clone, Serialize)]
pub struct RegisterValidatorRequest<'a> {
    pub validator_address: &'a str,
    pub validator_ip: &'a str,
    pub node_type: &'a str,
}

/// Body of `POST /api/update-complete`
#[derive(Debug, Clone, Serialize)]
pub struct UpdateCompleteRequest<'a> {
    pub validator_address: &'a str,
    pub validator_ip: &'a str,
    pub commit_hash: &'a str,
    pub timestamp: &'a str,
    pub node_type: &'a str,
}

/// Error body returned with 4xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// JSON-RPC request frame
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    pub params: serde_json::Value,
    pub id: u64,
}

/// JSON-RPC response frame
#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcError {
    #[serde(default)]
    pub code: i64,
    pub message: String,
}

/// Subset of `admin_nodeInfo` the agent needs
#[derive(Debug, Clone, Deserialize)]
pub struct NodeInfo {
    pub enode: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IpLookup {
    pub ip: String,
}
