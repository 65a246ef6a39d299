//! Node IPC client
//!
//! JSON-RPC 2.0 over the node's Unix socket. Every call opens its own
//! connection, writes one newline-terminated request and reads the first
//! response line back.

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tracing::debug;

use crate::error::TransportError;
use crate::types::{JsonRpcRequest, JsonRpcResponse, NodeInfo};

/// JSON-RPC client for the local node
pub struct IpcClient {
    path: PathBuf,
    timeout: Duration,
    request_id: AtomicU64,
}

impl IpcClient {
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
            request_id: AtomicU64::new(1),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the socket path exists yet
    pub fn endpoint_exists(&self) -> bool {
        self.path.exists()
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Make a JSON-RPC call, bounded by the client timeout
    pub async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, TransportError> {
        match tokio::time::timeout(self.timeout, self.exchange(method, params)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.timeout)),
        }
    }

    /// Call and decode the result into `T`
    pub async fn call_as<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, TransportError> {
        let value = self.call(method, params).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn exchange(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, TransportError> {
        let stream = UnixStream::connect(&self.path)
            .await
            .map_err(|source| TransportError::Connect {
                path: self.path.clone(),
                source,
            })?;

        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id(),
        };
        let mut frame = serde_json::to_vec(&request)?;
        frame.push(b'\n');

        let (reader, mut writer) = stream.into_split();
        writer.write_all(&frame).await?;
        writer.flush().await?;

        let mut line = String::new();
        let read = BufReader::new(reader).read_line(&mut line).await?;
        if read == 0 {
            return Err(TransportError::Closed);
        }

        let response: JsonRpcResponse = serde_json::from_str(line.trim_end())?;
        if let Some(error) = response.error {
            debug!("{} failed: {} ({})", method, error.message, error.code);
            return Err(TransportError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        Ok(response.result.unwrap_or(serde_json::Value::Null))
    }

    // === Typed helpers ===

    pub async fn node_info(&self) -> Result<NodeInfo, TransportError> {
        self.call_as("admin_nodeInfo", serde_json::json!([])).await
    }

    /// The node's own enode URL
    pub async fn enode(&self) -> Result<String, TransportError> {
        Ok(self.node_info().await?.enode)
    }

    /// Ask the node to dial `enode`; true if the node accepted it
    pub async fn add_peer(&self, enode: &str) -> Result<bool, TransportError> {
        self.call_as("admin_addPeer", serde_json::json!([enode])).await
    }

    /// Mining beneficiary, `None` when unset
    pub async fn coinbase(&self) -> Result<Option<String>, TransportError> {
        self.call_as("eth_coinbase", serde_json::json!([])).await
    }

    pub async fn accounts(&self) -> Result<Vec<String>, TransportError> {
        let accounts: Option<Vec<String>> =
            self.call_as("eth_accounts", serde_json::json!([])).await?;
        Ok(accounts.unwrap_or_default())
    }
}
