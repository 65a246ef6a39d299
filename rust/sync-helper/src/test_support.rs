//! In-process fakes for the node IPC endpoint and the registry

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, UnixListener};
use tokio::task::JoinHandle;

// =============================================================================
// FAKE NODE
// =============================================================================

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub id: u64,
    pub method: String,
    pub params: Value,
}

type Handler = dyn Fn(&str, &Value) -> Result<Value, (i64, String)> + Send + Sync;

/// Unix-socket JSON-RPC responder living in its own temp directory
pub struct FakeNode {
    dir: TempDir,
    path: PathBuf,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    task: JoinHandle<()>,
}

impl FakeNode {
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&str, &Value) -> Result<Value, (i64, String)> + Send + Sync + 'static,
    {
        let handler: Arc<Handler> = Arc::new(handler);
        Self::spawn(Some(handler))
    }

    /// Accepts connections and reads requests but never answers
    pub fn silent() -> Self {
        Self::spawn(None)
    }

    fn spawn(handler: Option<Arc<Handler>>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geth.ipc");
        let listener = UnixListener::bind(&path).unwrap();
        let calls = Arc::new(Mutex::new(Vec::new()));

        let recorded = calls.clone();
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let handler = handler.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    let (reader, mut writer) = stream.into_split();
                    let mut lines = BufReader::new(reader).lines();
                    while let Ok(Some(line)) = lines.next_line().await {
                        let request: Value = serde_json::from_str(&line).unwrap();
                        let call = RecordedCall {
                            id: request["id"].as_u64().unwrap_or_default(),
                            method: request["method"].as_str().unwrap_or_default().to_string(),
                            params: request["params"].clone(),
                        };
                        recorded.lock().unwrap().push(call.clone());

                        let Some(handler) = handler.as_ref() else {
                            return std::future::pending::<()>().await;
                        };

                        let response = match handler(call.method.as_str(), &call.params) {
                            Ok(result) => json!({"jsonrpc": "2.0", "id": call.id, "result": result}),
                            Err((code, message)) => json!({
                                "jsonrpc": "2.0",
                                "id": call.id,
                                "error": {"code": code, "message": message}
                            }),
                        };
                        let mut frame = response.to_string();
                        frame.push('\n');
                        if writer.write_all(frame.as_bytes()).await.is_err() {
                            return;
                        }
                    }
                });
            }
        });

        Self { dir, path, calls, task }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the socket, used as the node data directory
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(|c| c.method == method).collect()
    }
}

impl Drop for FakeNode {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// =============================================================================
// FAKE REGISTRY
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct RegistryLog {
    pub posted_enodes: Vec<String>,
    pub registrations: Vec<Value>,
    pub updates: Vec<Value>,
}

struct FakeState {
    token: String,
    peers: Mutex<Vec<String>>,
    register_status: Mutex<u16>,
    update_status: Mutex<u16>,
    log: Mutex<RegistryLog>,
}

/// Minimal registry on 127.0.0.1 with scripted status codes
pub struct FakeRegistry {
    pub url: String,
    state: Arc<FakeState>,
    task: JoinHandle<()>,
}

impl FakeRegistry {
    pub async fn start(token: &str) -> Self {
        let state = Arc::new(FakeState {
            token: token.to_string(),
            peers: Mutex::new(Vec::new()),
            register_status: Mutex::new(201),
            update_status: Mutex::new(200),
            log: Mutex::new(RegistryLog::default()),
        });

        let app = Router::new()
            .route("/post-enode", post(fake_post_enode))
            .route("/get-enode", get(fake_get_enode))
            .route("/api/register-validator", post(fake_register))
            .route("/api/update-complete", post(fake_update))
            .with_state(state.clone());

        let (url, task) = serve(app).await;
        Self { url, state, task }
    }

    pub fn log(&self) -> RegistryLog {
        self.state.log.lock().unwrap().clone()
    }

    pub fn set_peers(&self, peers: Vec<String>) {
        *self.state.peers.lock().unwrap() = peers;
    }

    pub fn set_register_status(&self, status: u16) {
        *self.state.register_status.lock().unwrap() = status;
    }

    pub fn set_update_status(&self, status: u16) {
        *self.state.update_status.lock().unwrap() = status;
    }
}

impl Drop for FakeRegistry {
    fn drop(&mut self) {
        self.task.abort();
    }
}

type FakeResponse = (StatusCode, Json<Value>);

fn authorized(state: &FakeState, headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == state.token)
        .unwrap_or(false)
}

fn unauthorized() -> FakeResponse {
    (StatusCode::UNAUTHORIZED, Json(json!({"error": "Unauthorized"})))
}

fn scripted(status: u16) -> FakeResponse {
    let status = StatusCode::from_u16(status).unwrap();
    if status.is_success() {
        (status, Json(json!({"success": true})))
    } else {
        (status, Json(json!({"error": format!("scripted {}", status.as_u16())})))
    }
}

async fn fake_post_enode(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> FakeResponse {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    let enode = body["enode"].as_str().unwrap_or_default().to_string();
    if !(enode.starts_with("enode://") || enode.starts_with("enr:-")) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Invalid enode format. Must start with 'enode://' or 'enr:-'"})),
        );
    }
    state.log.lock().unwrap().posted_enodes.push(enode);
    (StatusCode::OK, Json(json!({"success": true, "message": "Enode added successfully"})))
}

async fn fake_get_enode(State(state): State<Arc<FakeState>>) -> Json<Vec<String>> {
    Json(state.peers.lock().unwrap().clone())
}

async fn fake_register(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> FakeResponse {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    state.log.lock().unwrap().registrations.push(body);
    let status = *state.register_status.lock().unwrap();
    scripted(status)
}

async fn fake_update(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> FakeResponse {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    state.log.lock().unwrap().updates.push(body);
    let status = *state.update_status.lock().unwrap();
    scripted(status)
}

// =============================================================================
// HELPERS
// =============================================================================

/// Serve `app` on an ephemeral local port, returning its base URL
pub async fn serve(app: Router) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let task = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), task)
}

/// URL of a local server that accepts requests and never answers them
pub async fn hanging_url() -> (String, JoinHandle<()>) {
    let app = Router::new().fallback(|| std::future::pending::<StatusCode>());
    serve(app).await
}

/// URL of a local port nobody listens on
pub async fn closed_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}
