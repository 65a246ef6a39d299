//! API Routes
//!
//! HTTP endpoints for enode exchange, validator tracking and health.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{header, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use super::auth;
use super::error::ApiError;
use super::Metrics;
use crate::config::RegistryConfig;
use crate::registry::{self, Registry, RegistryError};
use crate::types::{
    Ack, HealthReport, HistoryQuery, PostEnodeRequest, RegisterValidatorRequest,
    UpdateCompleteRequest, ValidatorAck,
};

/// Shared API state
pub struct ApiState {
    pub config: Arc<RegistryConfig>,
    pub registry: Arc<RwLock<Registry>>,
    pub metrics: Arc<Metrics>,
}

/// Build the router with all endpoints
pub fn router(state: Arc<ApiState>) -> Router {
    let protected = Router::new()
        .route("/post-enode", post(post_enode))
        .route("/api/register-validator", post(register_validator))
        .route("/api/update-complete", post(update_complete))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_token,
        ));

    Router::new()
        // Peer discovery
        .route("/get-enode", get(get_enodes))
        .route("/get-enodes-public", get(get_enodes))

        // Rollout tracking
        .route("/api/status", get(get_status))
        .route("/api/pending", get(get_pending))
        .route("/api/history", get(get_history))

        // Health & metrics
        .route("/health", get(health_check))
        .route("/metrics", get(get_metrics_prometheus))

        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run the HTTP API server
pub async fn run_api_server(
    config: Arc<RegistryConfig>,
    registry: Arc<RwLock<Registry>>,
    metrics: Arc<Metrics>,
) -> anyhow::Result<()> {
    let addr = SocketAddr::new(config.bind_address, config.api_port);
    let state = Arc::new(ApiState {
        config,
        registry,
        metrics,
    });

    let app = router(state);

    info!("🌐 Enode API server listening on {}", addr);
    info!("   Health check: http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Unwrap a JSON body, turning parse failures into validation errors
fn body<T>(state: &ApiState, payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(inner)| inner)
        .map_err(|rejection| {
            state.metrics.inc_invalid();
            ApiError::Validation(rejection.body_text())
        })
}

/// Count a rejected command and convert it for the response
fn rejected(state: &ApiState, err: RegistryError) -> ApiError {
    match err {
        RegistryError::Conflict(_) => state.metrics.inc_conflicts(),
        _ => state.metrics.inc_invalid(),
    }
    err.into()
}

/// POST /post-enode - Announce a peer address
async fn post_enode(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<PostEnodeRequest>, JsonRejection>,
) -> Result<Json<Ack>, ApiError> {
    let peer = body(&state, payload)?
        .validate()
        .map_err(|e| rejected(&state, e))?;

    state.registry.write().await.add_peer(peer);
    state.metrics.inc_enodes_posted();

    Ok(Json(Ack {
        success: true,
        message: "Enode added successfully".to_string(),
    }))
}

/// GET /get-enode, GET /get-enodes-public - Current peer list
async fn get_enodes(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let peers = state.registry.read().await.list_peers();
    Json(peers)
}

/// POST /api/register-validator - Start tracking a validator
async fn register_validator(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<RegisterValidatorRequest>, JsonRejection>,
) -> Result<Json<ValidatorAck>, ApiError> {
    let validator = body(&state, payload)?
        .validate()
        .map_err(|e| rejected(&state, e))?;

    let record = state
        .registry
        .write()
        .await
        .register_validator(validator)
        .map_err(|e| rejected(&state, e))?;
    state.metrics.inc_validators_registered();

    Ok(Json(ValidatorAck {
        success: true,
        message: "Validator registered successfully".to_string(),
        validator: record,
    }))
}

/// POST /api/update-complete - Record an applied update
async fn update_complete(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<UpdateCompleteRequest>, JsonRejection>,
) -> Result<Json<ValidatorAck>, ApiError> {
    let report = body(&state, payload)?
        .validate()
        .map_err(|e| rejected(&state, e))?;

    let record = state.registry.write().await.report_update(report);
    state.metrics.inc_updates_reported();

    Ok(Json(ValidatorAck {
        success: true,
        message: "Update completion recorded successfully".to_string(),
        validator: record,
    }))
}

/// GET /api/status - Rollout progress across all validators
async fn get_status(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(state.registry.read().await.status())
}

/// GET /api/pending - Validators that have not reported yet
async fn get_pending(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(state.registry.read().await.pending())
}

/// GET /api/history?limit=N - Most recent update events, newest first
async fn get_history(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<HistoryQuery>,
) -> impl IntoResponse {
    let limit = query.resolve(state.config.default_history_limit);
    Json(state.registry.read().await.history(limit))
}

/// GET /health - Liveness counters
async fn health_check(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let stats = state.registry.read().await.stats();

    Json(HealthReport {
        status: "healthy".to_string(),
        enode_count: stats.enode_count,
        validator_count: stats.validator_count,
        update_history_count: stats.update_history_count,
        uptime_secs: state.metrics.uptime_secs(),
        timestamp: registry::now(),
    })
}

/// GET /metrics - Prometheus format metrics
async fn get_metrics_prometheus(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let stats = state.registry.read().await.stats();

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.metrics.to_prometheus(&stats),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const TOKEN: &str = "private-network-test-token";

    fn test_app() -> (Router, Arc<RwLock<Registry>>) {
        let config = RegistryConfig::default().with_access_token(Some(TOKEN.to_string()));
        let registry = Arc::new(RwLock::new(Registry::from_config(&config)));
        let state = Arc::new(ApiState {
            config: Arc::new(config),
            registry: registry.clone(),
            metrics: Arc::new(Metrics::new()),
        });
        (router(state), registry)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn post_json(path: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, token);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_req(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_post_enode_requires_token() {
        let (app, _) = test_app();
        let enode = "enode://abcd@10.0.0.1:30303";

        let (status, body) = send(&app, post_json("/post-enode", None, json!({ "enode": enode }))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Unauthorized");

        let (status, _) =
            send(&app, post_json("/post-enode", Some("wrong"), json!({ "enode": enode }))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (_, peers) = send(&app, get_req("/get-enode")).await;
        assert_eq!(peers, json!([]));
    }

    #[tokio::test]
    async fn test_post_and_list_enodes() {
        let (app, _) = test_app();
        let enode = "enode://abcd@10.0.0.1:30303";

        for _ in 0..2 {
            let (status, body) =
                send(&app, post_json("/post-enode", Some(TOKEN), json!({ "enode": enode }))).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["success"], true);
        }

        let (status, peers) = send(&app, get_req("/get-enode")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(peers, json!([enode]));

        let (_, public) = send(&app, get_req("/get-enodes-public")).await;
        assert_eq!(public, peers);
    }

    #[tokio::test]
    async fn test_bad_enode_format_rejected() {
        let (app, _) = test_app();

        let (status, body) =
            send(&app, post_json("/post-enode", Some(TOKEN), json!({ "enode": "bad-format" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Invalid enode format"));

        let (status, _) = send(&app, post_json("/post-enode", Some(TOKEN), json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, peers) = send(&app, get_req("/get-enode")).await;
        assert_eq!(peers, json!([]));
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let (app, _) = test_app();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/register-validator")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, TOKEN)
            .body(Body::from("{not json"))
            .unwrap();

        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_register_then_report_flow() {
        let (app, _) = test_app();

        let (status, body) = send(
            &app,
            post_json(
                "/api/register-validator",
                Some(TOKEN),
                json!({ "validator_address": "0xAA", "validator_ip": "1.2.3.4", "node_type": "validator" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["validator"]["status"], "PENDING");

        let (_, status_body) = send(&app, get_req("/api/status")).await;
        assert_eq!(status_body["total_validators"], 1);
        assert_eq!(status_body["completed"], 0);
        assert_eq!(status_body["progress_percentage"], 0);
        assert!(status_body["last_update"].is_null());

        let (_, pending) = send(&app, get_req("/api/pending")).await;
        assert_eq!(pending["count"], 1);

        let (status, body) = send(
            &app,
            post_json(
                "/api/update-complete",
                Some(TOKEN),
                json!({
                    "validator_address": "0xAA",
                    "commit_hash": "deadbeef",
                    "timestamp": "2024-01-01T00:00:00Z",
                    "node_type": "validator",
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["validator"]["status"], "COMPLETED");
        assert_eq!(body["validator"]["ip"], "1.2.3.4");

        let (_, status_body) = send(&app, get_req("/api/status")).await;
        assert_eq!(status_body["completed"], 1);
        assert_eq!(status_body["pending"], 0);
        assert_eq!(status_body["progress_percentage"], 100);
        assert_eq!(status_body["last_update"], "2024-01-01T00:00:00Z");
        assert_eq!(status_body["validators"][0]["commitHash"], "deadbeef");

        let (_, history) = send(&app, get_req("/api/history")).await;
        assert_eq!(history["count"], 1);
        assert_eq!(history["total_events"], 1);
        assert_eq!(history["history"][0]["commit_hash"], "deadbeef");
        assert!(history["history"][0]["eventTime"].is_string());
    }

    #[tokio::test]
    async fn test_duplicate_registration_conflict() {
        let (app, _) = test_app();
        let body = json!({ "validator_address": "0xAA" });

        let (status, _) =
            send(&app, post_json("/api/register-validator", Some(TOKEN), body.clone())).await;
        assert_eq!(status, StatusCode::OK);

        let (status, err) =
            send(&app, post_json("/api/register-validator", Some(TOKEN), body)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(err["error"], "Validator already registered");
    }

    #[tokio::test]
    async fn test_update_missing_fields() {
        let (app, registry) = test_app();

        let (status, _) = send(
            &app,
            post_json(
                "/api/update-complete",
                Some(TOKEN),
                json!({ "validator_address": "0xAA", "commit_hash": "deadbeef" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(registry.read().await.stats().update_history_count, 0);
    }

    #[tokio::test]
    async fn test_history_limit_query() {
        let (app, _) = test_app();
        for i in 0..5 {
            send(
                &app,
                post_json(
                    "/api/update-complete",
                    Some(TOKEN),
                    json!({
                        "validator_address": format!("0x{:02}", i),
                        "commit_hash": format!("c{}", i),
                        "timestamp": "2024-01-01T00:00:00Z",
                    }),
                ),
            )
            .await;
        }

        let (_, history) = send(&app, get_req("/api/history?limit=2")).await;
        assert_eq!(history["count"], 2);
        assert_eq!(history["total_events"], 5);
        assert_eq!(history["history"][0]["commit_hash"], "c4");
        assert_eq!(history["history"][1]["commit_hash"], "c3");

        let (_, history) = send(&app, get_req("/api/history?limit=zero")).await;
        assert_eq!(history["count"], 5);
    }

    #[tokio::test]
    async fn test_health_and_metrics() {
        let (app, registry) = test_app();
        registry
            .write()
            .await
            .add_peer(crate::types::PeerAddress::parse("enr:-abc").unwrap());

        let (status, health) = send(&app, get_req("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health["status"], "healthy");
        assert_eq!(health["enodeCount"], 1);
        assert_eq!(health["validatorCount"], 0);
        assert_eq!(health["updateHistoryCount"], 0);

        let response = app.clone().oneshot(get_req("/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("enode_registry_enodes 1"));
    }

    #[tokio::test]
    async fn test_concurrent_reports_all_recorded() {
        let (app, registry) = test_app();

        let mut handles = Vec::new();
        for i in 0..20 {
            let app = app.clone();
            handles.push(tokio::spawn(async move {
                send(
                    &app,
                    post_json(
                        "/api/update-complete",
                        Some(TOKEN),
                        json!({
                            "validator_address": format!("0x{:02}", i % 4),
                            "commit_hash": format!("c{}", i),
                            "timestamp": "2024-01-01T00:00:00Z",
                        }),
                    ),
                )
                .await
                .0
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), StatusCode::OK);
        }

        let reg = registry.read().await;
        assert_eq!(reg.stats().validator_count, 4);
        assert_eq!(reg.stats().update_history_count, 20);
        assert_eq!(reg.status().progress_percentage, 100);
    }
}
