//! HTTP API Module
//!
//! Exposes the registry over HTTP: enode exchange for sync helpers,
//! validator rollout tracking for the dashboard, health and metrics.

mod auth;
mod error;
mod metrics;
mod routes;

pub use metrics::Metrics;
pub use routes::run_api_server;
