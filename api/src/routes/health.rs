//! Health check endpoint.
//!
//! Reports liveness plus the state of the logging pipeline: live stream
//! listeners and entries dropped by full persister queues.

use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::collections::BTreeMap;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status (always "healthy" if reachable).
    pub status: &'static str,
    /// Service name.
    pub service: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Registered log stream listeners.
    pub listeners: usize,
    /// Entries dropped per persister since startup.
    pub dropped_entries: BTreeMap<String, u64>,
}

/// Creates the health check routes.
pub fn health_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "tenantlog-api",
        version: env!("CARGO_PKG_VERSION"),
        listeners: state.logger().broadcaster().listener_count(),
        dropped_entries: state.dropped_entries().into_iter().collect(),
    })
}
