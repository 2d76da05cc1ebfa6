//! Tenant health readout.

use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use shared::health::TenantHealthSnapshot;

/// Health of every tenant seen so far.
#[derive(Debug, Serialize, Deserialize)]
pub struct TenantHealthListResponse {
    /// Per-tenant counts, sorted by tenant id.
    pub tenants: Vec<TenantHealthSnapshot>,
    /// Number of tenants.
    pub total_count: usize,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct TenantError {
    /// Error type.
    pub error: String,
    /// Detailed error message.
    pub message: String,
}

/// Creates the tenant health routes.
pub fn tenant_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/tenants/health", get(list_tenant_health))
        .route("/api/v1/tenants/{tenant_id}/health", get(get_tenant_health))
        .with_state(state)
}

async fn list_tenant_health(State(state): State<AppState>) -> Json<TenantHealthListResponse> {
    let tenants = state.tenant_stats().snapshot();
    Json(TenantHealthListResponse {
        total_count: tenants.len(),
        tenants,
    })
}

async fn get_tenant_health(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> Result<Json<TenantHealthSnapshot>, (StatusCode, Json<TenantError>)> {
    state.tenant_stats().get(&tenant_id).map(Json).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(TenantError {
                error: "tenant_not_found".to_string(),
                message: format!("No health statistics for tenant {tenant_id}"),
            }),
        )
    })
}
