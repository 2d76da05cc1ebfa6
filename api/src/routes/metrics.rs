//! Process counters readout.

use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use shared::health::{CRITICALS, ERRORS, WARNINGS};
use std::collections::BTreeMap;

/// Response for the counters endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct CountersResponse {
    /// Counter values by name. The well-known counters are always present.
    pub counters: BTreeMap<String, u64>,
}

/// Creates the metrics routes.
pub fn metrics_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/metrics/counters", get(get_counters))
        .with_state(state)
}

async fn get_counters(State(state): State<AppState>) -> Json<CountersResponse> {
    let mut counters = state.counters().snapshot();
    for name in [WARNINGS, ERRORS, CRITICALS] {
        counters.entry(name.to_string()).or_insert(0);
    }
    Json(CountersResponse { counters })
}
