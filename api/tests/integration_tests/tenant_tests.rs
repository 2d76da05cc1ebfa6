//! Integration tests for tenant health and process counters.
//!
//! Tests cover:
//! - Health counts after ingestion, regardless of persist/emit flags
//! - Unknown tenants
//! - Global counters

use axum::http::StatusCode;
use serde_json::json;

use super::common::{get, post_json, test_app};

#[tokio::test]
async fn test_tenant_health_counts_every_severity() {
    let (app, _state) = test_app();

    post_json(
        app.clone(),
        "/api/v1/logs",
        json!([
            {"tenantId": "bot-1", "scope": "s", "level": "warn", "message": "w", "persist": false},
            {"tenantId": "bot-1", "scope": "s", "level": "error", "message": "e", "emit": false},
            {"tenantId": "bot-1", "scope": "s", "level": "critical", "message": "c"},
            {"tenantId": "bot-1", "scope": "s", "level": "info", "message": "i"}
        ]),
    )
    .await;

    let (status, response) = get(app, "/api/v1/tenants/bot-1/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["tenantId"], "bot-1");
    assert_eq!(response["warnings"], 1);
    assert_eq!(response["errors"], 1);
    assert_eq!(response["criticals"], 1);
    assert!(response["lastOccurrence"].is_string());
}

#[tokio::test]
async fn test_unknown_tenant_returns_404() {
    let (app, _state) = test_app();

    let (status, response) = get(app, "/api/v1/tenants/nobody/health").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(response["error"], "tenant_not_found");
}

#[tokio::test]
async fn test_counters_include_platform_entries() {
    let (app, state) = test_app();

    post_json(
        app.clone(),
        "/api/v1/logs",
        json!([
            {"scope": "s", "level": "error", "message": "platform failure"},
            {"tenantId": "bot-9", "scope": "s", "level": "error", "message": "bot failure"}
        ]),
    )
    .await;

    let (_, response) = get(app.clone(), "/api/v1/metrics/counters").await;
    assert_eq!(response["counters"]["errors"], 2);

    let (_, response) = get(app, "/api/v1/tenants/health").await;
    assert_eq!(response["total_count"], 1);
    assert_eq!(response["tenants"][0]["tenantId"], "bot-9");
    assert_eq!(state.tenant_stats().tenant_count(), 1);
}
