//! Integration tests for health check and general API functionality.
//!
//! Tests cover:
//! - Health check endpoint
//! - Empty state behavior

use axum::http::StatusCode;

use super::common::{collect_events, get, test_app};

#[tokio::test]
async fn test_health_check() {
    let (app, _state) = test_app();

    let (status, response) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["status"], "healthy");
    assert_eq!(response["service"], "tenantlog-api");
}

#[tokio::test]
async fn test_health_reports_stream_listeners() {
    let (app, state) = test_app();
    let (first, _) = collect_events(&state, "*");
    let (_second, _) = collect_events(&state, "bot-1");

    let (_, response) = get(app.clone(), "/health").await;
    assert_eq!(response["listeners"], 2);

    first.dispose();
    let (_, response) = get(app, "/health").await;
    assert_eq!(response["listeners"], 1);
}

#[tokio::test]
async fn test_empty_state_returns_empty_results() {
    let (app, _state) = test_app();

    let (status, response) = get(app.clone(), "/api/v1/logs").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["total_count"], 0);
    assert!(response["logs"].as_array().unwrap().is_empty());

    let (status, response) = get(app.clone(), "/api/v1/tenants/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["total_count"], 0);

    let (status, response) = get(app, "/api/v1/metrics/counters").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["counters"]["warnings"], 0);
    assert_eq!(response["counters"]["errors"], 0);
    assert_eq!(response["counters"]["criticals"], 0);
}
