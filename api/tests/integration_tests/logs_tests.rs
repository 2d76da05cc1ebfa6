//! Integration tests for log ingestion and querying.
//!
//! Tests cover:
//! - Single and batch ingestion through the logger pipeline
//! - Filtering by tenant, level, scope and message content
//! - Pagination
//! - Live stream delivery and tenant isolation

use axum::http::StatusCode;
use serde_json::json;

use super::common::{collect_events, get, post_json, test_app};

#[tokio::test]
async fn test_ingest_and_query_single_log() {
    let (app, _state) = test_app();

    let log = json!({
        "tenantId": "bot-1",
        "scope": "dialog",
        "level": "error",
        "message": "Database connection failed",
        "metadata": {"errorCode": "CONN_TIMEOUT", "retryCount": 3}
    });

    let (status, response) = post_json(app.clone(), "/api/v1/logs", log).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(response["accepted"], 1);

    let (status, response) = get(app, "/api/v1/logs").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["total_count"], 1);

    let logs = response["logs"].as_array().unwrap();
    assert_eq!(logs[0]["tenantId"], "bot-1");
    assert_eq!(logs[0]["level"], "error");
    assert_eq!(logs[0]["scope"], "dialog");
    assert_eq!(logs[0]["message"], "Database connection failed");
    assert_eq!(logs[0]["metadata"], "{ errorCode: 'CONN_TIMEOUT', retryCount: 3 }");
    assert!(logs[0]["hostname"].as_str().is_some_and(|h| !h.is_empty()));
    assert!(logs[0]["timestamp"].is_string());
}

#[tokio::test]
async fn test_ingest_batch_and_filter() {
    let (app, _state) = test_app();

    let logs = json!([
        {"tenantId": "bot-1", "scope": "nlu", "level": "info", "message": "Model trained"},
        {"tenantId": "bot-1", "scope": "nlu", "level": "warn", "message": "Training slow"},
        {"tenantId": "bot-2", "scope": "dialog", "level": "error", "message": "Flow missing"},
        {"scope": "server", "level": "info", "message": "Server started"}
    ]);
    let (status, response) = post_json(app.clone(), "/api/v1/logs", logs).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(response["accepted"], 4);

    let (_, response) = get(app.clone(), "/api/v1/logs?tenant=bot-1").await;
    assert_eq!(response["total_count"], 2);

    let (_, response) = get(app.clone(), "/api/v1/logs?level=error").await;
    assert_eq!(response["total_count"], 1);
    assert_eq!(response["logs"][0]["tenantId"], "bot-2");

    let (_, response) = get(app.clone(), "/api/v1/logs?scope=server").await;
    assert_eq!(response["total_count"], 1);
    assert!(response["logs"][0].get("tenantId").is_none());

    let uri = format!("/api/v1/logs?contains={}", urlencoding::encode("TRAINING SLOW"));
    let (_, response) = get(app, &uri).await;
    assert_eq!(response["total_count"], 1);
    assert_eq!(response["logs"][0]["level"], "warn");
}

#[tokio::test]
async fn test_query_pagination() {
    let (app, _state) = test_app();
    for i in 0..5 {
        post_json(
            app.clone(),
            "/api/v1/logs",
            json!({"scope": "paging", "message": format!("entry {i}")}),
        )
        .await;
    }

    let (_, response) = get(app, "/api/v1/logs?limit=2&offset=1").await;
    assert_eq!(response["total_count"], 5);
    let logs = response["logs"].as_array().unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0]["message"], "entry 1");
    assert_eq!(logs[1]["message"], "entry 2");
}

#[tokio::test]
async fn test_debug_and_unpersisted_entries_skip_the_database_log() {
    let (app, _state) = test_app();

    post_json(
        app.clone(),
        "/api/v1/logs",
        json!([
            {"scope": "s", "level": "debug", "message": "noise"},
            {"scope": "s", "level": "warn", "message": "transient", "persist": false},
            {"scope": "s", "level": "info", "message": "kept"}
        ]),
    )
    .await;

    let (_, response) = get(app, "/api/v1/logs").await;
    assert_eq!(response["total_count"], 1);
    assert_eq!(response["logs"][0]["message"], "kept");
}

#[tokio::test]
async fn test_stream_delivers_by_tenant() {
    let (app, state) = test_app();
    let (_all, all_events) = collect_events(&state, "*");
    let (_bot1, bot1_events) = collect_events(&state, "bot-1");

    post_json(
        app,
        "/api/v1/logs",
        json!([
            {"tenantId": "bot-1", "scope": "s", "message": "for bot-1"},
            {"tenantId": "bot-2", "scope": "s", "message": "for bot-2"},
            {"scope": "s", "message": "platform"},
            {"tenantId": "bot-1", "scope": "s", "message": "silent", "emit": false}
        ]),
    )
    .await;

    let all: Vec<_> = all_events
        .lock()
        .unwrap()
        .iter()
        .map(|e| e.message.clone())
        .collect();
    assert_eq!(all, vec!["for bot-1", "for bot-2", "platform"]);

    let bot1 = bot1_events.lock().unwrap();
    assert_eq!(bot1.len(), 1);
    assert_eq!(bot1[0].namespace, "logs::bot-1");
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() {
    let (app, _state) = test_app();

    let (status, response) = post_json(
        app.clone(),
        "/api/v1/logs",
        json!({"scope": "", "message": "x"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "validation_failed");

    let (status, _) = post_json(app.clone(), "/api/v1/logs", json!({"message": "no scope"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(app, "/api/v1/logs?level=loud").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
