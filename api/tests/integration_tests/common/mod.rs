//! Common test utilities and helpers for integration tests.
//!
//! Provides the test app setup, HTTP request helpers and a stream collector
//! for live log events.

use api::{create_router, AppState};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use shared::broadcast::{LogEvent, Subscription};
use std::sync::{Arc, Mutex};

/// Creates a test router with a fresh in-memory database log.
pub fn test_app() -> (Router, AppState) {
    let state = AppState::with_in_memory_store();
    let router = create_router(state.clone());
    (router, state)
}

/// Subscribes to `tenant` (or `*`) and collects every event it receives.
pub fn collect_events(state: &AppState, tenant: &str) -> (Subscription, Arc<Mutex<Vec<LogEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let subscription = state
        .logger()
        .subscribe(tenant, move |event| sink.lock().unwrap().push(event.clone()))
        .unwrap();
    (subscription, events)
}

/// Sends a POST request with a JSON body and returns the status and parsed body.
pub async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap();
    send(app, request).await
}

/// Sends a GET request and returns the status and parsed body.
pub async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();

    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

    (status, json)
}
