//! Log ingestion and query endpoints.
//!
//! Ingested entries run through the full logger pipeline, so they are
//! counted, streamed, persisted and printed exactly like entries logged
//! in-process. Queries read the database log.

use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use shared::models::{LogEntry, LogLevel};
use shared::storage::LogQuery;

/// Upper bound of `limit` on log queries.
const MAX_QUERY_LIMIT: usize = 1000;

/// Request body for log ingestion - can be a single log or a batch.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum LogIngestRequest {
    /// A single log entry.
    Single(LogEntryRequest),
    /// A batch of log entries.
    Batch(Vec<LogEntryRequest>),
}

/// A log call as received from the API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntryRequest {
    /// Tenant the entry belongs to (optional, platform-wide when absent).
    #[serde(default)]
    pub tenant_id: Option<String>,

    /// Scope the entry is logged under (required).
    pub scope: String,

    /// Log level (optional, defaults to info).
    #[serde(default)]
    pub level: LogLevel,

    /// Log message (required). A structured value is logged as metadata.
    pub message: serde_json::Value,

    /// Metadata payload (optional).
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,

    /// Persist to the database log (optional, defaults to true).
    #[serde(default)]
    pub persist: Option<bool>,

    /// Publish on the live stream (optional, defaults to true).
    #[serde(default)]
    pub emit: Option<bool>,
}

/// Response for successful log ingestion.
#[derive(Debug, Serialize, Deserialize)]
pub struct LogIngestResponse {
    /// Number of logs accepted.
    pub accepted: usize,
    /// Message describing the result.
    pub message: String,
}

/// Error response for failed log requests.
#[derive(Debug, Serialize, Deserialize)]
pub struct LogError {
    /// Error type.
    pub error: String,
    /// Detailed error message.
    pub message: String,
    /// Validation errors by index (for batch requests).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

/// Validation error detail for a specific log entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Index in the batch (0 for single requests).
    pub index: usize,
    /// Field that failed validation.
    pub field: String,
    /// Error message.
    pub message: String,
}

/// Query parameters for log queries.
#[derive(Debug, Default, Deserialize)]
pub struct LogQueryParams {
    /// Only entries of this tenant.
    pub tenant: Option<String>,
    /// Only entries of this level.
    pub level: Option<LogLevel>,
    /// Only entries of this scope.
    pub scope: Option<String>,
    /// Only entries whose message contains this text (case-insensitive).
    pub contains: Option<String>,
    /// Maximum entries returned, capped at 1000.
    pub limit: Option<usize>,
    /// Entries skipped.
    pub offset: Option<usize>,
}

/// Response for log queries.
#[derive(Debug, Serialize, Deserialize)]
pub struct LogQueryResponse {
    /// Matching entries, oldest first.
    pub logs: Vec<LogEntry>,
    /// Matches before pagination.
    pub total_count: usize,
}

/// Creates the log routes.
pub fn logs_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/logs", post(ingest_logs).get(query_logs))
        .with_state(state)
}

/// Handler for log ingestion.
///
/// Accepts either a single log entry or a batch of log entries.
/// Returns 202 Accepted once every entry went through the logger, 400 Bad
/// Request on validation failure.
async fn ingest_logs(
    State(state): State<AppState>,
    payload: Result<Json<LogIngestRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LogIngestResponse>), (StatusCode, Json<LogError>)> {
    let Json(request) = payload.map_err(|rejection| {
        (
            StatusCode::BAD_REQUEST,
            Json(LogError {
                error: "invalid_json".to_string(),
                message: rejection.body_text(),
                details: None,
            }),
        )
    })?;

    let entries: Vec<LogEntryRequest> = match request {
        LogIngestRequest::Single(entry) => vec![entry],
        LogIngestRequest::Batch(entries) => entries,
    };

    if entries.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(LogError {
                error: "empty_batch".to_string(),
                message: "At least one log entry is required".to_string(),
                details: None,
            }),
        ));
    }

    let validation_errors: Vec<ValidationErrorDetail> = entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| validate(index, entry))
        .collect();

    if !validation_errors.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(LogError {
                error: "validation_failed".to_string(),
                message: format!(
                    "{} log entry/entries failed validation",
                    validation_errors.len()
                ),
                details: Some(validation_errors),
            }),
        ));
    }

    let count = entries.len();
    for entry in entries {
        log_entry(&state, entry);
    }
    tracing::debug!(count, "Accepted log entries");

    Ok((
        StatusCode::ACCEPTED,
        Json(LogIngestResponse {
            accepted: count,
            message: format!(
                "Accepted {} log {}",
                count,
                if count == 1 { "entry" } else { "entries" }
            ),
        }),
    ))
}

fn validate(index: usize, entry: &LogEntryRequest) -> Option<ValidationErrorDetail> {
    let invalid = |field: &str, message: &str| ValidationErrorDetail {
        index,
        field: field.to_string(),
        message: message.to_string(),
    };

    if entry.scope.trim().is_empty() {
        return Some(invalid("scope", "Log scope cannot be empty"));
    }
    if entry.message.is_null() {
        return Some(invalid("message", "Log message cannot be null"));
    }
    match entry.tenant_id.as_deref() {
        Some(tenant) if tenant.trim().is_empty() => {
            Some(invalid("tenantId", "Tenant id cannot be blank"))
        }
        _ => None,
    }
}

fn log_entry(state: &AppState, entry: LogEntryRequest) {
    let logger = state.logger().scoped(entry.scope);
    let mut call = logger.persist(entry.persist.unwrap_or(true));
    if let Some(tenant_id) = entry.tenant_id {
        call = call.for_tenant(tenant_id);
    }
    if let Some(metadata) = entry.metadata {
        call = call.meta(metadata);
    }
    if entry.emit == Some(false) {
        call = call.no_emit();
    }

    match entry.level {
        LogLevel::Debug => call.debug(entry.message),
        LogLevel::Info => call.info(entry.message),
        LogLevel::Warn => call.warn(entry.message),
        LogLevel::Error => call.error(entry.message),
        LogLevel::Critical => call.critical(entry.message),
    }
}

/// Handler for log queries over the database log.
async fn query_logs(
    State(state): State<AppState>,
    Query(params): Query<LogQueryParams>,
) -> Result<Json<LogQueryResponse>, (StatusCode, Json<LogError>)> {
    let mut query = LogQuery::new();

    if let Some(tenant) = params.tenant {
        query = query.with_tenant(tenant);
    }
    if let Some(level) = params.level {
        query = query.with_level(level);
    }
    if let Some(scope) = params.scope {
        query = query.with_scope(scope);
    }
    if let Some(contains) = params.contains {
        query = query.with_message_contains(contains);
    }
    query = query.with_limit(params.limit.unwrap_or(100).min(MAX_QUERY_LIMIT));
    if let Some(offset) = params.offset {
        query = query.with_offset(offset);
    }

    let result = state.log_store().query(query).map_err(|e| {
        tracing::error!(error = %e, "Failed to query logs");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(LogError {
                error: "storage_error".to_string(),
                message: e.to_string(),
                details: None,
            }),
        )
    })?;

    Ok(Json(LogQueryResponse {
        logs: result.logs,
        total_count: result.total_count,
    }))
}
