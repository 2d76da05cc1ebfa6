//! Message formatting for the logger pipeline.
//!
//! Everything here is pure: it takes values and returns strings, so every
//! rule can be tested without sinks.

use crate::models::{AttachedError, HttpError, LogLevel, ResponseBody};
use crate::text::{fixed_width, truncate_chars};
use chrono::{DateTime, TimeZone};
use colored::Color;
use serde_json::{Map, Value};
use std::fmt::Display;

/// Message used when a call logs a structured value instead of text.
pub const STRUCTURED_PLACEHOLDER: &str = "(object)";

/// Console timestamp format, e.g. `10/17/26 14:03:27.512`.
pub const TIME_FORMAT: &str = "%m/%d/%y %H:%M:%S%.3f";

/// Scope width when fixed-width scopes are enabled.
pub const SCOPE_WIDTH: usize = 15;

/// Longest response detail kept in an HTTP error line.
pub const DETAIL_MAX_CHARS: usize = 100;

/// Marker appended to a cut response detail.
pub const DETAIL_ELLIPSIS: &str = " (...)";

/// Header line between a message and the attached stack trace.
pub const STACK_TRACE_HEADER: &str = "STACK TRACE";

/// Nesting levels rendered before objects collapse to `[Object]`.
pub const METADATA_DEPTH: usize = 2;

const BREAK_LENGTH: usize = 72;

/// Response body fields searched for a human readable error, most specific first.
const DETAIL_PATHS: [&str; 10] = [
    "/error/message",
    "/error/description",
    "/error/reason",
    "/error_message",
    "/error_description",
    "/error_reason",
    "/error",
    "/description",
    "/message",
    "/reason",
];

/// Name shown in the scope column.
#[must_use]
pub fn display_name(scope: &str, fixed: bool) -> String {
    if fixed {
        fixed_width(scope, SCOPE_WIDTH)
    } else {
        scope.to_string()
    }
}

/// Formats the console time column.
#[must_use]
pub fn format_time<Tz>(time: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    time.format(TIME_FORMAT).to_string()
}

/// Appends the description of an attached error to `message`.
///
/// Plain errors are appended inline as ` [name, message]`. HTTP errors add
/// one line per detail: the request, its parameters, the response detail and
/// finally the error message.
pub fn enrich_message(message: &mut String, error: &AttachedError) {
    match error {
        AttachedError::Plain(plain) => {
            message.push_str(&format!(" [{}, {}]", plain.name, plain.message));
        }
        AttachedError::Http(http) => enrich_http(message, http),
    }
}

fn enrich_http(message: &mut String, http: &HttpError) {
    message.push_str(&format!("\nHTTP ({}) URL {}", http.method, http.url));
    if !http.params.is_empty() {
        let params = Value::Object(http.params.clone());
        message.push_str(&format!("\nParams ({params})"));
    }
    if let Some(detail) = http.body.as_ref().and_then(response_detail) {
        message.push_str(&format!("\nReceived \"{detail}\""));
    }
    message.push('\n');
    message.push_str(&http.message);
}

/// Extracts the human readable part of an error response body.
///
/// Text bodies are used as-is. JSON bodies contribute every non-empty
/// scalar found at the well-known error paths, joined with `. `. The result
/// is trimmed and cut to [`DETAIL_MAX_CHARS`] characters plus
/// [`DETAIL_ELLIPSIS`] when it reaches that length.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use shared::logger::format::response_detail;
/// use shared::models::ResponseBody;
///
/// let body = ResponseBody::Json(json!({"error": "token expired"}));
/// assert_eq!(response_detail(&body).as_deref(), Some("token expired"));
/// ```
#[must_use]
pub fn response_detail(body: &ResponseBody) -> Option<String> {
    let raw = match body {
        ResponseBody::Text(text) => text.clone(),
        ResponseBody::Json(Value::String(text)) => text.clone(),
        ResponseBody::Json(value) => DETAIL_PATHS
            .iter()
            .filter_map(|path| value.pointer(path).and_then(scalar_text))
            .collect::<Vec<_>>()
            .join(". "),
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.chars().count() >= DETAIL_MAX_CHARS {
        Some(format!(
            "{}{DETAIL_ELLIPSIS}",
            truncate_chars(trimmed, DETAIL_MAX_CHARS)
        ))
    } else {
        Some(trimmed.to_string())
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

/// Serializes a metadata payload for display.
///
/// Arrays are serialized element by element and joined with `, `; objects
/// are rendered inspect-style down to [`METADATA_DEPTH`] levels; strings are
/// trimmed; `null`, `false`, `0` and empty values render empty.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use shared::logger::format::serialize_metadata;
///
/// assert_eq!(serialize_metadata(&json!(["a", {"x": 1}, "b"])), "a, { x: 1 }, b");
/// assert_eq!(serialize_metadata(&json!(null)), "");
/// ```
#[must_use]
pub fn serialize_metadata(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .map(serialize_metadata)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => inspect(value, 0, 0),
        Value::String(s) => s.trim().to_string(),
        Value::Bool(true) => "true".to_string(),
        Value::Number(n) if n.as_f64() != Some(0.0) => n.to_string(),
        Value::Null | Value::Bool(false) | Value::Number(_) => String::new(),
    }
}

fn inspect(value: &Value, depth: usize, indent: usize) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Array(items) if items.is_empty() => "[]".to_string(),
        Value::Array(_) if depth > METADATA_DEPTH => "[Array]".to_string(),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .map(|item| inspect(item, depth + 1, indent + 2))
                .collect();
            wrap('[', ']', &parts, indent)
        }
        Value::Object(map) if map.is_empty() => "{}".to_string(),
        Value::Object(_) if depth > METADATA_DEPTH => "[Object]".to_string(),
        Value::Object(map) => wrap('{', '}', &inspect_entries(map, depth, indent), indent),
    }
}

fn inspect_entries(map: &Map<String, Value>, depth: usize, indent: usize) -> Vec<String> {
    map.iter()
        .map(|(key, value)| {
            format!(
                "{}: {}",
                inspect_key(key),
                inspect(value, depth + 1, indent + 2)
            )
        })
        .collect()
}

fn wrap(open: char, close: char, parts: &[String], indent: usize) -> String {
    let single = format!("{open} {} {close}", parts.join(", "));
    if indent + single.len() <= BREAK_LENGTH && !single.contains('\n') {
        return single;
    }
    let pad = " ".repeat(indent + 2);
    format!(
        "{open}\n{pad}{}\n{}{close}",
        parts.join(&format!(",\n{pad}")),
        " ".repeat(indent)
    )
}

fn inspect_key(key: &str) -> String {
    let mut chars = key.chars();
    let identifier = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if identifier {
        key.to_string()
    } else {
        quote(key)
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Aligns continuation lines of `message` under a column `width` wide.
///
/// Both `\n` and `\r\n` line breaks are normalized to `\n`.
#[must_use]
pub fn indent(message: &str, width: usize) -> String {
    let pad = format!("\n{}", " ".repeat(width));
    message.replace("\r\n", "\n").replace('\n', &pad)
}

/// Width of the `<time> <scope> ` prefix of a console line.
#[must_use]
pub fn column_width(time: &str, display_name: &str) -> usize {
    time.chars().count() + 1 + display_name.chars().count() + 1
}

/// Console color of the scope column for a level.
#[must_use]
pub fn level_color(level: LogLevel) -> Color {
    match level {
        LogLevel::Debug => Color::Blue,
        LogLevel::Info => Color::Green,
        LogLevel::Warn => Color::Yellow,
        LogLevel::Error | LogLevel::Critical => Color::Red,
    }
}
