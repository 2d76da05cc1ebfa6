//! Errors attached to a log call for message enrichment.
//!
//! Callers that want transport detail in the log line attach an
//! [`AttachedError::Http`]; everything else is an [`AttachedError::Plain`]
//! carrying a name, a message and an optional stack.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::backtrace::BacktraceStatus;
use std::error::Error as StdError;
use std::fmt::Write as _;

/// An error attached to a single log call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AttachedError {
    /// A regular error: rendered inline as `[name, message]`.
    Plain(PlainError),
    /// A failed outbound HTTP call: rendered as request/response detail lines.
    Http(HttpError),
}

/// A regular error value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlainError {
    /// Error type name, e.g. `RangeError` or `ParseIntError`.
    pub name: String,
    /// Human readable message.
    pub message: String,
    /// Stack trace or cause chain, shown at developer verbosity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// Never print the stack, regardless of verbosity.
    #[serde(default)]
    pub hide_stack_trace: bool,
}

/// Body of an HTTP error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseBody {
    /// Raw text body.
    Text(String),
    /// Structured (JSON) body.
    Json(Value),
}

/// A failed HTTP request and the response it received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpError {
    /// Request method, e.g. `get`.
    pub method: String,
    /// Request URL.
    pub url: String,
    /// Query parameters sent with the request.
    #[serde(default)]
    pub params: Map<String, Value>,
    /// Response status code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Response body, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<ResponseBody>,
    /// Message of the transport error itself.
    pub message: String,
    /// Stack trace or cause chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// Never print the stack, regardless of verbosity.
    #[serde(default)]
    pub hide_stack_trace: bool,
}

impl AttachedError {
    /// Creates a plain error from a name and a message.
    #[must_use]
    pub fn plain(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Plain(PlainError {
            name: name.into(),
            message: message.into(),
            ..PlainError::default()
        })
    }

    /// Captures any standard error.
    ///
    /// The name is the short type name of `E`, the stack is the chain of
    /// sources (absent when the error has no source).
    ///
    /// # Example
    ///
    /// ```
    /// use shared::models::AttachedError;
    ///
    /// let err = "x".parse::<u32>().unwrap_err();
    /// let attached = AttachedError::from_error(&err);
    /// assert_eq!(attached.name(), "ParseIntError");
    /// ```
    #[must_use]
    pub fn from_error<E: StdError + 'static>(err: &E) -> Self {
        Self::Plain(PlainError {
            name: short_type_name::<E>().to_string(),
            message: err.to_string(),
            stack: cause_chain(err.source()),
            hide_stack_trace: false,
        })
    }

    /// Sets the stack trace.
    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        match &mut self {
            Self::Plain(e) => e.stack = Some(stack.into()),
            Self::Http(e) => e.stack = Some(stack.into()),
        }
        self
    }

    /// Marks the error so its stack is never printed.
    #[must_use]
    pub fn hide_stack_trace(mut self) -> Self {
        match &mut self {
            Self::Plain(e) => e.hide_stack_trace = true,
            Self::Http(e) => e.hide_stack_trace = true,
        }
        self
    }

    /// Error type name. HTTP errors are always named `HttpError`.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Plain(e) => &e.name,
            Self::Http(_) => "HttpError",
        }
    }

    /// Error message.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Plain(e) => &e.message,
            Self::Http(e) => &e.message,
        }
    }

    /// Stack to print, `None` when absent, empty or hidden.
    #[must_use]
    pub fn visible_stack(&self) -> Option<&str> {
        let (stack, hidden) = match self {
            Self::Plain(e) => (e.stack.as_deref(), e.hide_stack_trace),
            Self::Http(e) => (e.stack.as_deref(), e.hide_stack_trace),
        };
        stack.filter(|s| !hidden && !s.trim().is_empty())
    }

    /// Returns true for transport errors.
    #[must_use]
    pub fn is_http(&self) -> bool {
        matches!(self, Self::Http(_))
    }
}

impl HttpError {
    /// Creates an HTTP error for a request.
    #[must_use]
    pub fn new(method: impl Into<String>, url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            message: message.into(),
            ..Self::default()
        }
    }

    /// Adds a request parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Sets the response status.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets a structured response body.
    #[must_use]
    pub fn with_json_body(mut self, body: Value) -> Self {
        self.body = Some(ResponseBody::Json(body));
        self
    }

    /// Sets a raw text response body.
    #[must_use]
    pub fn with_text_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(ResponseBody::Text(body.into()));
        self
    }
}

impl std::fmt::Display for AttachedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name(), self.message())
    }
}

impl From<PlainError> for AttachedError {
    fn from(err: PlainError) -> Self {
        Self::Plain(err)
    }
}

impl From<HttpError> for AttachedError {
    fn from(err: HttpError) -> Self {
        Self::Http(err)
    }
}

impl From<&anyhow::Error> for AttachedError {
    fn from(err: &anyhow::Error) -> Self {
        let mut stack = cause_chain(err.chain().nth(1)).unwrap_or_default();
        let backtrace = err.backtrace();
        if backtrace.status() == BacktraceStatus::Captured {
            if !stack.is_empty() {
                stack.push('\n');
            }
            let _ = write!(stack, "{backtrace}");
        }

        Self::Plain(PlainError {
            name: "Error".to_string(),
            message: err.to_string(),
            stack: Some(stack).filter(|s| !s.is_empty()),
            hide_stack_trace: false,
        })
    }
}

impl From<anyhow::Error> for AttachedError {
    fn from(err: anyhow::Error) -> Self {
        Self::from(&err)
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

fn cause_chain(mut source: Option<&(dyn StdError + 'static)>) -> Option<String> {
    let mut out = String::new();
    while let Some(cause) = source {
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = write!(out, "Caused by: {cause}");
        source = cause.source();
    }
    Some(out).filter(|s| !s.is_empty())
}
