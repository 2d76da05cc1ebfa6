//! Tenant-scoped logger.
//!
//! A [`Logger`] has a fixed scope and shares its collaborators (broadcaster,
//! persisters, counters, tenant stats, console) with every logger derived
//! from it through [`Logger::scoped`]. Per-call options are expressed with a
//! [`LogCall`], an owned value built fluently and consumed by a level method:
//!
//! ```
//! use shared::logger::Logger;
//! use shared::models::AttachedError;
//!
//! let logger = Logger::builder("dialog").console(std::io::sink()).build();
//!
//! logger
//!     .for_tenant("bot-1")
//!     .attach_error(AttachedError::plain("RangeError", "out of bounds"))
//!     .persist(false)
//!     .error("Could not read slot");
//!
//! assert_eq!(logger.tenant_stats().get("bot-1").unwrap().errors, 1);
//! ```
//!
//! Each level method runs the same pipeline: format the message, build a
//! [`LogEntry`], publish it on the broadcaster, hand it to the database
//! persister, print it and hand it to the file persister when the display
//! threshold allows, and update the health counters.

pub mod format;

use crate::broadcast::{log_namespace, BroadcastError, LogBroadcaster, LogEvent, Subscription};
use crate::config::LoggerConfig;
use crate::health::{HealthCategory, MetricCounters, TenantHealthStats, CRITICALS, ERRORS, WARNINGS};
use crate::models::{local_hostname, AttachedError, DisplayLevel, LogEntry, LogLevel};
use crate::persist::{LogPersister, NoopPersister};
use chrono::{Local, Utc};
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

/// The message of a log call.
#[derive(Debug, Clone, PartialEq)]
pub enum LogMessage {
    /// Plain text.
    Text(String),
    /// A structured value, logged as metadata under a placeholder message.
    Structured(Value),
}

impl From<&str> for LogMessage {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for LogMessage {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&String> for LogMessage {
    fn from(text: &String) -> Self {
        Self::Text(text.clone())
    }
}

impl From<Value> for LogMessage {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            other => Self::Structured(other),
        }
    }
}

struct Shared {
    broadcaster: Arc<LogBroadcaster>,
    db_persister: Arc<dyn LogPersister>,
    file_persister: Arc<dyn LogPersister>,
    counters: Arc<MetricCounters>,
    tenant_stats: Arc<TenantHealthStats>,
    threshold: DisplayLevel,
    indent_logs: bool,
    hostname: String,
    console: Mutex<Box<dyn Write + Send>>,
}

/// Fans log calls out to the console, the persisters and the broadcaster.
///
/// Cloning is cheap; clones share every collaborator.
#[derive(Clone)]
pub struct Logger {
    scope: String,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("scope", &self.scope)
            .field("threshold", &self.shared.threshold)
            .field("hostname", &self.shared.hostname)
            .finish_non_exhaustive()
    }
}

impl Logger {
    /// Starts building a logger for `scope`.
    #[must_use]
    pub fn builder(scope: impl Into<String>) -> LoggerBuilder {
        LoggerBuilder::new(scope)
    }

    /// Derives a logger with another scope sharing every collaborator.
    #[must_use]
    pub fn scoped(&self, scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            shared: Arc::clone(&self.shared),
        }
    }

    /// Scope this logger writes under.
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Process display threshold.
    #[must_use]
    pub fn display_threshold(&self) -> DisplayLevel {
        self.shared.threshold
    }

    /// Broadcaster entries are published on.
    #[must_use]
    pub fn broadcaster(&self) -> &Arc<LogBroadcaster> {
        &self.shared.broadcaster
    }

    /// Process-wide counters.
    #[must_use]
    pub fn counters(&self) -> &Arc<MetricCounters> {
        &self.shared.counters
    }

    /// Per-tenant health statistics.
    #[must_use]
    pub fn tenant_stats(&self) -> &Arc<TenantHealthStats> {
        &self.shared.tenant_stats
    }

    /// Starts a call with default options.
    pub fn call(&self) -> LogCall<'_> {
        LogCall::new(self)
    }

    /// Starts a call scoped to a tenant.
    pub fn for_tenant(&self, tenant_id: impl Into<String>) -> LogCall<'_> {
        self.call().for_tenant(tenant_id)
    }

    /// Starts a call with an attached error.
    pub fn attach_error(&self, error: impl Into<AttachedError>) -> LogCall<'_> {
        self.call().attach_error(error)
    }

    /// Starts a call with database persistence switched on or off.
    pub fn persist(&self, persist: bool) -> LogCall<'_> {
        self.call().persist(persist)
    }

    /// Starts a call with an explicit display rank.
    pub fn level(&self, level: DisplayLevel) -> LogCall<'_> {
        self.call().level(level)
    }

    /// Starts a call that is not published on the broadcaster.
    pub fn no_emit(&self) -> LogCall<'_> {
        self.call().no_emit()
    }

    /// Starts a call carrying metadata.
    pub fn meta(&self, metadata: impl Serialize) -> LogCall<'_> {
        self.call().meta(metadata)
    }

    /// Logs at debug level.
    pub fn debug(&self, message: impl Into<LogMessage>) {
        self.call().debug(message);
    }

    /// Logs at info level.
    pub fn info(&self, message: impl Into<LogMessage>) {
        self.call().info(message);
    }

    /// Logs at warn level.
    pub fn warn(&self, message: impl Into<LogMessage>) {
        self.call().warn(message);
    }

    /// Logs at error level.
    pub fn error(&self, message: impl Into<LogMessage>) {
        self.call().error(message);
    }

    /// Logs at critical level.
    pub fn critical(&self, message: impl Into<LogMessage>) {
        self.call().critical(message);
    }

    /// Subscribes to the entries of one tenant, or of every tenant when
    /// `tenant_id` is `*`.
    ///
    /// # Errors
    ///
    /// Returns [`BroadcastError::InvalidArgument`] for a blank tenant id.
    pub fn subscribe<F>(&self, tenant_id: &str, listener: F) -> Result<Subscription, BroadcastError>
    where
        F: Fn(&LogEvent) + Send + Sync + 'static,
    {
        self.shared.broadcaster.subscribe_tenant(tenant_id, listener)
    }

    /// Subscribes to every entry.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the wildcard is always a valid target.
    pub fn subscribe_all<F>(&self, listener: F) -> Result<Subscription, BroadcastError>
    where
        F: Fn(&LogEvent) + Send + Sync + 'static,
    {
        self.subscribe(crate::broadcast::WILDCARD, listener)
    }

    fn write_console(&self, line: &str) {
        let mut console = self
            .shared
            .console
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = console.write_all(line.as_bytes()).and_then(|()| console.flush()) {
            tracing::debug!(scope = %self.scope, error = %e, "Failed to write console line");
        }
    }
}

/// Options of a single log call.
///
/// Built from a [`Logger`] and consumed by one of the level methods, so no
/// option outlives the call it was set for.
#[must_use = "a LogCall does nothing until a level method is called"]
#[derive(Debug)]
pub struct LogCall<'a> {
    logger: &'a Logger,
    tenant_id: Option<String>,
    error: Option<AttachedError>,
    persist: bool,
    emit: bool,
    display_level: Option<DisplayLevel>,
    metadata: Option<Value>,
}

impl<'a> LogCall<'a> {
    fn new(logger: &'a Logger) -> Self {
        Self {
            logger,
            tenant_id: None,
            error: None,
            persist: true,
            emit: true,
            display_level: None,
            metadata: None,
        }
    }

    /// Scopes the call to a tenant.
    pub fn for_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Attaches an error to describe in the message.
    pub fn attach_error(mut self, error: impl Into<AttachedError>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Switches database persistence on or off.
    pub fn persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    /// Overrides the display rank of the level method.
    pub fn level(mut self, level: DisplayLevel) -> Self {
        self.display_level = Some(level);
        self
    }

    /// Skips publishing on the broadcaster.
    pub fn no_emit(mut self) -> Self {
        self.emit = false;
        self
    }

    /// Attaches metadata. A value that fails to serialize is dropped.
    pub fn meta(mut self, metadata: impl Serialize) -> Self {
        self.metadata = serde_json::to_value(metadata).ok();
        self
    }

    /// Logs at debug level. Debug entries are never persisted to the database.
    pub fn debug(self, message: impl Into<LogMessage>) {
        self.emit(LogLevel::Debug, message.into());
    }

    /// Logs at info level.
    pub fn info(self, message: impl Into<LogMessage>) {
        self.emit(LogLevel::Info, message.into());
    }

    /// Logs at warn level and counts a warning.
    pub fn warn(self, message: impl Into<LogMessage>) {
        self.emit(LogLevel::Warn, message.into());
    }

    /// Logs at error level and counts an error.
    pub fn error(self, message: impl Into<LogMessage>) {
        self.emit(LogLevel::Error, message.into());
    }

    /// Logs at critical level and counts a critical.
    pub fn critical(self, message: impl Into<LogMessage>) {
        self.emit(LogLevel::Critical, message.into());
    }

    fn emit(self, level: LogLevel, message: LogMessage) {
        let logger = self.logger;
        let shared = &logger.shared;
        let rank = self
            .display_level
            .unwrap_or_else(|| level.default_display_level());

        let (mut message, metadata) = match message {
            LogMessage::Text(text) => (text, self.metadata),
            LogMessage::Structured(value) => {
                (format::STRUCTURED_PLACEHOLDER.to_string(), Some(value))
            }
        };

        if let Some(error) = &self.error {
            format::enrich_message(&mut message, error);
        }
        let metadata = metadata
            .as_ref()
            .map(format::serialize_metadata)
            .unwrap_or_default();

        let now = Local::now();
        let time = format::format_time(&now);
        let display_name = format::display_name(&logger.scope, shared.indent_logs);

        let force_indent = self.error.as_ref().is_some_and(AttachedError::is_http);
        let body = if level == LogLevel::Error && !force_indent {
            message
        } else {
            format::indent(&message, format::column_width(&time, &display_name))
        };

        let stack = self
            .error
            .as_ref()
            .filter(|_| shared.threshold >= DisplayLevel::Dev)
            .and_then(AttachedError::visible_stack)
            .map(|stack| format!("\n{}\n{stack}", format::STACK_TRACE_HEADER));

        let mut entry = LogEntry::new(
            level,
            format!("{body}{}", stack.as_deref().unwrap_or_default()),
            display_name.as_str(),
        )
        .with_metadata(&metadata)
        .with_hostname(shared.hostname.as_str())
        .with_timestamp(now.with_timezone(&Utc));
        if let Some(tenant_id) = &self.tenant_id {
            entry = entry.with_tenant(tenant_id.as_str());
        }

        if self.emit {
            let namespace = log_namespace(self.tenant_id.as_deref());
            let event = LogEvent {
                namespace,
                level,
                message: entry.message.clone(),
                metadata: entry.metadata.clone(),
            };
            shared.broadcaster.publish(&event.namespace, &event);
        }

        if self.persist && level != LogLevel::Debug {
            shared.db_persister.append_log(entry.clone());
        }

        if shared.threshold >= rank {
            let line = format!(
                "{} {} {}{}{}\n",
                time.bright_black(),
                display_name.color(format::level_color(level)).bold(),
                body,
                stack.as_deref().unwrap_or_default().bright_black(),
                metadata
            );
            logger.write_console(&line);
            shared.file_persister.append_log(entry);
        }

        record_health(shared, level, self.tenant_id.as_deref());
    }
}

fn record_health(shared: &Shared, level: LogLevel, tenant_id: Option<&str>) {
    let (category, counter) = match level {
        LogLevel::Warn => (HealthCategory::Warning, WARNINGS),
        LogLevel::Error => (HealthCategory::Error, ERRORS),
        LogLevel::Critical => (HealthCategory::Critical, CRITICALS),
        LogLevel::Debug | LogLevel::Info => return,
    };
    if let Some(tenant_id) = tenant_id {
        shared.tenant_stats.increment(tenant_id, category);
    }
    shared.counters.increment(counter);
}

/// Builds a [`Logger`]. Collaborators that are not provided get a private
/// default: a fresh broadcaster, counters and stats, no-op persisters and
/// stdout for the console.
#[must_use]
pub struct LoggerBuilder {
    scope: String,
    broadcaster: Option<Arc<LogBroadcaster>>,
    db_persister: Option<Arc<dyn LogPersister>>,
    file_persister: Option<Arc<dyn LogPersister>>,
    counters: Option<Arc<MetricCounters>>,
    tenant_stats: Option<Arc<TenantHealthStats>>,
    threshold: DisplayLevel,
    indent_logs: bool,
    hostname: Option<String>,
    console: Option<Box<dyn Write + Send>>,
}

impl LoggerBuilder {
    /// Starts a builder for `scope`.
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            broadcaster: None,
            db_persister: None,
            file_persister: None,
            counters: None,
            tenant_stats: None,
            threshold: DisplayLevel::default(),
            indent_logs: false,
            hostname: None,
            console: None,
        }
    }

    /// Applies the display threshold and scope width from a configuration.
    pub fn config(mut self, config: &LoggerConfig) -> Self {
        self.threshold = config.verbosity;
        self.indent_logs = config.indent_logs;
        self
    }

    /// Sets the process display threshold.
    pub fn display_threshold(mut self, threshold: DisplayLevel) -> Self {
        self.threshold = threshold;
        self
    }

    /// Pads or cuts scopes to a fixed width.
    pub fn indent_logs(mut self, indent_logs: bool) -> Self {
        self.indent_logs = indent_logs;
        self
    }

    /// Shares an existing broadcaster.
    pub fn broadcaster(mut self, broadcaster: Arc<LogBroadcaster>) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    /// Sets the database persister.
    pub fn db_persister(mut self, persister: Arc<dyn LogPersister>) -> Self {
        self.db_persister = Some(persister);
        self
    }

    /// Sets the file persister.
    pub fn file_persister(mut self, persister: Arc<dyn LogPersister>) -> Self {
        self.file_persister = Some(persister);
        self
    }

    /// Shares existing counters.
    pub fn counters(mut self, counters: Arc<MetricCounters>) -> Self {
        self.counters = Some(counters);
        self
    }

    /// Shares existing tenant statistics.
    pub fn tenant_stats(mut self, tenant_stats: Arc<TenantHealthStats>) -> Self {
        self.tenant_stats = Some(tenant_stats);
        self
    }

    /// Overrides the host name recorded on entries.
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Writes console lines to `writer` instead of stdout.
    pub fn console(mut self, writer: impl Write + Send + 'static) -> Self {
        self.console = Some(Box::new(writer));
        self
    }

    /// Builds the logger.
    #[must_use]
    pub fn build(self) -> Logger {
        let noop: Arc<dyn LogPersister> = Arc::new(NoopPersister);
        Logger {
            scope: self.scope,
            shared: Arc::new(Shared {
                broadcaster: self.broadcaster.unwrap_or_default(),
                db_persister: self.db_persister.unwrap_or_else(|| Arc::clone(&noop)),
                file_persister: self.file_persister.unwrap_or(noop),
                counters: self.counters.unwrap_or_default(),
                tenant_stats: self.tenant_stats.unwrap_or_default(),
                threshold: self.threshold,
                indent_logs: self.indent_logs,
                hostname: self
                    .hostname
                    .unwrap_or_else(|| local_hostname().to_string()),
                console: Mutex::new(
                    self.console
                        .unwrap_or_else(|| Box::new(std::io::stdout())),
                ),
            }),
        }
    }
}
