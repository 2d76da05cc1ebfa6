//! The database log: a queryable store of persisted entries.
//!
//! Entries arrive from the database persister in call order and are read
//! back by tenant health tooling and the `/api/v1/logs` route.

use crate::models::{LogEntry, LogLevel};
use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

/// Errors raised by a [`LogStore`].
#[derive(Debug, Error)]
pub enum LogStoreError {
    /// A writer panicked while holding the store lock.
    #[error("Log store lock poisoned")]
    Poisoned,

    /// The backing storage rejected the operation.
    #[error("Log store backend error: {0}")]
    Backend(String),
}

/// Filters and pagination for reading the database log.
///
/// Every filter that is set must match. An empty query returns every entry.
#[derive(Debug, Clone, Default)]
pub struct LogQuery {
    /// Exact tenant. Platform-wide entries never match a tenant filter.
    pub tenant_id: Option<String>,
    /// Exact level.
    pub level: Option<LogLevel>,
    /// Scope, compared after trimming fixed-width padding.
    pub scope: Option<String>,
    /// Case-insensitive substring of the message.
    pub message_contains: Option<String>,
    /// Inclusive lower bound on the capture time.
    pub start_time: Option<DateTime<Utc>>,
    /// Exclusive upper bound on the capture time.
    pub end_time: Option<DateTime<Utc>>,
    /// Matching entries to skip.
    pub offset: Option<usize>,
    /// Matching entries to return at most.
    pub limit: Option<usize>,
}

impl LogQuery {
    /// Creates a query matching everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Only entries of `tenant_id`.
    #[must_use]
    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Only entries of `level`.
    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    /// Only entries logged under `scope`.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Only entries whose message contains `pattern`, ignoring case.
    #[must_use]
    pub fn with_message_contains(mut self, pattern: impl Into<String>) -> Self {
        self.message_contains = Some(pattern.into());
        self
    }

    /// Only entries captured at or after `start`.
    #[must_use]
    pub fn with_start_time(mut self, start: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self
    }

    /// Only entries captured before `end`.
    #[must_use]
    pub fn with_end_time(mut self, end: DateTime<Utc>) -> Self {
        self.end_time = Some(end);
        self
    }

    /// Skips the first `offset` matches.
    #[must_use]
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns at most `limit` matches.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn matcher(&self) -> impl Fn(&LogEntry) -> bool + '_ {
        let needle = self.message_contains.as_deref().map(str::to_lowercase);
        move |entry: &LogEntry| {
            self.tenant_id
                .as_deref()
                .is_none_or(|t| entry.tenant_id.as_deref() == Some(t))
                && self.level.is_none_or(|l| entry.level == l)
                && self
                    .scope
                    .as_deref()
                    .is_none_or(|s| entry.scope.trim_end() == s)
                && self.start_time.is_none_or(|start| entry.timestamp >= start)
                && self.end_time.is_none_or(|end| entry.timestamp < end)
                && needle
                    .as_deref()
                    .is_none_or(|n| entry.message.to_lowercase().contains(n))
        }
    }
}

/// One page of query results.
#[derive(Debug, Clone)]
pub struct LogQueryResult {
    /// Matching entries on this page, oldest first.
    pub logs: Vec<LogEntry>,
    /// Matching entries across all pages.
    pub total_count: usize,
}

/// Storage behind the database log.
pub trait LogStore: Send + Sync {
    /// Appends one entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry could not be stored.
    fn insert(&self, entry: LogEntry) -> Result<(), LogStoreError>;

    /// Appends entries, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch could not be stored.
    fn insert_batch(&self, entries: Vec<LogEntry>) -> Result<(), LogStoreError>;

    /// Reads the entries matching `query`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store could not be read.
    fn query(&self, query: LogQuery) -> Result<LogQueryResult, LogStoreError>;

    /// Number of stored entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the store could not be read.
    fn count(&self) -> Result<usize, LogStoreError>;

    /// Removes every entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the store could not be written.
    fn clear(&self) -> Result<(), LogStoreError>;
}

/// Database log kept in process memory, in insertion order.
///
/// Nothing survives a restart.
///
/// # Example
///
/// ```
/// use shared::storage::{InMemoryLogStore, LogStore, LogQuery};
/// use shared::models::{LogEntry, LogLevel};
///
/// let store = InMemoryLogStore::new();
///
/// let log = LogEntry::new(LogLevel::Info, "Bot mounted", "BotService").with_tenant("bot-1");
/// store.insert(log).unwrap();
///
/// let result = store.query(LogQuery::new().with_tenant("bot-1")).unwrap();
/// assert_eq!(result.logs.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryLogStore {
    entries: RwLock<Vec<LogEntry>>,
}

impl InMemoryLogStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store ready to be shared between sinks and routes.
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<LogEntry>>, LogStoreError> {
        self.entries.read().map_err(|_| LogStoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<LogEntry>>, LogStoreError> {
        self.entries.write().map_err(|_| LogStoreError::Poisoned)
    }
}

impl LogStore for InMemoryLogStore {
    fn insert(&self, entry: LogEntry) -> Result<(), LogStoreError> {
        self.write()?.push(entry);
        Ok(())
    }

    fn insert_batch(&self, entries: Vec<LogEntry>) -> Result<(), LogStoreError> {
        self.write()?.extend(entries);
        Ok(())
    }

    fn query(&self, query: LogQuery) -> Result<LogQueryResult, LogStoreError> {
        let entries = self.read()?;
        let matches = query.matcher();

        let mut total_count = 0;
        let mut logs = Vec::new();
        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);

        for entry in entries.iter().filter(|&e| matches(e)) {
            if total_count >= offset && logs.len() < limit {
                logs.push(entry.clone());
            }
            total_count += 1;
        }

        Ok(LogQueryResult { logs, total_count })
    }

    fn count(&self) -> Result<usize, LogStoreError> {
        Ok(self.read()?.len())
    }

    fn clear(&self) -> Result<(), LogStoreError> {
        self.write()?.clear();
        Ok(())
    }
}
