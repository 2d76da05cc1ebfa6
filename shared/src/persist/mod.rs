//! Durable sinks for log entries.
//!
//! The logger only sees [`LogPersister::append_log`], a call that returns
//! immediately. [`QueuedPersister`] provides that contract on top of any
//! blocking [`LogSink`] by queueing entries for a background worker.
//!
//! ```text
//! Logger ──append_log──▶ QueuedPersister ──bounded queue──▶ worker ──▶ LogSink
//!                                                                    ├─ StoreSink (database log)
//!                                                                    └─ RotatingFileSink (file log)
//! ```

pub mod file;
pub mod queue;
pub mod store;

pub use file::{read_file_log, RotatingFileSink, FILE_LOG_NAME};
pub use queue::{LogSink, QueueConfig, QueuedPersister};
pub use store::StoreSink;

use crate::models::LogEntry;
use crate::storage::LogStoreError;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors raised by sinks. They never reach the logging call site.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Entry could not be encoded.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The log store rejected the write.
    #[error("Log store error: {0}")]
    Store(#[from] LogStoreError),
}

/// A destination the logger hands finished entries to.
///
/// Implementations must return without waiting on durability and must keep
/// the relative order of entries appended from one caller.
pub trait LogPersister: Send + Sync {
    /// Accepts an entry for persistence. Never blocks, never fails.
    fn append_log(&self, entry: LogEntry);
}

/// Persister that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPersister;

impl LogPersister for NoopPersister {
    fn append_log(&self, _entry: LogEntry) {}
}

/// Persister that keeps entries in memory, in call order.
///
/// Writes happen synchronously, which makes it the persister of choice for
/// tests asserting on what reached a sink.
#[derive(Debug, Default, Clone)]
pub struct MemoryPersister {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl MemoryPersister {
    /// Creates an empty persister.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies of every entry appended so far.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Number of entries appended so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Returns true if nothing was appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogPersister for MemoryPersister {
    fn append_log(&self, entry: LogEntry) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LogLevel;

    #[test]
    fn test_memory_persister_keeps_order() {
        let persister = MemoryPersister::new();
        persister.append_log(LogEntry::new(LogLevel::Info, "first", "test"));
        persister.append_log(LogEntry::new(LogLevel::Info, "second", "test"));

        let messages: Vec<_> = persister.entries().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }

    #[test]
    fn test_memory_persister_clones_share_entries() {
        let persister = MemoryPersister::new();
        let clone = persister.clone();
        clone.append_log(LogEntry::new(LogLevel::Info, "shared", "test"));
        assert_eq!(persister.len(), 1);
    }

    #[test]
    fn test_noop_persister_accepts_entries() {
        NoopPersister.append_log(LogEntry::new(LogLevel::Info, "gone", "test"));
    }
}
