//! Database log sink.

use super::queue::LogSink;
use super::{LogPersister, PersistError};
use crate::models::LogEntry;
use crate::storage::LogStore;
use std::sync::Arc;

/// Writes batches into a [`LogStore`].
///
/// Behind a [`super::QueuedPersister`] it is the database sink. It also
/// persists inline as a [`LogPersister`], for stores whose writes never wait
/// such as [`crate::storage::InMemoryLogStore`].
#[derive(Clone)]
pub struct StoreSink {
    store: Arc<dyn LogStore>,
}

impl StoreSink {
    /// Creates a sink writing into `store`.
    #[must_use]
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self { store }
    }
}

impl LogSink for StoreSink {
    fn write_batch(&mut self, entries: &[LogEntry]) -> Result<(), PersistError> {
        self.store.insert_batch(entries.to_vec())?;
        Ok(())
    }
}

impl LogPersister for StoreSink {
    fn append_log(&self, entry: LogEntry) {
        if let Err(e) = self.store.insert(entry) {
            tracing::error!(error = %e, "Failed to persist log entry");
        }
    }
}
