//! Application state module.
//!
//! The composition root of the server: one broadcaster, one set of health
//! counters, the database log and the persisters, all shared by the logger
//! handed to route handlers.

use anyhow::Result;
use shared::broadcast::LogBroadcaster;
use shared::config::LoggerConfig;
use shared::health::{MetricCounters, TenantHealthStats};
use shared::logger::Logger;
use shared::persist::{LogPersister, QueuedPersister, RotatingFileSink, StoreSink, FILE_LOG_NAME};
use shared::storage::{InMemoryLogStore, LogStore};
use std::sync::Arc;

/// Scope of the entries the server logs about itself.
pub const SERVER_SCOPE: &str = "server";

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Logger every ingested entry goes through.
    logger: Logger,
    /// The database log.
    log_store: Arc<dyn LogStore>,
    /// Queued persisters to drain on shutdown.
    persisters: Arc<Vec<Arc<QueuedPersister>>>,
}

impl AppState {
    /// Creates application state around an existing logger and store.
    pub fn new(logger: Logger, log_store: Arc<dyn LogStore>) -> Self {
        Self {
            logger,
            log_store,
            persisters: Arc::new(Vec::new()),
        }
    }

    /// Wires the full pipeline from a configuration: queued database and
    /// file persisters in front of the log store and the rotating file log.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the file log cannot be opened.
    pub fn from_config(config: &LoggerConfig) -> Result<Self> {
        let log_store: Arc<dyn LogStore> = Arc::new(InMemoryLogStore::new());

        let db = Arc::new(QueuedPersister::spawn(
            "db",
            StoreSink::new(Arc::clone(&log_store)),
            config.queue_config(),
        ));
        let file_sink = RotatingFileSink::open(
            &config.log_dir,
            FILE_LOG_NAME,
            config.file_max_bytes,
            config.file_max_files,
        )?;
        let file = Arc::new(QueuedPersister::spawn(
            "file",
            file_sink,
            config.queue_config(),
        ));

        let logger = Logger::builder(SERVER_SCOPE)
            .config(config)
            .broadcaster(Arc::new(LogBroadcaster::new()))
            .counters(Arc::new(MetricCounters::new()))
            .tenant_stats(Arc::new(TenantHealthStats::new()))
            .db_persister(Arc::clone(&db) as Arc<dyn LogPersister>)
            .file_persister(Arc::clone(&file) as Arc<dyn LogPersister>)
            .build();

        Ok(Self {
            logger,
            log_store,
            persisters: Arc::new(vec![db, file]),
        })
    }

    /// Creates application state with an in-memory database log written
    /// inline and no file log.
    ///
    /// This is useful for development and testing.
    #[must_use]
    pub fn with_in_memory_store() -> Self {
        let log_store: Arc<dyn LogStore> = Arc::new(InMemoryLogStore::new());
        let logger = Logger::builder(SERVER_SCOPE)
            .db_persister(Arc::new(StoreSink::new(Arc::clone(&log_store))))
            .console(std::io::sink())
            .build();
        Self::new(logger, log_store)
    }

    /// Returns the logger.
    #[must_use]
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Returns a reference to the log store.
    #[must_use]
    pub fn log_store(&self) -> &dyn LogStore {
        self.log_store.as_ref()
    }

    /// Returns the process counters.
    #[must_use]
    pub fn counters(&self) -> &MetricCounters {
        self.logger.counters()
    }

    /// Returns the per-tenant health statistics.
    #[must_use]
    pub fn tenant_stats(&self) -> &TenantHealthStats {
        self.logger.tenant_stats()
    }

    /// Entries dropped by the queued persisters, by persister name.
    #[must_use]
    pub fn dropped_entries(&self) -> Vec<(String, u64)> {
        self.persisters
            .iter()
            .map(|p| (p.name().to_string(), p.dropped()))
            .collect()
    }

    /// Drains and stops the queued persisters.
    pub async fn shutdown(&self) {
        for persister in self.persisters.iter() {
            persister.shutdown().await;
            tracing::debug!(persister = persister.name(), "Persister drained");
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_in_memory_store()
    }
}
