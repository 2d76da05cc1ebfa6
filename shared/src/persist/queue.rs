//! Bounded queue in front of a blocking sink.

use super::{LogPersister, PersistError};
use crate::models::LogEntry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// A blocking destination drained by a [`QueuedPersister`] worker.
pub trait LogSink: Send + 'static {
    /// Writes a batch of entries, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch could not be written. The worker logs it
    /// and moves on to the next batch.
    fn write_batch(&mut self, entries: &[LogEntry]) -> Result<(), PersistError>;

    /// Pushes buffered data down to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if buffered data could not be flushed.
    fn flush(&mut self) -> Result<(), PersistError> {
        Ok(())
    }
}

/// Sizing of a persister queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    /// Entries held before new ones are dropped.
    pub capacity: usize,
    /// Maximum entries handed to the sink in one write.
    pub batch_size: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            batch_size: 256,
        }
    }
}

enum Command {
    Entry(LogEntry),
    Flush(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

/// Non-blocking persister backed by a bounded queue and one worker.
///
/// `append_log` is a `try_send`: when the queue is full the new entry is
/// dropped and counted, so a slow sink never stalls a logging call. A single
/// FIFO queue with a single worker keeps entries in append order.
///
/// The worker runs on tokio's blocking pool, so [`QueuedPersister::spawn`]
/// must be called from within a tokio runtime.
pub struct QueuedPersister {
    name: String,
    tx: mpsc::Sender<Command>,
    dropped: Arc<AtomicU64>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl QueuedPersister {
    /// Starts a worker draining into `sink`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn<S: LogSink>(name: impl Into<String>, sink: S, config: QueueConfig) -> Self {
        let name = name.into();
        let (tx, rx) = mpsc::channel(config.capacity.max(1));
        let worker = Worker {
            name: name.clone(),
            sink,
            rx,
            batch_size: config.batch_size.max(1),
        };
        let handle = tokio::task::spawn_blocking(move || worker.run());

        tracing::debug!(
            persister = %name,
            capacity = config.capacity,
            batch_size = config.batch_size,
            "Persister worker started"
        );

        Self {
            name,
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
            worker: Mutex::new(Some(handle)),
        }
    }

    /// Name used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entries dropped because the queue was full or closed.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Waits until every entry appended before this call is written and the
    /// sink is flushed. Returns immediately once the worker has stopped.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(Command::Flush(ack)).await.is_ok() {
            let _ = done.await;
        }
    }

    /// Drains the queue, flushes the sink and stops the worker.
    ///
    /// Entries appended afterwards are counted as dropped.
    pub async fn shutdown(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(Command::Shutdown(ack)).await.is_ok() {
            let _ = done.await;
        }
        let handle = self.worker.lock().ok().and_then(|mut w| w.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(persister = %self.name, error = %e, "Persister worker panicked");
            }
        }
    }
}

impl LogPersister for QueuedPersister {
    fn append_log(&self, entry: LogEntry) {
        if self.tx.try_send(Command::Entry(entry)).is_err() {
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            if dropped.is_power_of_two() {
                tracing::warn!(
                    persister = %self.name,
                    dropped,
                    "Log queue full, dropping entries"
                );
            }
        }
    }
}

impl std::fmt::Debug for QueuedPersister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedPersister")
            .field("name", &self.name)
            .field("dropped", &self.dropped())
            .finish_non_exhaustive()
    }
}

struct Worker<S> {
    name: String,
    sink: S,
    rx: mpsc::Receiver<Command>,
    batch_size: usize,
}

impl<S: LogSink> Worker<S> {
    fn run(mut self) {
        let mut batch = Vec::with_capacity(self.batch_size);

        while let Some(command) = self.rx.blocking_recv() {
            let mut next = Some(command);
            while let Some(command) = next.take() {
                match command {
                    Command::Entry(entry) => {
                        batch.push(entry);
                        if batch.len() >= self.batch_size {
                            self.write(&mut batch);
                        }
                    }
                    Command::Flush(ack) => {
                        self.write(&mut batch);
                        self.flush();
                        let _ = ack.send(());
                    }
                    Command::Shutdown(ack) => {
                        self.write(&mut batch);
                        self.flush();
                        let _ = ack.send(());
                        tracing::debug!(persister = %self.name, "Persister worker stopped");
                        return;
                    }
                }
                next = self.rx.try_recv().ok();
            }
            self.write(&mut batch);
            self.flush();
        }

        self.write(&mut batch);
        self.flush();
    }

    fn write(&mut self, batch: &mut Vec<LogEntry>) {
        if batch.is_empty() {
            return;
        }
        if let Err(e) = self.sink.write_batch(batch) {
            tracing::error!(
                persister = %self.name,
                entries = batch.len(),
                error = %e,
                "Failed to persist log batch"
            );
        }
        batch.clear();
    }

    fn flush(&mut self) {
        if let Err(e) = self.sink.flush() {
            tracing::error!(persister = %self.name, error = %e, "Failed to flush log sink");
        }
    }
}
