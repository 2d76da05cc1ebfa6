//! Storage traits and implementations.
//!
//! This module provides the abstraction behind the database log. The
//! `LogStore` trait defines the interface for log storage, allowing different
//! implementations (in-memory, database-backed, etc.).

pub mod log_store;

pub use log_store::{InMemoryLogStore, LogQuery, LogQueryResult, LogStore, LogStoreError};
