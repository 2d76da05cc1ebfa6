//! Data models for the tenant logger.
//!
//! This module contains the log record written to every sink and the error
//! values a log call can carry.

pub mod error;
pub mod log;

pub use error::{AttachedError, HttpError, PlainError, ResponseBody};
pub use log::{local_hostname, DisplayLevel, LogEntry, LogLevel, LogValidationError};
