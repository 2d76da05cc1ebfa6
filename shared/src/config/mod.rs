//! Logger configuration.
//!
//! Values are read once at startup from `TENANTLOG_*` environment variables
//! and are read-only afterwards.

use crate::models::DisplayLevel;
use crate::persist::QueueConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Display threshold, `0` production, `1` dev, `2` debug.
pub const ENV_VERBOSITY: &str = "TENANTLOG_VERBOSITY";
/// When set, scopes are padded or cut to a fixed width.
pub const ENV_INDENT_LOGS: &str = "TENANTLOG_INDENT_LOGS";
/// Directory of the file log.
pub const ENV_LOG_DIR: &str = "TENANTLOG_LOG_DIR";
/// Size at which the file log rotates.
pub const ENV_FILE_MAX_BYTES: &str = "TENANTLOG_FILE_MAX_BYTES";
/// Rotated file logs kept.
pub const ENV_FILE_MAX_FILES: &str = "TENANTLOG_FILE_MAX_FILES";
/// Per-persister queue capacity.
pub const ENV_QUEUE_CAPACITY: &str = "TENANTLOG_QUEUE_CAPACITY";
/// Maximum entries per sink write.
pub const ENV_BATCH_SIZE: &str = "TENANTLOG_BATCH_SIZE";

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set to something that does not parse.
    #[error("Invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
        /// Parser message.
        reason: String,
    },

    /// The configuration parses but cannot be used.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Process-wide logger settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Display threshold for console and file output.
    pub verbosity: DisplayLevel,
    /// Pad or cut scopes to a fixed width on the console.
    pub indent_logs: bool,
    /// Directory of the rotating file log.
    pub log_dir: PathBuf,
    /// Size at which the active log file is rotated.
    pub file_max_bytes: u64,
    /// Number of rotated files kept.
    pub file_max_files: usize,
    /// Capacity of each persister queue.
    pub queue_capacity: usize,
    /// Maximum entries handed to a sink at once.
    pub batch_size: usize,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        let queue = QueueConfig::default();
        Self {
            verbosity: DisplayLevel::Production,
            indent_logs: false,
            log_dir: PathBuf::from("logs"),
            file_max_bytes: 10 * 1024 * 1024,
            file_max_files: 5,
            queue_capacity: queue.capacity,
            batch_size: queue.batch_size,
        }
    }
}

impl LoggerConfig {
    /// Loads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but does not parse, or if the
    /// result fails [`LoggerConfig::validate`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`LoggerConfig::from_env`].
    ///
    /// # Examples
    ///
    /// ```
    /// use shared::config::LoggerConfig;
    /// use shared::models::DisplayLevel;
    ///
    /// let config = LoggerConfig::from_lookup(|key| {
    ///     (key == "TENANTLOG_VERBOSITY").then(|| "2".to_string())
    /// })
    /// .unwrap();
    /// assert_eq!(config.verbosity, DisplayLevel::Debug);
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let verbosity = parse_var::<u8>(&lookup, ENV_VERBOSITY)?
            .map_or(defaults.verbosity, DisplayLevel::from_verbosity);
        let indent_logs = lookup(ENV_INDENT_LOGS).is_some_and(|v| is_truthy(&v));
        let log_dir = lookup(ENV_LOG_DIR)
            .filter(|v| !v.trim().is_empty())
            .map_or(defaults.log_dir, PathBuf::from);

        let config = Self {
            verbosity,
            indent_logs,
            log_dir,
            file_max_bytes: parse_var(&lookup, ENV_FILE_MAX_BYTES)?
                .unwrap_or(defaults.file_max_bytes),
            file_max_files: parse_var(&lookup, ENV_FILE_MAX_FILES)?
                .unwrap_or(defaults.file_max_files),
            queue_capacity: parse_var(&lookup, ENV_QUEUE_CAPACITY)?
                .unwrap_or(defaults.queue_capacity),
            batch_size: parse_var(&lookup, ENV_BATCH_SIZE)?.unwrap_or(defaults.batch_size),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that sizes are usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the queue capacity, the batch size
    /// or the file size limit is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "queue capacity must be greater than zero".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "batch size must be greater than zero".to_string(),
            ));
        }
        if self.file_max_bytes == 0 {
            return Err(ConfigError::Invalid(
                "file max bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Queue sizing for the persisters.
    #[must_use]
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            capacity: self.queue_capacity,
            batch_size: self.batch_size,
        }
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<T>()
        .map(Some)
        .map_err(|e| ConfigError::InvalidValue {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        })
}

fn is_truthy(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "no" | "off"
    )
}
