//! Log data model.
//!
//! Defines the `LogEntry` record written to every sink, the `LogLevel`
//! severity it carries, and the `DisplayLevel` rank used for the process
//! display threshold.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;
use validator::Validate;

use crate::text::strip_ansi;

/// Log severity level.
///
/// Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Developer detail, never persisted to the database log.
    Debug,
    /// Informational messages.
    Info,
    /// Warning conditions.
    Warn,
    /// Error conditions.
    Error,
    /// Critical conditions.
    Critical,
}

impl LogLevel {
    /// All levels, least severe first.
    pub const ALL: [LogLevel; 5] = [
        Self::Debug,
        Self::Info,
        Self::Warn,
        Self::Error,
        Self::Critical,
    ];

    /// Display rank a terminal call of this level uses unless overridden.
    #[must_use]
    pub fn default_display_level(self) -> DisplayLevel {
        match self {
            Self::Debug => DisplayLevel::Debug,
            Self::Info | Self::Warn | Self::Error | Self::Critical => DisplayLevel::Production,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = LogValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "critical" => Ok(Self::Critical),
            other => Err(LogValidationError::UnknownLevel(other.to_string())),
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

/// Display rank compared against the process display threshold.
///
/// A message reaches the console and file sinks when
/// `threshold >= rank`. A threshold of [`DisplayLevel::Dev`] or higher also
/// enables stack traces of attached errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayLevel {
    /// Always shown.
    Production = 0,
    /// Shown when running with developer verbosity.
    Dev = 1,
    /// Shown only at full verbosity.
    Debug = 2,
}

impl DisplayLevel {
    /// Maps a verbosity count to a rank, clamping anything above 2.
    #[must_use]
    pub fn from_verbosity(verbosity: u8) -> Self {
        match verbosity {
            0 => Self::Production,
            1 => Self::Dev,
            _ => Self::Debug,
        }
    }
}

impl Default for DisplayLevel {
    fn default() -> Self {
        Self::Production
    }
}

/// Returns the host name of this process, resolved once.
pub fn local_hostname() -> &'static str {
    static HOSTNAME: OnceLock<String> = OnceLock::new();
    HOSTNAME.get_or_init(|| {
        hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "localhost".to_string())
    })
}

/// A single log event, as handed to every sink.
///
/// The serialized shape is the durable contract of the database and file
/// logs: `{ tenantId?, hostname, level, scope, message, metadata, timestamp }`.
///
/// # Example
///
/// ```
/// use shared::models::{LogEntry, LogLevel};
///
/// let entry = LogEntry::new(LogLevel::Warn, "Disk almost full", "storage")
///     .with_tenant("bot-42")
///     .with_metadata("free=3%");
///
/// assert_eq!(entry.tenant_id.as_deref(), Some("bot-42"));
/// assert!(entry.validate_entry().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Owning tenant, absent for platform-wide messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,

    /// Host that produced the entry.
    #[validate(length(min = 1, message = "Hostname cannot be empty"))]
    pub hostname: String,

    /// Severity of the entry.
    pub level: LogLevel,

    /// Display name of the logger that produced the entry.
    #[validate(length(min = 1, message = "Scope cannot be empty"))]
    pub scope: String,

    /// Formatted message, free of ANSI escapes.
    pub message: String,

    /// Serialized metadata, free of ANSI escapes.
    #[serde(default)]
    pub metadata: String,

    /// Capture time.
    pub timestamp: DateTime<Utc>,
}

/// Errors that can occur during log entry validation.
#[derive(Debug, Error)]
pub enum LogValidationError {
    /// The hostname is empty.
    #[error("Hostname cannot be empty")]
    EmptyHostname,

    /// The scope is empty.
    #[error("Scope cannot be empty")]
    EmptyScope,

    /// The level string is not one of the known levels.
    #[error("Unknown log level: {0}")]
    UnknownLevel(String),

    /// Validation failed with details.
    #[error("Validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

impl LogEntry {
    /// Creates a new entry stamped with the current time and local hostname.
    ///
    /// ANSI escape sequences are stripped from the message.
    #[must_use]
    pub fn new(level: LogLevel, message: impl AsRef<str>, scope: impl Into<String>) -> Self {
        Self {
            tenant_id: None,
            hostname: local_hostname().to_string(),
            level,
            scope: scope.into(),
            message: strip_ansi(message.as_ref()),
            metadata: String::new(),
            timestamp: Utc::now(),
        }
    }

    /// Scopes the entry to a tenant.
    #[must_use]
    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Sets the serialized metadata, stripping ANSI escape sequences.
    #[must_use]
    pub fn with_metadata(mut self, metadata: impl AsRef<str>) -> Self {
        self.metadata = strip_ansi(metadata.as_ref());
        self
    }

    /// Overrides the hostname.
    #[must_use]
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Overrides the capture time.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Validates the entry.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The hostname is empty
    /// - The scope is empty
    pub fn validate_entry(&self) -> Result<(), LogValidationError> {
        if self.hostname.is_empty() {
            return Err(LogValidationError::EmptyHostname);
        }
        if self.scope.is_empty() {
            return Err(LogValidationError::EmptyScope);
        }
        self.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_entry_new() {
        let log = LogEntry::new(LogLevel::Info, "Test message", "test-scope");

        assert_eq!(log.level, LogLevel::Info);
        assert_eq!(log.message, "Test message");
        assert_eq!(log.scope, "test-scope");
        assert!(log.tenant_id.is_none());
        assert!(log.metadata.is_empty());
        assert!(!log.hostname.is_empty());
    }

    #[test]
    fn test_log_entry_strips_ansi() {
        let log = LogEntry::new(LogLevel::Warn, "\u{1b}[31mred\u{1b}[0m text", "scope")
            .with_metadata("\u{1b}[1mbold\u{1b}[22m");

        assert_eq!(log.message, "red text");
        assert_eq!(log.metadata, "bold");
    }

    #[test]
    fn test_log_entry_serialization_shape() {
        let log = LogEntry::new(LogLevel::Critical, "Something failed", "core")
            .with_tenant("bot-1")
            .with_hostname("host-a");

        let json = serde_json::to_value(&log).unwrap();

        assert_eq!(json["tenantId"], "bot-1");
        assert_eq!(json["hostname"], "host-a");
        assert_eq!(json["level"], "critical");
        assert_eq!(json["scope"], "core");
        assert_eq!(json["message"], "Something failed");
        assert_eq!(json["metadata"], "");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_platform_entry_omits_tenant() {
        let log = LogEntry::new(LogLevel::Info, "boot", "core");
        let json = serde_json::to_string(&log).unwrap();
        assert!(!json.contains("tenantId"));
    }

    #[test]
    fn test_log_entry_validation_success() {
        let log = LogEntry::new(LogLevel::Info, "Valid message", "valid-scope");
        assert!(log.validate_entry().is_ok());
    }

    #[test]
    fn test_log_entry_validation_empty_scope() {
        let log = LogEntry::new(LogLevel::Info, "message", "");
        assert!(matches!(
            log.validate_entry().unwrap_err(),
            LogValidationError::EmptyScope
        ));
    }

    #[test]
    fn test_log_entry_validation_empty_hostname() {
        let log = LogEntry::new(LogLevel::Info, "message", "scope").with_hostname("");
        assert!(matches!(
            log.validate_entry().unwrap_err(),
            LogValidationError::EmptyHostname
        ));
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Critical);
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("critical".parse::<LogLevel>().unwrap(), LogLevel::Critical);
        assert!("fatal".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_log_level_serialization() {
        assert_eq!(
            serde_json::to_string(&LogLevel::Critical).unwrap(),
            "\"critical\""
        );
        let level: LogLevel = serde_json::from_str("\"warn\"").unwrap();
        assert_eq!(level, LogLevel::Warn);
    }

    #[test]
    fn test_default_display_levels() {
        assert_eq!(LogLevel::Debug.default_display_level(), DisplayLevel::Debug);
        assert_eq!(
            LogLevel::Critical.default_display_level(),
            DisplayLevel::Production
        );
    }

    #[test]
    fn test_display_level_from_verbosity_clamps() {
        assert_eq!(DisplayLevel::from_verbosity(0), DisplayLevel::Production);
        assert_eq!(DisplayLevel::from_verbosity(1), DisplayLevel::Dev);
        assert_eq!(DisplayLevel::from_verbosity(7), DisplayLevel::Debug);
        assert!(DisplayLevel::Debug > DisplayLevel::Dev);
    }

    #[test]
    fn test_hostname_is_stable() {
        assert_eq!(local_hostname(), local_hostname());
    }
}
