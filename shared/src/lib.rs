//! Tenantlog Shared Library
//!
//! The core of the Tenantlog logging subsystem: a tenant-scoped logger that
//! fans every call out to the console, a database log, a rotating file log
//! and a live subscriber stream, while keeping health counters per tenant.
//!
//! # Modules
//!
//! - [`models`] - Log entries, levels and attached errors
//! - [`logger`] - The logger façade and message formatting
//! - [`broadcast`] - Wildcard publish/subscribe for live streaming
//! - [`persist`] - Queued persisters, file and database sinks
//! - [`storage`] - The queryable database log
//! - [`health`] - Process counters and per-tenant health statistics
//! - [`config`] - Environment configuration
//!
//! # Example
//!
//! ```
//! use shared::logger::Logger;
//!
//! let logger = Logger::builder("auth").console(std::io::sink()).build();
//! logger.for_tenant("bot-1").meta(serde_json::json!({"userId": 12345})).info("User logged in");
//! logger.for_tenant("bot-1").warn("Token close to expiry");
//!
//! assert_eq!(logger.tenant_stats().get("bot-1").unwrap().warnings, 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod broadcast;
pub mod config;
pub mod health;
pub mod logger;
pub mod models;
pub mod persist;
pub mod storage;
pub mod text;

/// Re-export common dependencies for convenience.
pub use chrono;
pub use serde;
pub use serde_json;
pub use validator;
