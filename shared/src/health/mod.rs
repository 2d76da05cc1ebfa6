//! Health accounting.
//!
//! Process-wide named counters and per-tenant warning/error/critical counts,
//! both updated by the logger on every `warn`, `error` and `critical` call.

pub mod counters;
pub mod tenant;

pub use counters::{MetricCounters, CRITICALS, ERRORS, WARNINGS};
pub use tenant::{HealthCategory, TenantHealthSnapshot, TenantHealthStats};
