//! API route definitions.
//!
//! This module organizes all HTTP routes for the Tenantlog API server.

mod health;
mod logs;
mod metrics;
mod tenants;

pub use health::health_routes;
pub use logs::logs_routes;
pub use metrics::metrics_routes;
pub use tenants::tenant_routes;
