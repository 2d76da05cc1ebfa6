//! Per-tenant health statistics.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Category of a health occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthCategory {
    /// A `warn` call.
    Warning,
    /// An `error` call.
    Error,
    /// A `critical` call.
    Critical,
}

#[derive(Debug, Default)]
struct TenantCounters {
    warnings: AtomicU64,
    errors: AtomicU64,
    criticals: AtomicU64,
    last_occurrence: Mutex<Option<DateTime<Utc>>>,
}

impl TenantCounters {
    fn counter(&self, category: HealthCategory) -> &AtomicU64 {
        match category {
            HealthCategory::Warning => &self.warnings,
            HealthCategory::Error => &self.errors,
            HealthCategory::Critical => &self.criticals,
        }
    }
}

/// Point-in-time view of one tenant's counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantHealthSnapshot {
    /// Tenant the counts belong to.
    pub tenant_id: String,
    /// Number of warnings logged.
    pub warnings: u64,
    /// Number of errors logged.
    pub errors: u64,
    /// Number of criticals logged.
    pub criticals: u64,
    /// Time of the most recent occurrence.
    pub last_occurrence: Option<DateTime<Utc>>,
}

/// Warning, error and critical counts keyed by tenant.
///
/// A tenant's entry is created on its first occurrence and kept for the
/// life of the process. Counts never decrease.
#[derive(Debug, Default)]
pub struct TenantHealthStats {
    tenants: DashMap<String, TenantCounters>,
}

impl TenantHealthStats {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one occurrence of `category` for `tenant_id`.
    pub fn increment(&self, tenant_id: &str, category: HealthCategory) {
        let record = |counters: &TenantCounters| {
            counters.counter(category).fetch_add(1, Ordering::Relaxed);
            if let Ok(mut last) = counters.last_occurrence.lock() {
                *last = Some(Utc::now());
            }
        };

        if let Some(counters) = self.tenants.get(tenant_id) {
            record(counters.value());
            return;
        }
        record(self.tenants.entry(tenant_id.to_string()).or_default().value());
    }

    /// Counts for `tenant_id`, `None` if it never logged a warning or worse.
    #[must_use]
    pub fn get(&self, tenant_id: &str) -> Option<TenantHealthSnapshot> {
        self.tenants
            .get(tenant_id)
            .map(|counters| snapshot_of(tenant_id, counters.value()))
    }

    /// Counts for every known tenant, sorted by tenant id.
    #[must_use]
    pub fn snapshot(&self) -> Vec<TenantHealthSnapshot> {
        let mut all: Vec<_> = self
            .tenants
            .iter()
            .map(|entry| snapshot_of(entry.key(), entry.value()))
            .collect();
        all.sort_by(|a, b| a.tenant_id.cmp(&b.tenant_id));
        all
    }

    /// Number of tenants with recorded occurrences.
    #[must_use]
    pub fn tenant_count(&self) -> usize {
        self.tenants.len()
    }
}

fn snapshot_of(tenant_id: &str, counters: &TenantCounters) -> TenantHealthSnapshot {
    TenantHealthSnapshot {
        tenant_id: tenant_id.to_string(),
        warnings: counters.warnings.load(Ordering::Relaxed),
        errors: counters.errors.load(Ordering::Relaxed),
        criticals: counters.criticals.load(Ordering::Relaxed),
        last_occurrence: counters.last_occurrence.lock().ok().and_then(|last| *last),
    }
}
