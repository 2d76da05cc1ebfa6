//! Process-wide named counters.

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter incremented by every `warn` call.
pub const WARNINGS: &str = "warnings";
/// Counter incremented by every `error` call.
pub const ERRORS: &str = "errors";
/// Counter incremented by every `critical` call.
pub const CRITICALS: &str = "criticals";

/// Monotonic counters keyed by name.
///
/// Counters start at zero and only ever grow. The map locks a shard only when
/// a name is seen for the first time; increments are atomic adds.
///
/// # Example
///
/// ```
/// use shared::health::{MetricCounters, WARNINGS};
///
/// let counters = MetricCounters::new();
/// counters.increment(WARNINGS);
/// counters.increment(WARNINGS);
/// assert_eq!(counters.get(WARNINGS), 2);
/// assert_eq!(counters.get("unknown"), 0);
/// ```
#[derive(Debug, Default)]
pub struct MetricCounters {
    counters: DashMap<String, AtomicU64>,
}

impl MetricCounters {
    /// Creates an empty counter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one to `name`.
    pub fn increment(&self, name: &str) {
        self.increment_by(name, 1);
    }

    /// Adds `value` to `name`.
    pub fn increment_by(&self, name: &str, value: u64) {
        if let Some(counter) = self.counters.get(name) {
            counter.fetch_add(value, Ordering::Relaxed);
            return;
        }
        self.counters
            .entry(name.to_string())
            .or_default()
            .fetch_add(value, Ordering::Relaxed);
    }

    /// Current value of `name`, zero if never incremented.
    #[must_use]
    pub fn get(&self, name: &str) -> u64 {
        self.counters
            .get(name)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    /// Snapshot of every counter, sorted by name.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        self.counters
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
            .collect()
    }
}
