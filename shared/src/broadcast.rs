//! In-process publish/subscribe for live log streaming.
//!
//! Events are published on namespaces made of a root and a key separated by
//! `::`: `logs::<tenant>` for tenant entries and `logs::*` for platform-wide
//! ones. Only the first `::` separates, so the key is opaque and a tenant id
//! may itself contain `::`. A pattern segment of `*` matches any root or key,
//! so `logs::*` receives every entry while `logs::bot-1` only receives that
//! tenant's entries.
//!
//! Delivery is synchronous, in subscription order, and best effort: a
//! panicking listener is reported through `tracing` and skipped.

use crate::models::LogLevel;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};
use thiserror::Error;

/// Namespace segments: the root and the opaque key after the first `::`.
const SEGMENTS: usize = 2;

/// Segment that matches anything in a subscription pattern.
pub const WILDCARD: &str = "*";

/// Separator between namespace segments.
pub const DELIMITER: &str = "::";

/// Root segment of every log namespace.
pub const LOG_NAMESPACE: &str = "logs";

/// Registrations beyond this count trigger a one-time leak warning.
pub const LEAK_WARNING_THRESHOLD: usize = 1000;

/// Builds the namespace a log entry is published on.
///
/// # Example
///
/// ```
/// use shared::broadcast::log_namespace;
///
/// assert_eq!(log_namespace(Some("bot-1")), "logs::bot-1");
/// assert_eq!(log_namespace(None), "logs::*");
/// ```
#[must_use]
pub fn log_namespace(tenant_id: Option<&str>) -> String {
    format!("{LOG_NAMESPACE}{DELIMITER}{}", tenant_id.unwrap_or(WILDCARD))
}

fn split_namespace(namespace: &str) -> impl Iterator<Item = &str> {
    namespace.splitn(SEGMENTS, DELIMITER)
}

/// Errors returned by the broadcaster.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BroadcastError {
    /// The subscription target is malformed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// A log entry as seen by stream subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Namespace the event was published on.
    pub namespace: String,
    /// Severity of the entry.
    pub level: LogLevel,
    /// Indented message, stack trace included when shown.
    pub message: String,
    /// Serialized metadata.
    pub metadata: String,
}

type Listener = Arc<dyn Fn(&LogEvent) + Send + Sync>;

struct Registration {
    id: u64,
    pattern: Vec<String>,
    listener: Listener,
}

impl Registration {
    fn matches(&self, namespace: &[&str]) -> bool {
        self.pattern.len() == namespace.len()
            && self
                .pattern
                .iter()
                .zip(namespace)
                .all(|(pattern, segment)| pattern == WILDCARD || pattern == segment)
    }
}

#[derive(Default)]
struct Registry {
    registrations: RwLock<Vec<Registration>>,
    next_id: AtomicU64,
    leak_warned: AtomicBool,
}

impl Registry {
    fn remove(&self, id: u64) {
        let mut registrations = self
            .registrations
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        registrations.retain(|r| r.id != id);
    }
}

/// Wildcard-capable publish/subscribe bus for log events.
///
/// Cloning yields another handle to the same registry. Subscribing or
/// disposing from inside a listener, or from another thread during a
/// publish, is safe: each publish delivers to a snapshot of the listeners
/// registered when it started.
#[derive(Clone, Default)]
pub struct LogBroadcaster {
    registry: Arc<Registry>,
}

impl LogBroadcaster {
    /// Creates a broadcaster with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for every namespace matching `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`BroadcastError::InvalidArgument`] if the pattern is empty or
    /// its root or key is empty.
    pub fn subscribe<F>(&self, pattern: &str, listener: F) -> Result<Subscription, BroadcastError>
    where
        F: Fn(&LogEvent) + Send + Sync + 'static,
    {
        let segments: Vec<String> = split_namespace(pattern).map(str::to_string).collect();
        if pattern.is_empty() || segments.iter().any(String::is_empty) {
            return Err(BroadcastError::InvalidArgument(format!(
                "subscription pattern {pattern:?} must be a non-empty root and key"
            )));
        }

        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        let count = {
            let mut registrations = self
                .registry
                .registrations
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            registrations.push(Registration {
                id,
                pattern: segments,
                listener: Arc::new(listener),
            });
            registrations.len()
        };

        if count > LEAK_WARNING_THRESHOLD && !self.registry.leak_warned.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                listeners = count,
                threshold = LEAK_WARNING_THRESHOLD,
                "Possible log listener leak: subscriptions are never disposed"
            );
        }

        Ok(Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
            disposed: AtomicBool::new(false),
        })
    }

    /// Registers `listener` for one tenant's entries, or for all entries when
    /// `tenant_id` is `*`.
    ///
    /// # Errors
    ///
    /// Returns [`BroadcastError::InvalidArgument`] if `tenant_id` is blank.
    pub fn subscribe_tenant<F>(
        &self,
        tenant_id: &str,
        listener: F,
    ) -> Result<Subscription, BroadcastError>
    where
        F: Fn(&LogEvent) + Send + Sync + 'static,
    {
        if tenant_id.trim().is_empty() {
            return Err(BroadcastError::InvalidArgument(format!(
                "tenant id {tenant_id:?} must not be blank"
            )));
        }
        self.subscribe(&log_namespace(Some(tenant_id)), listener)
    }

    /// Delivers `event` to every listener whose pattern matches `namespace`.
    ///
    /// Returns the number of listeners invoked.
    pub fn publish(&self, namespace: &str, event: &LogEvent) -> usize {
        let segments: Vec<&str> = split_namespace(namespace).collect();
        let targets: Vec<Listener> = {
            let registrations = self
                .registry
                .registrations
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            registrations
                .iter()
                .filter(|r| r.matches(&segments))
                .map(|r| Arc::clone(&r.listener))
                .collect()
        };

        for listener in &targets {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                tracing::warn!(namespace, "Log listener panicked, event skipped for it");
            }
        }
        targets.len()
    }

    /// Number of live registrations.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.registry
            .registrations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl std::fmt::Debug for LogBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogBroadcaster")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Handle to one registration.
///
/// Dropping the handle leaves the listener registered; call
/// [`Subscription::dispose`] to remove it.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<Registry>,
    disposed: AtomicBool,
}

impl Subscription {
    /// Removes this registration. Calling it again is a no-op.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }

    /// Returns true once [`Subscription::dispose`] has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn event(namespace: &str, message: &str) -> LogEvent {
        LogEvent {
            namespace: namespace.to_string(),
            level: LogLevel::Info,
            message: message.to_string(),
            metadata: String::new(),
        }
    }

    fn publish(broadcaster: &LogBroadcaster, tenant: Option<&str>, message: &str) -> usize {
        let namespace = log_namespace(tenant);
        broadcaster.publish(&namespace, &event(&namespace, message))
    }

    fn collector() -> (Arc<Mutex<Vec<String>>>, impl Fn(&LogEvent) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |e: &LogEvent| sink.lock().unwrap().push(e.message.clone()))
    }

    #[test]
    fn test_wildcard_receives_every_tenant() {
        let broadcaster = LogBroadcaster::new();
        let (seen, listener) = collector();
        broadcaster.subscribe_tenant(WILDCARD, listener).unwrap();

        publish(&broadcaster, Some("bot-a"), "a");
        publish(&broadcaster, Some("bot-b"), "b");
        publish(&broadcaster, None, "platform");

        assert_eq!(*seen.lock().unwrap(), vec!["a", "b", "platform"]);
    }

    #[test]
    fn test_tenant_subscription_is_isolated() {
        let broadcaster = LogBroadcaster::new();
        let (seen, listener) = collector();
        broadcaster.subscribe_tenant("bot-a", listener).unwrap();

        publish(&broadcaster, Some("bot-b"), "other tenant");
        publish(&broadcaster, None, "platform");
        publish(&broadcaster, Some("bot-a"), "mine");

        assert_eq!(*seen.lock().unwrap(), vec!["mine"]);
    }

    #[test]
    fn test_delivery_follows_subscription_order() {
        let broadcaster = LogBroadcaster::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..5 {
            let order = Arc::clone(&order);
            broadcaster
                .subscribe("logs::*", move |_| order.lock().unwrap().push(i))
                .unwrap();
        }

        assert_eq!(publish(&broadcaster, Some("bot-a"), "x"), 5);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_dispose_twice_is_noop() {
        let broadcaster = LogBroadcaster::new();
        let (seen, listener) = collector();
        let subscription = broadcaster.subscribe_tenant("bot-a", listener).unwrap();

        publish(&broadcaster, Some("bot-a"), "before");
        subscription.dispose();
        subscription.dispose();
        publish(&broadcaster, Some("bot-a"), "after");

        assert!(subscription.is_disposed());
        assert_eq!(*seen.lock().unwrap(), vec!["before"]);
        assert_eq!(broadcaster.listener_count(), 0);
    }

    #[test]
    fn test_dispose_removes_only_its_registration() {
        let broadcaster = LogBroadcaster::new();
        let (first_seen, first) = collector();
        let (second_seen, second) = collector();
        let first_sub = broadcaster.subscribe_tenant("bot-a", first).unwrap();
        broadcaster.subscribe_tenant("bot-a", second).unwrap();

        first_sub.dispose();
        publish(&broadcaster, Some("bot-a"), "hello");

        assert!(first_seen.lock().unwrap().is_empty());
        assert_eq!(*second_seen.lock().unwrap(), vec!["hello"]);
    }

    #[test]
    fn test_invalid_targets_are_rejected() {
        let broadcaster = LogBroadcaster::new();
        assert!(matches!(
            broadcaster.subscribe_tenant("", |_| {}),
            Err(BroadcastError::InvalidArgument(_))
        ));
        assert!(matches!(
            broadcaster.subscribe_tenant("  ", |_| {}),
            Err(BroadcastError::InvalidArgument(_))
        ));
        assert!(matches!(
            broadcaster.subscribe("::bot-a", |_| {}),
            Err(BroadcastError::InvalidArgument(_))
        ));
        assert!(matches!(
            broadcaster.subscribe("logs::", |_| {}),
            Err(BroadcastError::InvalidArgument(_))
        ));
        assert_eq!(broadcaster.listener_count(), 0);
    }

    #[test]
    fn test_tenant_with_delimiter_is_one_key() {
        let broadcaster = LogBroadcaster::new();
        let (all, all_listener) = collector();
        let (org, org_listener) = collector();
        let (prefix, prefix_listener) = collector();
        broadcaster.subscribe_tenant(WILDCARD, all_listener).unwrap();
        broadcaster.subscribe_tenant("org::bot", org_listener).unwrap();
        broadcaster.subscribe_tenant("org", prefix_listener).unwrap();

        publish(&broadcaster, Some("org::bot"), "nested");
        publish(&broadcaster, Some("org"), "parent");

        assert_eq!(*all.lock().unwrap(), vec!["nested", "parent"]);
        assert_eq!(*org.lock().unwrap(), vec!["nested"]);
        assert_eq!(*prefix.lock().unwrap(), vec!["parent"]);
    }

    #[test]
    fn test_no_cap_on_registrations() {
        let broadcaster = LogBroadcaster::new();
        let subscriptions: Vec<_> = (0..1500)
            .map(|_| broadcaster.subscribe_tenant(WILDCARD, |_| {}).unwrap())
            .collect();

        assert_eq!(broadcaster.listener_count(), 1500);
        assert_eq!(publish(&broadcaster, Some("bot-a"), "x"), 1500);
        drop(subscriptions);
        assert_eq!(broadcaster.listener_count(), 1500);
    }

    #[test]
    fn test_listener_may_dispose_itself_during_delivery() {
        let broadcaster = LogBroadcaster::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let calls = Arc::new(AtomicU64::new(0));

        let subscription = {
            let slot = Arc::clone(&slot);
            let calls = Arc::clone(&calls);
            broadcaster
                .subscribe_tenant(WILDCARD, move |_| {
                    calls.fetch_add(1, Ordering::Relaxed);
                    if let Some(sub) = slot.lock().unwrap().as_ref() {
                        sub.dispose();
                    }
                })
                .unwrap()
        };
        *slot.lock().unwrap() = Some(subscription);

        publish(&broadcaster, None, "first");
        publish(&broadcaster, None, "second");

        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_listener_may_subscribe_during_delivery() {
        let broadcaster = LogBroadcaster::new();
        let inner = broadcaster.clone();
        broadcaster
            .subscribe_tenant(WILDCARD, move |_| {
                inner.subscribe_tenant(WILDCARD, |_| {}).unwrap();
            })
            .unwrap();

        assert_eq!(publish(&broadcaster, None, "grow"), 1);
        assert_eq!(broadcaster.listener_count(), 2);
    }

    #[test]
    fn test_panicking_listener_does_not_stop_delivery() {
        let broadcaster = LogBroadcaster::new();
        let (seen, listener) = collector();
        broadcaster
            .subscribe_tenant(WILDCARD, |_| panic!("listener bug"))
            .unwrap();
        broadcaster.subscribe_tenant(WILDCARD, listener).unwrap();

        publish(&broadcaster, None, "still delivered");

        assert_eq!(*seen.lock().unwrap(), vec!["still delivered"]);
    }

    #[test]
    fn test_dispose_after_broadcaster_dropped() {
        let broadcaster = LogBroadcaster::new();
        let subscription = broadcaster.subscribe_tenant("bot-a", |_| {}).unwrap();
        drop(broadcaster);
        subscription.dispose();
        assert!(subscription.is_disposed());
    }
}
