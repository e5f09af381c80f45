//! Reconciliation logic for the registry operator's CRDs.
//!
//! - `devfile_registry`: converges the children of a DevfileRegistry and
//!   publishes its URL once the registry answers
//! - `registries_list`: probes every entry of a (Cluster)DevfileRegistriesList
//!   and summarises reachability in its status

pub mod devfile_registry;
pub mod registries_list;


use crate::backoff::FibonacciBackoff;
use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::store::ClusterStore;
use kube::{Resource, ResourceExt};
use kube_runtime::controller::Action;
use registry_probe::Prober;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{error, warn};

/// Backoff applied to transient reconcile failures: starts at 5s and grows
/// along the Fibonacci sequence up to 5 minutes
pub const ERROR_BACKOFF: FibonacciBackoff = FibonacciBackoff::new(5, 300);

/// How long an error count survives without a new failure
///
/// Twice the backoff cap: an object that is still failing is retried, and
/// its entry refreshed, well within this window.
pub const ERROR_COUNT_TTL: Duration = Duration::from_secs(600);

/// Consecutive failures of one object
#[derive(Debug, Clone, Copy)]
struct ErrorRecord {
    count: u32,
    last_failure: Instant,
}

/// Shared context of every reconcile pass
pub struct Reconciler {
    pub(crate) store: Box<dyn ClusterStore>,
    pub(crate) prober: Box<dyn Prober>,
    /// Whether the cluster serves `route.openshift.io`, decided once at start-up
    pub(crate) route_support: bool,
    pub(crate) config: ControllerConfig,
    /// Consecutive failures per object, keyed by kind/namespace/name
    error_counts: Arc<Mutex<HashMap<String, ErrorRecord>>>,
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(
        store: impl ClusterStore + 'static,
        prober: impl Prober + 'static,
        route_support: bool,
        config: ControllerConfig,
    ) -> Self {
        Self {
            store: Box::new(store),
            prober: Box::new(prober),
            route_support,
            config,
            error_counts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Increment the error count for an object and return the new count
    pub fn increment_error(&self, key: &str) -> u32 {
        self.increment_error_at(key, Instant::now())
    }

    /// Increment the error count for `key` as of `now`
    ///
    /// Entries not refreshed within [`ERROR_COUNT_TTL`] belong to objects that
    /// stopped failing without a successful pass (deleted mid-backoff) and
    /// are dropped.
    fn increment_error_at(&self, key: &str, now: Instant) -> u32 {
        match self.error_counts.lock() {
            Ok(mut counts) => {
                counts.retain(|_, record| now.saturating_duration_since(record.last_failure) < ERROR_COUNT_TTL);
                let record = counts.entry(key.to_string()).or_insert(ErrorRecord {
                    count: 0,
                    last_failure: now,
                });
                record.count = record.count.saturating_add(1);
                record.last_failure = now;
                record.count
            }
            Err(e) => {
                warn!("Failed to lock error counts: {}, using first backoff step", e);
                1
            }
        }
    }

    /// Reset the error count for an object after a successful pass
    pub fn reset_error(&self, key: &str) {
        if let Ok(mut counts) = self.error_counts.lock() {
            counts.remove(key);
        }
    }

    /// Current error count for an object
    pub fn error_count(&self, key: &str) -> u32 {
        self.error_counts
            .lock()
            .map(|counts| counts.get(key).map_or(0, |record| record.count))
            .unwrap_or(0)
    }
}

/// Key identifying an object in the error-count map
pub fn object_key<K>(obj: &K) -> String
where
    K: Resource<DynamicType = ()>,
{
    match obj.meta().namespace.as_deref() {
        Some(namespace) => format!("{}/{}/{}", K::kind(&()), namespace, obj.name_any()),
        None => format!("{}/{}", K::kind(&()), obj.name_any()),
    }
}

/// Record the outcome of a pass for backoff bookkeeping
pub(crate) fn track_result<K>(
    ctx: &Reconciler,
    obj: &K,
    result: Result<Action, ControllerError>,
) -> Result<Action, ControllerError>
where
    K: Resource<DynamicType = ()>,
{
    if result.is_ok() {
        ctx.reset_error(&object_key(obj));
    }
    result
}

/// Error policy shared by every controller
///
/// Transient failures requeue after a Fibonacci delay that grows with the
/// object's consecutive failures. Permanent failures wait for the object to
/// change.
pub fn error_policy<K>(obj: Arc<K>, error: &ControllerError, ctx: Arc<Reconciler>) -> Action
where
    K: Resource<DynamicType = ()>,
{
    let key = object_key(obj.as_ref());
    if error.is_transient() {
        let count = ctx.increment_error(&key);
        let delay = ERROR_BACKOFF.delay_for(count);
        warn!("Reconciling {} failed ({} in a row): {}, retrying in {:?}", key, count, error, delay);
        Action::requeue(delay)
    } else {
        error!("Reconciling {} failed permanently: {}, waiting for a spec change", key, error);
        Action::await_change()
    }
}
