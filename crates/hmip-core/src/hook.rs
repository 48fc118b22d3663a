// ── Notification hook ──
//
// Fan-out of applied event batches to registered callbacks. Callbacks run
// synchronously on the dispatcher task, in registration order. A callback
// that fails (or panics) is logged and the rest still run.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;
use tracing::{error, warn};

use crate::dispatch::EventBatch;

pub type HookError = Box<dyn std::error::Error + Send + Sync>;

type Callback = Arc<dyn Fn(&EventBatch) -> Result<(), HookError> + Send + Sync>;

/// Handle returned by [`EventHook::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct EventHook {
    next_id: AtomicU64,
    subscribers: ArcSwap<Vec<(SubscriptionId, Callback)>>,
}

impl EventHook {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            subscribers: ArcSwap::from_pointee(Vec::new()),
        }
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&EventBatch) -> Result<(), HookError> + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let callback: Callback = Arc::new(callback);
        self.subscribers.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push((id, Arc::clone(&callback)));
            next
        });
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let previous = self.subscribers.rcu(|current| {
            current
                .iter()
                .filter(|(sid, _)| *sid != id)
                .cloned()
                .collect::<Vec<_>>()
        });
        previous.iter().any(|(sid, _)| *sid == id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.load().len()
    }

    /// Deliver `batch` to every subscriber. Returns how many failed.
    pub fn fire(&self, batch: &EventBatch) -> usize {
        let subscribers = self.subscribers.load_full();
        let mut failures = 0;
        for (id, callback) in subscribers.iter() {
            match catch_unwind(AssertUnwindSafe(|| callback(batch))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    warn!(subscription = id.0, error = %e, "event callback failed");
                }
                Err(_) => {
                    failures += 1;
                    error!(subscription = id.0, "event callback panicked");
                }
            }
        }
        failures
    }
}

impl Default for EventHook {
    fn default() -> Self {
        Self::new()
    }
}
