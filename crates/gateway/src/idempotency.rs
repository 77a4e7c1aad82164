//! Delivery dedup extension point
//!
//! Shopify redelivers webhooks after missed acknowledgments, and the same
//! delivery id synchronized twice produces duplicate CRM records. Whether to
//! dedup is a deployment decision, so the check is an injection point rather
//! than a hardcoded behavior. The wired default is [`NoopTracker`], which
//! keeps the historical duplicate-producing behavior.
//!
//! The gateway only consults the tracker for topics it would synchronize,
//! and only marks a delivery after its synchronization succeeded. A delivery
//! whose sync failed is never marked, so its redelivery gets another
//! attempt.

use std::collections::HashSet;
use std::sync::Mutex;

/// Tracks which webhook delivery ids have completed synchronization
pub trait DeliveryTracker: Send + Sync {
    /// Has this delivery id already completed a successful synchronization?
    /// Checking does not record anything.
    fn seen_before(&self, delivery_id: &str) -> bool;

    /// Record that this delivery id completed a successful synchronization
    fn mark_seen(&self, delivery_id: &str);
}

/// No dedup: every delivery is treated as new
#[derive(Debug, Default)]
pub struct NoopTracker;

impl DeliveryTracker for NoopTracker {
    fn seen_before(&self, _delivery_id: &str) -> bool {
        false
    }

    fn mark_seen(&self, _delivery_id: &str) {}
}

/// Process-local dedup over a set of seen delivery ids. Resets on restart;
/// good enough to absorb short-window redeliveries.
#[derive(Debug, Default)]
pub struct InMemoryTracker {
    seen: Mutex<HashSet<String>>,
}

impl InMemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeliveryTracker for InMemoryTracker {
    fn seen_before(&self, delivery_id: &str) -> bool {
        match self.seen.lock() {
            Ok(seen) => seen.contains(delivery_id),
            // A poisoned set only means another thread panicked mid-insert;
            // treating the delivery as new matches the no-dedup default.
            Err(_) => false,
        }
    }

    fn mark_seen(&self, delivery_id: &str) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.insert(delivery_id.to_string());
        }
    }
}
