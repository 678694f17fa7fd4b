//! Per-connection subscription tracking.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

/// The set of subscription ids owned by one WebSocket connection.
///
/// Mutated from several concurrent message-handling tasks plus the close
/// path, so both pieces of state are concurrency-safe: the id set behind a
/// mutex and an authoritative `closed` flag that is always consulted before
/// membership. A subscription never outlives its connection — once
/// [`Self::close`] has run, nothing can be tracked and nothing is owned.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    closed: AtomicBool,
    ids: Mutex<HashSet<String>>,
}

impl SubscriptionRegistry {
    /// Create an empty registry for a fresh connection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a subscription id returned by a successful `eth_subscribe`.
    ///
    /// Returns `false` without tracking when the connection has already
    /// closed: the subscribe response may still be delivered best-effort,
    /// but no notification can ever follow, so the id must not linger.
    pub fn track(&self, id: &str) -> bool {
        // Lock first so a concurrent close() drains either before this
        // insert (then closed is observed here) or after it (then close()
        // picks the id up for cleanup).
        let mut ids = self.ids.lock();
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        let _ = ids.insert(id.to_owned());
        true
    }

    /// Drop a subscription id after a successful explicit `eth_unsubscribe`.
    ///
    /// Runs synchronously with the response being sent; a notification
    /// racing the unsubscribe may still slip through (best-effort, not
    /// exactly-once).
    pub fn untrack(&self, id: &str) -> bool {
        self.ids.lock().remove(id)
    }

    /// Whether this connection owns the given subscription id.
    ///
    /// Closed-ness is checked first and is authoritative: a closed
    /// connection owns nothing, even if a stale set still holds the id.
    pub fn owns(&self, id: &str) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        self.ids.lock().contains(id)
    }

    /// Whether the connection has transitioned to closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Mark the connection closed and drain the set.
    ///
    /// Returns the ids that were still tracked so the caller can issue
    /// best-effort `eth_unsubscribe` cleanup. Idempotent: a second call
    /// returns an empty list.
    pub fn close(&self) -> Vec<String> {
        let mut ids = self.ids.lock();
        self.closed.store(true, Ordering::Release);
        ids.drain().collect()
    }
}
