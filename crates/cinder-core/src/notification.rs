//! Provider notification broadcasting.
//!
//! Notifications do not belong to any request/response pair; a provider
//! pushes them whenever a subscribed event fires. The hub is an explicit
//! publish/subscribe point: one hub per provider, one receiver per listening
//! connection. Dropping a receiver is the remove-listener step — teardown is
//! a visible, testable operation rather than implicit cleanup.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

/// Default hub capacity; listeners slower than this lag and skip.
const DEFAULT_CAPACITY: usize = 256;

/// A push notification emitted by the provider for an active subscription.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProviderNotification {
    /// The provider-assigned subscription id.
    pub subscription: String,
    /// The pushed payload (block header, log, ...).
    pub result: Value,
}

impl ProviderNotification {
    /// Build a notification.
    pub fn new(subscription: impl Into<String>, result: Value) -> Self {
        Self {
            subscription: subscription.into(),
            result,
        }
    }
}

/// Broadcast point for provider notifications.
#[derive(Debug)]
pub struct NotificationHub {
    tx: broadcast::Sender<ProviderNotification>,
}

impl NotificationHub {
    /// Create a hub with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Attach a listener. Each receiver sees every notification published
    /// after this call; dropping it detaches the listener.
    pub fn subscribe(&self) -> broadcast::Receiver<ProviderNotification> {
        self.tx.subscribe()
    }

    /// Publish to all current listeners.
    ///
    /// Returns the number of listeners that received the notification
    /// (zero when nobody is listening — not an error).
    pub fn publish(&self, notification: ProviderNotification) -> usize {
        self.tx.send(notification).unwrap_or(0)
    }

    /// Number of attached listeners.
    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
