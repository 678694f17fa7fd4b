//! WebSocket client connection state.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;

use super::subscriptions::SubscriptionRegistry;

/// Represents one connected WebSocket client.
///
/// Shared between the inbound dispatch tasks, the notification listener,
/// and the close path. Sending goes through a bounded channel drained by the
/// connection's single socket writer; once that writer is gone, every send
/// fails and the message is suppressed rather than surfaced.
pub struct WsConnection {
    /// Unique connection id.
    pub id: String,
    /// Subscriptions owned by this connection.
    pub subscriptions: SubscriptionRegistry,
    /// Send channel to the connection's socket write task.
    tx: mpsc::Sender<String>,
    /// Count of messages dropped due to a full or closed channel.
    dropped_messages: AtomicU64,
}

impl WsConnection {
    /// Create connection state around the outbound channel.
    pub fn new(id: String, tx: mpsc::Sender<String>) -> Self {
        Self {
            id,
            subscriptions: SubscriptionRegistry::new(),
            tx,
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Enqueue a text message for the client.
    ///
    /// Returns `false` when the channel is full or closed; the drop counter
    /// is incremented and the message is discarded.
    pub fn send(&self, message: String) -> bool {
        if self.tx.try_send(message).is_ok() {
            true
        } else {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Total messages dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }
}
