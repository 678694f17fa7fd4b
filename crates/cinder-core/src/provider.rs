//! The execution provider trait.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::ProviderError;
use crate::notification::ProviderNotification;

/// An execution backend answering RPC method calls.
///
/// Implementations own all method semantics (chain emulation, state,
/// mempool); the transport layer only ever invokes [`Self::request`] and
/// listens to [`Self::notifications`]. Both must be safe to call
/// concurrently from many transport tasks — the provider is shared across
/// every connection and request.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Execute one RPC method call.
    ///
    /// This is the transport pipeline's only suspension point besides
    /// socket I/O. Failures carry the provider's own error taxonomy.
    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, ProviderError>;

    /// Attach a notification listener for subscription pushes.
    ///
    /// One receiver per connection; dropping it detaches the listener.
    fn notifications(&self) -> broadcast::Receiver<ProviderNotification>;
}
