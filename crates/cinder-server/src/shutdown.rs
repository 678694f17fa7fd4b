//! Graceful shutdown coordination via `CancellationToken`.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Default timeout before giving up on draining tasks.
const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Coordinates shutdown across the accept loop and open sessions.
///
/// Cancellation is the only stop signal the transport recognizes: it ends
/// the accept loop and lets in-flight work finish, it does not abort
/// provider calls mid-request.
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Create a new coordinator.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// A token clone for a task that wants to observe shutdown.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Signal shutdown. Idempotent.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    /// Whether shutdown has been signaled.
    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Signal shutdown and wait for the given tasks, up to `timeout`
    /// (default 30s). Tasks still running after the deadline are left to
    /// die with the process.
    pub async fn drain(&self, handles: Vec<JoinHandle<()>>, timeout: Option<Duration>) {
        let timeout = timeout.unwrap_or(DEFAULT_DRAIN_TIMEOUT);
        self.trigger();
        info!(
            task_count = handles.len(),
            timeout_secs = timeout.as_secs(),
            "draining tasks"
        );

        let all = futures::future::join_all(handles);
        if tokio::time::timeout(timeout, all).await.is_err() {
            warn!("shutdown drain timed out after {timeout:?}");
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
