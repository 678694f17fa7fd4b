//! Built-in development provider.
//!
//! A minimal execution backend so the gateway runs end-to-end out of the
//! box: canned chain identity answers, a block counter advanced by the
//! miner task, and `newHeads` subscriptions pushed through the notification
//! hub. This is wiring, not an EVM — unknown methods report method-not-found
//! exactly like a real provider would.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use cinder_core::{NotificationHub, Provider, ProviderError, ProviderNotification};

/// In-process chain simulator behind the [`Provider`] seam.
pub struct DevProvider {
    chain_id: u64,
    block_number: AtomicU64,
    next_subscription: AtomicU64,
    head_subscriptions: Mutex<HashSet<String>>,
    hub: NotificationHub,
}

impl DevProvider {
    /// Create a provider for the given chain id, starting at block 0.
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            block_number: AtomicU64::new(0),
            next_subscription: AtomicU64::new(1),
            head_subscriptions: Mutex::new(HashSet::new()),
            hub: NotificationHub::default(),
        }
    }

    /// Advance the chain one block and notify `newHeads` subscribers.
    pub fn mine_block(&self) -> u64 {
        let number = self.block_number.fetch_add(1, Ordering::Relaxed) + 1;
        let header = json!({
            "number": format!("{number:#x}"),
            "hash": format!("{number:#066x}"),
            "parentHash": format!("{:#066x}", number - 1),
        });

        let subscriptions: Vec<String> =
            self.head_subscriptions.lock().iter().cloned().collect();
        for subscription in subscriptions {
            let _ = self
                .hub
                .publish(ProviderNotification::new(subscription, header.clone()));
        }
        debug!(number, "mined block");
        number
    }

    /// Spawn the block-producing task.
    pub fn spawn_miner(self: Arc<Self>, block_interval: Duration) -> JoinHandle<()> {
        let provider = self;
        info!(interval_ms = block_interval.as_millis(), "starting miner");
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(block_interval);
            // Skip the immediate first tick.
            let _ = ticker.tick().await;
            loop {
                let _ = ticker.tick().await;
                let _ = provider.mine_block();
            }
        })
    }

    fn subscribe_new_heads(&self) -> String {
        let id = format!(
            "{:#x}",
            self.next_subscription.fetch_add(1, Ordering::Relaxed)
        );
        let _ = self.head_subscriptions.lock().insert(id.clone());
        id
    }

    fn unsubscribe(&self, id: &str) -> bool {
        self.head_subscriptions.lock().remove(id)
    }
}

#[async_trait]
impl Provider for DevProvider {
    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, ProviderError> {
        match method {
            "eth_chainId" => Ok(json!(format!("{:#x}", self.chain_id))),
            "net_version" => Ok(json!(self.chain_id.to_string())),
            "web3_clientVersion" => {
                Ok(json!(concat!("cinder/v", env!("CARGO_PKG_VERSION"))))
            }
            "eth_blockNumber" => Ok(json!(format!(
                "{:#x}",
                self.block_number.load(Ordering::Relaxed)
            ))),
            "eth_subscribe" => match params.first().and_then(Value::as_str) {
                Some("newHeads") => Ok(json!(self.subscribe_new_heads())),
                Some(other) => Err(ProviderError::invalid_params(format!(
                    "unsupported subscription type {other:?}"
                ))),
                None => Err(ProviderError::invalid_params(
                    "eth_subscribe expects a subscription type",
                )),
            },
            "eth_unsubscribe" => match params.first().and_then(Value::as_str) {
                Some(id) => Ok(json!(self.unsubscribe(id))),
                None => Err(ProviderError::invalid_params(
                    "eth_unsubscribe expects a subscription id",
                )),
            },
            other => Err(ProviderError::method_not_found(other)),
        }
    }

    fn notifications(&self) -> broadcast::Receiver<ProviderNotification> {
        self.hub.subscribe()
    }
}
