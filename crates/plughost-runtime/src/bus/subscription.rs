//! Subscription handles and per-extension subscription scopes.

use std::sync::Weak;

use tokio::sync::Mutex;
use tracing::debug;

use super::BusInner;

/// Handle to one registered handler.
#[derive(Debug)]
pub struct Subscription {
    pub(super) bus: Weak<BusInner>,
    pub(super) id: u64,
    pub(super) event: String,
}

impl Subscription {
    /// Event name this subscription listens to.
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Removes the handler. Returns `false` if it was already gone.
    pub async fn unsubscribe(self) -> bool {
        match self.bus.upgrade() {
            Some(bus) => bus.remove(&self.event, self.id).await,
            None => false,
        }
    }
}

/// Subscriptions owned by one extension, released together when the
/// extension stops.
#[derive(Debug)]
pub struct SubscriptionScope {
    owner: String,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl SubscriptionScope {
    /// Creates an empty scope for `owner`.
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Owning extension id.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Takes ownership of a subscription.
    pub async fn add(&self, subscription: Subscription) {
        self.subscriptions.lock().await.push(subscription);
    }

    /// Number of live subscriptions.
    pub async fn len(&self) -> usize {
        self.subscriptions.lock().await.len()
    }

    /// Unsubscribes everything; returns how many handlers were removed.
    pub async fn release(&self) -> usize {
        let subscriptions = std::mem::take(&mut *self.subscriptions.lock().await);
        let mut removed = 0;
        for subscription in subscriptions {
            if subscription.unsubscribe().await {
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(extension_id = %self.owner, removed, "Released event subscriptions");
        }
        removed
    }
}
