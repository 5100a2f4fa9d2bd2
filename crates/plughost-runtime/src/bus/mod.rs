//! In-process publish/subscribe bus for extension events.
//!
//! Handlers are snapshotted when an event is published, so subscriptions
//! added during delivery only see later events. Every handler call runs
//! under a timeout with panics caught; a failing handler is logged and
//! counted, never propagated to the publisher or to other handlers.

pub mod handler;
pub mod subscription;

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::FutureExt;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use plughost_core::events::{DomainEvent, WILDCARD};

use crate::lifecycle::panic_message;

pub use handler::{EventHandler, FnHandler};
pub use subscription::{Subscription, SubscriptionScope};

/// Default per-handler delivery timeout.
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of delivering one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    /// Handlers that completed successfully.
    pub delivered: usize,
    /// Handlers that returned an error, panicked, or timed out.
    pub failed: usize,
}

#[derive(Debug)]
struct HandlerEntry {
    id: u64,
    handler: Arc<dyn EventHandler>,
}

#[derive(Debug)]
struct BusInner {
    handlers: RwLock<HashMap<String, Vec<HandlerEntry>>>,
    next_id: AtomicU64,
    handler_timeout: Duration,
}

impl BusInner {
    async fn remove(&self, event: &str, id: u64) -> bool {
        let mut handlers = self.handlers.write().await;
        let Some(entries) = handlers.get_mut(event) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|e| e.id != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            handlers.remove(event);
        }
        removed
    }
}

/// Cloneable handle to the event bus.
#[derive(Debug, Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Creates a bus with the default handler timeout.
    pub fn new() -> Self {
        Self::with_handler_timeout(DEFAULT_HANDLER_TIMEOUT)
    }

    /// Creates a bus whose handlers are abandoned after `timeout`.
    pub fn with_handler_timeout(timeout: Duration) -> Self {
        Self {
            inner: Arc::new(BusInner {
                handlers: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                handler_timeout: timeout,
            }),
        }
    }

    /// Registers `handler` for `event` (`"*"` for every event).
    pub async fn subscribe(&self, event: &str, handler: Arc<dyn EventHandler>) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(event = %event, handler = %handler.name(), "Event handler subscribed");

        self.inner
            .handlers
            .write()
            .await
            .entry(event.to_string())
            .or_default()
            .push(HandlerEntry { id, handler });

        Subscription {
            bus: Arc::downgrade(&self.inner),
            id,
            event: event.to_string(),
        }
    }

    /// Delivers `event` to its subscribers and waits for all of them.
    pub async fn publish(&self, event: DomainEvent) -> DeliveryReport {
        let handlers = self.snapshot(&event.name).await;
        let mut report = DeliveryReport::default();

        if handlers.is_empty() {
            debug!(event = %event.name, "No subscribers for event");
            return report;
        }

        for handler in handlers {
            let call = AssertUnwindSafe(handler.handle(&event)).catch_unwind();
            match tokio::time::timeout(self.inner.handler_timeout, call).await {
                Ok(Ok(Ok(()))) => report.delivered += 1,
                Ok(Ok(Err(reason))) => {
                    warn!(
                        event = %event.name,
                        handler = %handler.name(),
                        error = %reason,
                        "Event handler failed"
                    );
                    report.failed += 1;
                }
                Ok(Err(panic)) => {
                    error!(
                        event = %event.name,
                        handler = %handler.name(),
                        panic = %panic_message(panic.as_ref()),
                        "Event handler panicked"
                    );
                    report.failed += 1;
                }
                Err(_) => {
                    error!(
                        event = %event.name,
                        handler = %handler.name(),
                        timeout_ms = self.inner.handler_timeout.as_millis() as u64,
                        "Event handler timed out"
                    );
                    report.failed += 1;
                }
            }
        }

        debug!(
            event = %event.name,
            delivered = report.delivered,
            failed = report.failed,
            "Event delivered"
        );
        report
    }

    /// Fire-and-forget publish on the current runtime.
    pub fn emit(&self, event: DomainEvent) {
        let bus = self.clone();
        tokio::spawn(async move {
            bus.publish(event).await;
        });
    }

    /// Number of handlers registered for `event` (wildcards excluded).
    pub async fn subscriber_count(&self, event: &str) -> usize {
        self.inner
            .handlers
            .read()
            .await
            .get(event)
            .map(Vec::len)
            .unwrap_or(0)
    }

    async fn snapshot(&self, event: &str) -> Vec<Arc<dyn EventHandler>> {
        let handlers = self.inner.handlers.read().await;
        let named = handlers.get(event).into_iter().flatten();
        let wildcard = if event == WILDCARD {
            None
        } else {
            handlers.get(WILDCARD)
        };
        named
            .chain(wildcard.into_iter().flatten())
            .map(|e| Arc::clone(&e.handler))
            .collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[derive(Debug)]
    struct Panicking;

    #[async_trait::async_trait]
    impl EventHandler for Panicking {
        fn name(&self) -> &str {
            "panics"
        }

        async fn handle(&self, _event: &DomainEvent) -> Result<(), String> {
            panic!("handler bug")
        }
    }

    fn counter(name: &str, hits: Arc<AtomicUsize>) -> Arc<dyn EventHandler> {
        Arc::new(FnHandler::new(name, move |_event| {
            let hits = Arc::clone(&hits);
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Ok::<(), String>(())
            }
        }))
    }

    #[tokio::test]
    async fn test_publish_reaches_named_and_wildcard() {
        let bus = EventBus::new();
        let named = Arc::new(AtomicUsize::new(0));
        let any = Arc::new(AtomicUsize::new(0));
        bus.subscribe("file:deleted", counter("named", named.clone())).await;
        bus.subscribe(WILDCARD, counter("any", any.clone())).await;

        let report = bus
            .publish(DomainEvent::new("file:deleted", serde_json::json!({"key": "a"})))
            .await;
        assert_eq!(report, DeliveryReport { delivered: 2, failed: 0 });

        bus.publish(DomainEvent::new("plugin:activated", serde_json::Value::Null))
            .await;
        assert_eq!(named.load(Ordering::SeqCst), 1);
        assert_eq!(any.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failing_handlers_are_isolated() {
        let bus = EventBus::with_handler_timeout(Duration::from_millis(50));
        let hits = Arc::new(AtomicUsize::new(0));

        bus.subscribe(
            "x",
            Arc::new(FnHandler::new("errs", |_| async {
                Err::<(), String>("boom".to_string())
            })),
        )
        .await;
        bus.subscribe("x", Arc::new(Panicking)).await;
        bus.subscribe(
            "x",
            Arc::new(FnHandler::new("hangs", |_| async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok::<(), String>(())
            })),
        )
        .await;
        bus.subscribe("x", counter("ok", hits.clone())).await;

        let report = bus.publish(DomainEvent::new("x", serde_json::Value::Null)).await;
        assert_eq!(report.failed, 3);
        assert_eq!(report.delivered, 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unsubscribe_and_scope_release() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let sub = bus.subscribe("x", counter("one", hits.clone())).await;
        assert!(sub.unsubscribe().await);
        assert_eq!(bus.subscriber_count("x").await, 0);

        let scope = SubscriptionScope::new("oauth");
        scope.add(bus.subscribe("x", counter("a", hits.clone())).await).await;
        scope.add(bus.subscribe("y", counter("b", hits.clone())).await).await;
        assert_eq!(scope.len().await, 2);
        assert_eq!(scope.release().await, 2);
        assert_eq!(scope.len().await, 0);

        bus.publish(DomainEvent::new("x", serde_json::Value::Null)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_subscriber_added_during_delivery_misses_event() {
        let bus = EventBus::new();
        let late_hits = Arc::new(AtomicUsize::new(0));

        let bus_for_handler = bus.clone();
        let late = late_hits.clone();
        bus.subscribe(
            "x",
            Arc::new(FnHandler::new("subscriber", move |_| {
                let bus = bus_for_handler.clone();
                let late = late.clone();
                async move {
                    bus.subscribe("x", counter("late", late)).await;
                    Ok::<(), String>(())
                }
            })),
        )
        .await;

        let report = bus.publish(DomainEvent::new("x", serde_json::Value::Null)).await;
        assert_eq!(report.delivered, 1);
        assert_eq!(late_hits.load(Ordering::SeqCst), 0);
    }
}
