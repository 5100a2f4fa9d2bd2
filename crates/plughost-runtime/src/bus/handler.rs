//! Event handler trait and the closure adapter.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use plughost_core::events::DomainEvent;

/// Receives events from the bus.
#[async_trait]
pub trait EventHandler: Send + Sync + std::fmt::Debug {
    /// Name used in logs when the handler fails.
    fn name(&self) -> &str;

    /// Handles one event. Errors are logged by the bus and never reach the
    /// publisher.
    async fn handle(&self, event: &DomainEvent) -> Result<(), String>;
}

type HandlerFn = Arc<dyn Fn(DomainEvent) -> BoxFuture<'static, Result<(), String>> + Send + Sync>;

/// Adapts an async closure to [`EventHandler`].
pub struct FnHandler {
    name: String,
    handler: HandlerFn,
}

impl std::fmt::Debug for FnHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler")
            .field("name", &self.name)
            .field("handler", &"<closure>")
            .finish()
    }
}

impl FnHandler {
    /// Creates a handler; the closure receives its own copy of the event.
    pub fn new<F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(DomainEvent) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), String>> + Send + 'static,
    {
        Self {
            name: name.into(),
            handler: Arc::new(move |event| Box::pin(handler(event))),
        }
    }
}

#[async_trait]
impl EventHandler for FnHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &DomainEvent) -> Result<(), String> {
        (self.handler)(event.clone()).await
    }
}
