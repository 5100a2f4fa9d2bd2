//! Extension context: what a running extension can reach in the host.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use plughost_core::events::DomainEvent;
use plughost_core::types::ExtensionKind;

use crate::bus::{DeliveryReport, EventBus, EventHandler, SubscriptionScope};
use crate::manifest::ExtensionManifest;

/// Context passed to [`Extension::initialize`](crate::Extension::initialize).
///
/// Subscriptions made through the context belong to the extension and are
/// released when it is deactivated, fails, or the registry is torn down.
#[derive(Clone)]
pub struct ExtensionContext {
    manifest: Arc<ExtensionManifest>,
    settings: Value,
    bus: EventBus,
    scope: Arc<SubscriptionScope>,
}

impl std::fmt::Debug for ExtensionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionContext")
            .field("id", &self.manifest.id)
            .field("kind", &self.manifest.kind)
            .finish()
    }
}

impl ExtensionContext {
    pub(crate) fn new(
        manifest: Arc<ExtensionManifest>,
        settings: Value,
        bus: EventBus,
        scope: Arc<SubscriptionScope>,
    ) -> Self {
        Self {
            manifest,
            settings,
            bus,
            scope,
        }
    }

    /// Extension id.
    pub fn id(&self) -> &str {
        &self.manifest.id
    }

    /// Plugin or theme.
    pub fn kind(&self) -> ExtensionKind {
        self.manifest.kind
    }

    /// Canonical extension directory.
    pub fn root_dir(&self) -> &Path {
        &self.manifest.root_dir
    }

    /// Full manifest.
    pub fn manifest(&self) -> &ExtensionManifest {
        &self.manifest
    }

    /// Host configuration for this extension (`Null` when none is set).
    pub fn settings(&self) -> &Value {
        &self.settings
    }

    /// Publishes an event and waits for delivery.
    pub async fn publish(&self, event: DomainEvent) -> DeliveryReport {
        self.bus.publish(event).await
    }

    /// Publishes an event without waiting.
    pub fn emit(&self, event: DomainEvent) {
        self.bus.emit(event);
    }

    /// Subscribes a handler owned by this extension.
    pub async fn subscribe(&self, event: &str, handler: Arc<dyn EventHandler>) {
        let subscription = self.bus.subscribe(event, handler).await;
        self.scope.add(subscription).await;
    }
}
