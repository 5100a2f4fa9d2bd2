//! Extension registry: records, status transitions, and lifecycle.
//!
//! All records live behind one `RwLock`. A transition builds the next
//! record under the write lock and swaps it in, so readers only ever see
//! complete records. Lifecycle hooks run outside the lock; the
//! `Initializing` status and the busy set mark work in progress. Lifecycle
//! calls share the lifecycle lock; `teardown` takes it exclusively, so a
//! reload never clears records under a hook that is still running.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use plughost_core::config::extensions::ExtensionsConfig;
use plughost_core::events::{ExtensionEvent, NamedEvent};
use plughost_core::types::{ExtensionId, ExtensionKind};

use crate::api::context::ExtensionContext;
use crate::bus::{EventBus, SubscriptionScope};
use crate::capability::{Capability, CapabilityEntry, CapabilityIndex};
use crate::catalog::ExtensionCatalog;
use crate::error::{ExtensionFailure, RegistryError};
use crate::extension::Extension;
use crate::lifecycle::run_hook;
use crate::manifest::{CapabilityMap, ExtensionManifest};

/// Lifecycle status of an installed extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionStatus {
    /// Known, never started in this boot.
    Registered,
    /// Hooks are running.
    Initializing,
    /// Serving.
    Active,
    /// Installed but disabled.
    Inactive,
    /// A hook or the manifest failed; see `last_error`.
    Failed,
}

impl ExtensionStatus {
    /// Whether `self -> to` is a legal transition.
    pub fn can_transition_to(self, to: Self) -> bool {
        use ExtensionStatus::*;
        matches!(
            (self, to),
            (Registered, Initializing)
                | (Registered, Inactive)
                | (Initializing, Active)
                | (Initializing, Failed)
                | (Active, Inactive)
                | (Active, Failed)
                | (Inactive, Active)
                | (Inactive, Initializing)
                | (Failed, Initializing)
        )
    }
}

impl fmt::Display for ExtensionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Registered => "registered",
            Self::Initializing => "initializing",
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Registry entry for one installed extension.
#[derive(Debug, Clone)]
pub struct ExtensionRecord {
    /// Immutable manifest.
    pub manifest: Arc<ExtensionManifest>,
    /// Live instance; present exactly while `Active`.
    pub instance: Option<Arc<dyn Extension>>,
    /// Current status.
    pub status: ExtensionStatus,
    /// Present only while `Failed`.
    pub last_error: Option<ExtensionFailure>,
    /// When the record was registered.
    pub registered_at: DateTime<Utc>,
    /// Last successful activation.
    pub activated_at: Option<DateTime<Utc>>,
    /// Last successful deactivation.
    pub deactivated_at: Option<DateTime<Utc>>,
    /// Capabilities contributed while active.
    pub capabilities: Vec<Capability>,
    pub(crate) scope: Option<Arc<SubscriptionScope>>,
}

impl ExtensionRecord {
    fn new(manifest: ExtensionManifest) -> Self {
        Self {
            manifest: Arc::new(manifest),
            instance: None,
            status: ExtensionStatus::Registered,
            last_error: None,
            registered_at: Utc::now(),
            activated_at: None,
            deactivated_at: None,
            capabilities: Vec::new(),
            scope: None,
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

    /// Serializable view of the record.
    pub fn summary(&self) -> ExtensionSummary {
        ExtensionSummary {
            id: self.manifest.id.clone(),
            kind: self.manifest.kind,
            name: self.manifest.name.clone(),
            version: self.manifest.version.clone(),
            description: self.manifest.description.clone(),
            author: self.manifest.author.clone(),
            main: self.manifest.main.clone(),
            declared: self.manifest.capabilities.clone(),
            status: self.status,
            last_error: self.last_error.clone(),
            registered_at: self.registered_at,
            activated_at: self.activated_at,
            deactivated_at: self.deactivated_at,
            capabilities: self.capabilities.clone(),
        }
    }
}

/// Serializable snapshot of an [`ExtensionRecord`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionSummary {
    pub id: String,
    pub kind: ExtensionKind,
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: String,
    pub main: String,
    pub declared: CapabilityMap,
    pub status: ExtensionStatus,
    pub last_error: Option<ExtensionFailure>,
    pub registered_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub deactivated_at: Option<DateTime<Utc>>,
    pub capabilities: Vec<Capability>,
}

/// What a successful activation hands to the registry.
pub struct Activation {
    instance: Arc<dyn Extension>,
    capabilities: Vec<Capability>,
    scope: Arc<SubscriptionScope>,
}

impl Activation {
    /// An activation with a fresh, empty subscription scope.
    pub fn new(id: &str, instance: Arc<dyn Extension>, capabilities: Vec<Capability>) -> Self {
        Self {
            instance,
            capabilities,
            scope: Arc::new(SubscriptionScope::new(id)),
        }
    }
}

impl fmt::Debug for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Activation")
            .field("capabilities", &self.capabilities.len())
            .finish()
    }
}

/// Data accompanying a status transition.
#[derive(Debug)]
pub enum TransitionPayload {
    /// For transitions that carry nothing.
    None,
    /// Required when moving to `Active`.
    Activated(Activation),
    /// Required when moving to `Failed`.
    Failed(ExtensionFailure),
}

#[derive(Debug, Default)]
struct RegistryState {
    records: HashMap<String, ExtensionRecord>,
    order: Vec<String>,
    index: CapabilityIndex,
}

/// Owns every installed extension and its live instance.
#[derive(Debug)]
pub struct Registry {
    state: RwLock<RegistryState>,
    busy: Mutex<HashSet<String>>,
    lifecycle: RwLock<()>,
    catalog: Arc<ExtensionCatalog>,
    bus: EventBus,
    hook_timeout: Duration,
    settings: HashMap<String, Value>,
}

struct BusyGuard<'a> {
    busy: &'a Mutex<HashSet<String>>,
    id: String,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.busy
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

impl Registry {
    /// Creates an empty registry.
    pub fn new(catalog: Arc<ExtensionCatalog>, bus: EventBus, config: &ExtensionsConfig) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            busy: Mutex::new(HashSet::new()),
            lifecycle: RwLock::new(()),
            catalog,
            bus,
            hook_timeout: Duration::from_secs(config.hook_timeout_seconds),
            settings: config.settings.clone(),
        }
    }

    /// Overrides the lifecycle hook timeout.
    pub fn with_hook_timeout(mut self, timeout: Duration) -> Self {
        self.hook_timeout = timeout;
        self
    }

    /// The event bus lifecycle events are published on.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The factory catalog.
    pub fn catalog(&self) -> &Arc<ExtensionCatalog> {
        &self.catalog
    }

    /// Adds a `Registered` record.
    pub async fn register(&self, manifest: ExtensionManifest) -> Result<ExtensionId, RegistryError> {
        let id = manifest.id.clone();
        let kind = manifest.kind;

        let mut state = self.state.write().await;
        if state.records.contains_key(&id) {
            return Err(RegistryError::AlreadyRegistered { id });
        }
        state.records.insert(id.clone(), ExtensionRecord::new(manifest));
        state.order.push(id.clone());
        drop(state);

        info!(extension_id = %id, kind = %kind, "Extension registered");
        Ok(ExtensionId::new(id))
    }

    /// Atomically moves a record to `to`.
    ///
    /// `Active` requires [`TransitionPayload::Activated`], `Failed` requires
    /// [`TransitionPayload::Failed`], everything else takes no payload.
    pub async fn transition(
        &self,
        id: &str,
        to: ExtensionStatus,
        payload: TransitionPayload,
    ) -> Result<ExtensionRecord, RegistryError> {
        let (record, released) = {
            let mut state = self.state.write().await;
            let current = state
                .records
                .get(id)
                .ok_or_else(|| RegistryError::NotFound { id: id.to_string() })?;
            let from = current.status;
            if !from.can_transition_to(to) {
                return Err(RegistryError::IllegalTransition {
                    id: id.to_string(),
                    from,
                    to,
                });
            }

            let invalid = |expected| RegistryError::InvalidPayload {
                id: id.to_string(),
                to,
                expected,
            };

            let mut next = current.clone();
            let now = Utc::now();
            let released = match (to, payload) {
                (ExtensionStatus::Active, TransitionPayload::Activated(activation)) => {
                    next.instance = Some(activation.instance);
                    next.capabilities = activation.capabilities;
                    next.last_error = None;
                    next.activated_at = Some(now);
                    next.scope.replace(activation.scope)
                }
                (ExtensionStatus::Active, _) => return Err(invalid("an activation")),
                (ExtensionStatus::Failed, TransitionPayload::Failed(failure)) => {
                    next.instance = None;
                    next.capabilities.clear();
                    next.last_error = Some(failure);
                    next.scope.take()
                }
                (ExtensionStatus::Failed, _) => return Err(invalid("a failure")),
                (_, TransitionPayload::None) => {
                    next.last_error = None;
                    if to == ExtensionStatus::Inactive {
                        next.instance = None;
                        next.capabilities.clear();
                        if from == ExtensionStatus::Active {
                            next.deactivated_at = Some(now);
                        }
                    }
                    next.scope.take()
                }
                (_, _) => return Err(invalid("no payload")),
            };
            next.status = to;

            if from == ExtensionStatus::Active {
                state.index.remove_extension(id);
            }
            if to == ExtensionStatus::Active {
                state.index.insert(id, next.manifest.kind, &next.capabilities);
            }
            state.records.insert(id.to_string(), next.clone());
            (next, released)
        };

        debug!(extension_id = %id, status = %record.status, "Extension status changed");

        if let Some(scope) = released {
            scope.release().await;
        }
        Ok(record)
    }

    /// Snapshot of one record. `None` means not installed, which is
    /// distinct from an `Inactive` record.
    pub async fn get(&self, id: &str) -> Option<ExtensionRecord> {
        self.state.read().await.records.get(id).cloned()
    }

    /// All records in registration order, optionally filtered by kind.
    pub async fn list(&self, kind: Option<ExtensionKind>) -> Vec<ExtensionRecord> {
        let state = self.state.read().await;
        state
            .order
            .iter()
            .filter_map(|id| state.records.get(id))
            .filter(|r| kind.is_none_or(|k| r.manifest.kind == k))
            .cloned()
            .collect()
    }

    /// Active records in registration order.
    pub async fn list_active(&self, kind: Option<ExtensionKind>) -> Vec<ExtensionRecord> {
        self.list(kind)
            .await
            .into_iter()
            .filter(|r| r.status == ExtensionStatus::Active)
            .collect()
    }

    /// Number of installed extensions.
    pub async fn count(&self) -> usize {
        self.state.read().await.records.len()
    }

    /// Capabilities of active extensions, in activation order.
    pub async fn capabilities(&self, kind: Option<ExtensionKind>) -> Vec<CapabilityEntry> {
        self.state.read().await.index.list(kind)
    }

    /// The active extension serving `path`, if any.
    pub async fn find_route(&self, path: &str) -> Option<CapabilityEntry> {
        self.state.read().await.index.find_route(path)
    }

    /// The active theme, if any.
    pub async fn active_theme(&self) -> Option<ExtensionRecord> {
        self.list_active(Some(ExtensionKind::Theme))
            .await
            .into_iter()
            .next()
    }

    /// Starts an extension: instantiate, `initialize`, `activate`, merge
    /// capabilities, publish `<kind>:activated`. Already-active extensions
    /// are returned unchanged.
    pub async fn activate(&self, id: &str) -> Result<ExtensionRecord, RegistryError> {
        let _guard = self.claim(id)?;
        let lifecycle = self.lifecycle.read().await;
        let current = self
            .get(id)
            .await
            .ok_or_else(|| RegistryError::NotFound { id: id.to_string() })?;
        if current.status == ExtensionStatus::Active {
            debug!(extension_id = %id, "Extension already active");
            return Ok(current);
        }

        self.transition(id, ExtensionStatus::Initializing, TransitionPayload::None)
            .await?;

        match self.bring_up(&current.manifest).await {
            Ok(activation) => {
                let instance = Arc::clone(&activation.instance);
                let scope = Arc::clone(&activation.scope);
                let record = match self
                    .transition(id, ExtensionStatus::Active, TransitionPayload::Activated(activation))
                    .await
                {
                    Ok(record) => record,
                    Err(err) => {
                        warn!(extension_id = %id, error = %err, "Activated instance discarded");
                        scope.release().await;
                        self.cleanup(id, instance.as_ref()).await;
                        return Err(err);
                    }
                };
                drop(lifecycle);
                info!(
                    extension_id = %id,
                    kind = %record.kind(),
                    capabilities = record.capabilities.len(),
                    "Extension activated"
                );
                self.bus
                    .publish(
                        ExtensionEvent::Activated {
                            id: id.to_string(),
                            kind: record.kind(),
                            timestamp: record.activated_at.unwrap_or_else(Utc::now),
                        }
                        .into_domain(),
                    )
                    .await;
                Ok(record)
            }
            Err(failure) => {
                error!(extension_id = %id, error = %failure, "Extension activation failed");
                self.transition(id, ExtensionStatus::Failed, TransitionPayload::Failed(failure.clone()))
                    .await?;
                Err(RegistryError::HookFailed {
                    id: id.to_string(),
                    failure,
                })
            }
        }
    }

    /// Stops an active extension: `deactivate`, `cleanup`, drop the
    /// instance, publish `<kind>:deactivated`. Inactive extensions are
    /// returned unchanged.
    pub async fn deactivate(&self, id: &str) -> Result<ExtensionRecord, RegistryError> {
        let _guard = self.claim(id)?;
        let lifecycle = self.lifecycle.read().await;
        let current = self
            .get(id)
            .await
            .ok_or_else(|| RegistryError::NotFound { id: id.to_string() })?;
        match current.status {
            ExtensionStatus::Active => {}
            ExtensionStatus::Inactive => return Ok(current),
            from => {
                return Err(RegistryError::IllegalTransition {
                    id: id.to_string(),
                    from,
                    to: ExtensionStatus::Inactive,
                });
            }
        }

        let outcome = match &current.instance {
            Some(instance) => {
                let outcome = run_hook(id, "deactivate", self.hook_timeout, instance.deactivate()).await;
                self.cleanup(id, instance.as_ref()).await;
                outcome
            }
            None => Ok(()),
        };

        match outcome {
            Ok(()) => {
                let record = self
                    .transition(id, ExtensionStatus::Inactive, TransitionPayload::None)
                    .await?;
                drop(lifecycle);
                info!(extension_id = %id, kind = %record.kind(), "Extension deactivated");
                self.bus
                    .publish(
                        ExtensionEvent::Deactivated {
                            id: id.to_string(),
                            kind: record.kind(),
                            timestamp: record.deactivated_at.unwrap_or_else(Utc::now),
                        }
                        .into_domain(),
                    )
                    .await;
                Ok(record)
            }
            Err(failure) => {
                error!(extension_id = %id, error = %failure, "Extension deactivation failed");
                self.transition(id, ExtensionStatus::Failed, TransitionPayload::Failed(failure.clone()))
                    .await?;
                Err(RegistryError::HookFailed {
                    id: id.to_string(),
                    failure,
                })
            }
        }
    }

    /// Makes `id` the only active theme and publishes `theme:changed`
    /// when the active theme actually changed.
    pub async fn switch_theme(&self, id: &str) -> Result<ExtensionRecord, RegistryError> {
        let target = self
            .get(id)
            .await
            .ok_or_else(|| RegistryError::NotFound { id: id.to_string() })?;
        if target.kind() != ExtensionKind::Theme {
            return Err(RegistryError::NotATheme { id: id.to_string() });
        }

        let previous = self.active_theme().await.map(|r| r.manifest.id.clone());
        let record = self.activate(id).await?;

        for other in self.list_active(Some(ExtensionKind::Theme)).await {
            if other.id() == id {
                continue;
            }
            if let Err(e) = self.deactivate(other.id()).await {
                warn!(extension_id = %other.id(), error = %e, "Failed to deactivate previous theme");
            }
        }

        if previous.as_deref() != Some(id) {
            info!(theme = %id, previous = ?previous, "Active theme changed");
            self.bus
                .publish(
                    ExtensionEvent::ThemeChanged {
                        id: id.to_string(),
                        previous,
                    }
                    .into_domain(),
                )
                .await;
        }
        Ok(record)
    }

    /// Deactivates and cleans up every live instance, in reverse
    /// registration order, then clears all records. Waits for lifecycle
    /// calls already in flight.
    pub async fn teardown(&self) {
        let _lifecycle = self.lifecycle.write().await;
        let records = self.list(None).await;
        if records.is_empty() {
            return;
        }

        for record in records.iter().rev() {
            let Some(instance) = &record.instance else {
                continue;
            };
            if let Err(failure) =
                run_hook(record.id(), "deactivate", self.hook_timeout, instance.deactivate()).await
            {
                warn!(extension_id = %record.id(), error = %failure, "Deactivate hook failed during teardown");
            }
            self.cleanup(record.id(), instance.as_ref()).await;
        }

        let scopes: Vec<_> = {
            let mut state = self.state.write().await;
            state.order.clear();
            state.index.clear();
            state
                .records
                .drain()
                .filter_map(|(_, record)| record.scope)
                .collect()
        };
        for scope in scopes {
            scope.release().await;
        }

        info!(count = records.len(), "Registry torn down");
    }

    async fn bring_up(&self, manifest: &Arc<ExtensionManifest>) -> Result<Activation, ExtensionFailure> {
        if let Some(defect) = manifest.defect() {
            return Err(defect.clone());
        }

        let id = manifest.id.as_str();
        let instance = self.catalog.instantiate(manifest).await?;
        let activation = Activation::new(id, Arc::clone(&instance), Vec::new());
        let ctx = ExtensionContext::new(
            Arc::clone(manifest),
            self.settings.get(id).cloned().unwrap_or(Value::Null),
            self.bus.clone(),
            Arc::clone(&activation.scope),
        );

        let hooks = async {
            let returned = run_hook(id, "initialize", self.hook_timeout, instance.initialize(&ctx)).await?;
            run_hook(id, "activate", self.hook_timeout, instance.activate()).await?;
            Ok::<_, ExtensionFailure>(returned)
        };

        match hooks.await {
            Ok(returned) => {
                let mut capabilities = manifest.capabilities.to_descriptors();
                for cap in returned {
                    if !capabilities.contains(&cap) {
                        capabilities.push(cap);
                    }
                }
                Ok(Activation {
                    capabilities,
                    ..activation
                })
            }
            Err(failure) => {
                activation.scope.release().await;
                self.cleanup(id, instance.as_ref()).await;
                Err(failure)
            }
        }
    }

    async fn cleanup(&self, id: &str, instance: &dyn Extension) {
        if let Err(failure) = run_hook(id, "cleanup", self.hook_timeout, instance.cleanup()).await {
            warn!(extension_id = %id, error = %failure, "Cleanup hook failed");
        }
    }

    fn claim(&self, id: &str) -> Result<BusyGuard<'_>, RegistryError> {
        let mut busy = self.busy.lock().unwrap_or_else(PoisonError::into_inner);
        if !busy.insert(id.to_string()) {
            return Err(RegistryError::Busy { id: id.to_string() });
        }
        Ok(BusyGuard {
            busy: &self.busy,
            id: id.to_string(),
        })
    }
}
