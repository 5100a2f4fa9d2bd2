//! # plughost-runtime
//!
//! Runtime registry for plugins and themes. Provides:
//!
//! - Manifest loading and discovery of extension directories
//! - Extension registry with an atomic status state machine
//! - Initialization sequencer that boots the extension set exactly once
//! - Readiness gate with bounded waiting for dependent requests
//! - In-process event bus with per-extension subscription scopes
//! - Sandboxed resolution of extension-owned files, with an optional cache
//! - Optional dynamic loading via `libloading` (feature `dynamic`)

pub mod api;
pub mod bus;
pub mod capability;
pub mod catalog;
pub mod error;
pub mod extension;
pub mod gate;
pub mod loader;
pub mod macros;
pub mod manifest;
pub mod prelude;
pub mod registry;
pub mod resolver;
pub mod sequencer;
pub mod store;

mod lifecycle;

pub use api::context::ExtensionContext;
pub use bus::{DeliveryReport, EventBus, EventHandler, FnHandler, Subscription, SubscriptionScope};
pub use capability::{Capability, CapabilityEntry};
pub use catalog::ExtensionCatalog;
pub use error::{ExtensionFailure, FailureKind, ManifestError, RegistryError, RuntimeError};
pub use extension::{DeclarativeExtension, Extension, ExtensionFactory, FnFactory};
pub use gate::{GateError, ReadinessGate};
pub use manifest::{CapabilityMap, ExtensionManifest, ManifestLoader};
pub use registry::{
    Activation, ExtensionRecord, ExtensionStatus, ExtensionSummary, Registry, TransitionPayload,
};
pub use resolver::{
    CachedContentResolver, ContentCategory, ContentResolver, ContentSource, ResolveError,
    ResolvedContent,
};
pub use sequencer::{BootPhase, BootReport, Sequencer, SystemReadinessState};
pub use store::{JsonFileStateStore, MemoryStateStore};
