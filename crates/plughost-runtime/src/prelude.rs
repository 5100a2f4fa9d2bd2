//! Prelude for extension authors.

pub use async_trait::async_trait;

pub use plughost_core::events::{DomainEvent, NamedEvent};

pub use crate::api::context::ExtensionContext;
pub use crate::bus::{EventHandler, FnHandler};
pub use crate::capability::Capability;
pub use crate::extension::{Extension, ExtensionFactory, FnFactory};
pub use crate::manifest::ExtensionManifest;

pub use crate::{capabilities, export_extension};
