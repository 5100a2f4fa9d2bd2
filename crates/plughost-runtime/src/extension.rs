//! The extension interface shared by plugins and themes.

use std::sync::Arc;

use async_trait::async_trait;

use crate::api::context::ExtensionContext;
use crate::capability::Capability;
use crate::manifest::ExtensionManifest;

/// A live plugin or theme instance.
///
/// Every hook has a no-op default. Errors are plain strings; the registry
/// records them on the extension and never lets them escape.
#[async_trait]
pub trait Extension: Send + Sync + std::fmt::Debug {
    /// Prepares the instance and returns capabilities beyond those declared
    /// in the manifest.
    async fn initialize(&self, ctx: &ExtensionContext) -> Result<Vec<Capability>, String> {
        let _ = ctx;
        Ok(Vec::new())
    }

    /// Starts serving.
    async fn activate(&self) -> Result<(), String> {
        Ok(())
    }

    /// Stops serving.
    async fn deactivate(&self) -> Result<(), String> {
        Ok(())
    }

    /// Releases resources; runs after deactivation and after a failed
    /// activation.
    async fn cleanup(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Creates extension instances for a manifest.
pub trait ExtensionFactory: Send + Sync + std::fmt::Debug {
    /// Builds a fresh instance.
    fn create(&self, manifest: &ExtensionManifest) -> Result<Arc<dyn Extension>, String>;
}

type CreateFn = Arc<dyn Fn(&ExtensionManifest) -> Result<Arc<dyn Extension>, String> + Send + Sync>;

/// Closure-backed factory.
pub struct FnFactory {
    label: String,
    create: CreateFn,
}

impl std::fmt::Debug for FnFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnFactory")
            .field("label", &self.label)
            .field("create", &"<closure>")
            .finish()
    }
}

impl FnFactory {
    /// Wraps `create`.
    pub fn new<F>(label: impl Into<String>, create: F) -> Self
    where
        F: Fn(&ExtensionManifest) -> Result<Arc<dyn Extension>, String> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            create: Arc::new(create),
        }
    }
}

impl ExtensionFactory for FnFactory {
    fn create(&self, manifest: &ExtensionManifest) -> Result<Arc<dyn Extension>, String> {
        (self.create)(manifest)
    }
}

/// Built-in instance for extensions that ship only files: it contributes
/// exactly what the manifest declares and has no behaviour of its own.
#[derive(Debug, Default)]
pub struct DeclarativeExtension;

#[async_trait]
impl Extension for DeclarativeExtension {}
