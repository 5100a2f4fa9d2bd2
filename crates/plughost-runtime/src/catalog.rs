//! Catalog of compiled-in extension factories.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{ExtensionFailure, FailureKind};
use crate::extension::{DeclarativeExtension, Extension, ExtensionFactory};
use crate::loader::is_shared_library;
use crate::manifest::ExtensionManifest;

/// Maps extension ids and `main` entries to factories.
///
/// Lookup order: factory registered under the extension id, then under
/// its `main` entry, then a shared library (feature `dynamic`), then the
/// built-in [`DeclarativeExtension`].
#[derive(Debug, Default)]
pub struct ExtensionCatalog {
    factories: RwLock<HashMap<String, Arc<dyn ExtensionFactory>>>,
    #[cfg(feature = "dynamic")]
    loader: crate::loader::DynamicLoader,
}

impl ExtensionCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under an extension id or a `main` entry.
    /// A later registration for the same key replaces the earlier one.
    pub async fn register(&self, key: impl Into<String>, factory: Arc<dyn ExtensionFactory>) {
        let key = key.into();
        info!(key = %key, "Extension factory registered");
        self.factories.write().await.insert(key, factory);
    }

    /// Number of registered factories.
    pub async fn len(&self) -> usize {
        self.factories.read().await.len()
    }

    /// Creates a fresh instance for `manifest`.
    pub async fn instantiate(
        &self,
        manifest: &ExtensionManifest,
    ) -> Result<Arc<dyn Extension>, ExtensionFailure> {
        let factory = {
            let factories = self.factories.read().await;
            factories
                .get(&manifest.id)
                .or_else(|| factories.get(&manifest.main))
                .cloned()
        };

        if let Some(factory) = factory {
            debug!(extension_id = %manifest.id, "Instantiating from registered factory");
            return factory
                .create(manifest)
                .map_err(|e| ExtensionFailure::new(FailureKind::Instantiation, e));
        }

        if is_shared_library(&manifest.main) {
            return self.load_library(manifest);
        }

        debug!(extension_id = %manifest.id, main = %manifest.main, "Using declarative extension");
        Ok(Arc::new(DeclarativeExtension))
    }

    #[cfg(feature = "dynamic")]
    fn load_library(&self, manifest: &ExtensionManifest) -> Result<Arc<dyn Extension>, ExtensionFailure> {
        use crate::resolver::path::{is_contained, sanitize_relative_path};

        let failure = |msg: String| ExtensionFailure::new(FailureKind::Instantiation, msg);

        let relative = sanitize_relative_path(&manifest.main)
            .ok_or_else(|| failure("entry is not a relative path".to_string()))?;
        let library = manifest
            .root_dir
            .join(relative)
            .canonicalize()
            .map_err(|e| failure(format!("entry library unavailable: {}", e.kind())))?;
        if !is_contained(&manifest.root_dir, &library) {
            return Err(failure("entry library resolves outside the extension".to_string()));
        }

        // SAFETY: extensions are trusted in-process code; the library path
        // is confined to the extension directory above.
        unsafe { self.loader.load_from_path(&library) }.map_err(failure)
    }

    #[cfg(not(feature = "dynamic"))]
    fn load_library(&self, manifest: &ExtensionManifest) -> Result<Arc<dyn Extension>, ExtensionFailure> {
        Err(ExtensionFailure::new(
            FailureKind::Instantiation,
            format!(
                "entry '{}' is a shared library but dynamic loading is disabled",
                manifest.main
            ),
        ))
    }
}
