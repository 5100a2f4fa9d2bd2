//! Shared fixtures for runtime integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use plughost_core::config::extensions::ExtensionsConfig;
use plughost_core::traits::{ExtensionStateStore, PersistedExtension};
use plughost_runtime::{
    Capability, EventBus, Extension, ExtensionCatalog, ExtensionContext, FnFactory,
    MemoryStateStore, Registry, Sequencer,
};

/// Temporary `plugins/` and `themes/` directories.
pub struct Fixture {
    pub temp: TempDir,
    pub plugins: PathBuf,
    pub themes: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        let plugins = temp.path().join("plugins");
        let themes = temp.path().join("themes");
        std::fs::create_dir_all(&plugins).expect("plugins dir");
        std::fs::create_dir_all(&themes).expect("themes dir");
        Self {
            temp,
            plugins,
            themes,
        }
    }

    /// Writes `plugins/<dir>/plugin.json` with a minimal valid manifest.
    pub fn plugin(&self, dir: &str, id: &str) -> PathBuf {
        self.raw_plugin(
            dir,
            &format!(r#"{{"id": "{id}", "name": "{id}", "version": "1.0.0", "main": "index.js"}}"#),
        )
    }

    /// Writes `plugins/<dir>/plugin.json` verbatim.
    pub fn raw_plugin(&self, dir: &str, manifest: &str) -> PathBuf {
        write_extension(&self.plugins, dir, "plugin.json", manifest)
    }

    /// Writes `themes/<dir>/theme.json` with a minimal valid manifest.
    pub fn theme(&self, dir: &str, id: &str) -> PathBuf {
        write_extension(
            &self.themes,
            dir,
            "theme.json",
            &format!(
                r#"{{"id": "{id}", "version": "1.0.0", "main": "index.js",
                     "capabilities": {{"layouts": ["layouts/default.tsx"]}}}}"#
            ),
        )
    }

    pub fn config(&self) -> ExtensionsConfig {
        ExtensionsConfig {
            plugins_dir: self.plugins.display().to_string(),
            themes_dir: self.themes.display().to_string(),
            ..ExtensionsConfig::default()
        }
    }
}

pub fn write_extension(parent: &Path, dir: &str, file: &str, manifest: &str) -> PathBuf {
    let root = parent.join(dir);
    std::fs::create_dir_all(&root).expect("extension dir");
    std::fs::write(root.join(file), manifest).expect("manifest");
    root
}

pub fn write_file(root: &Path, relative: &str, body: &[u8]) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("parent dir");
    }
    std::fs::write(path, body).expect("file");
}

/// Configurable test extension.
#[derive(Debug, Default)]
pub struct Probe {
    pub init_delay: Duration,
    pub activate_delay: Duration,
    pub fail_activate: bool,
    pub panic_initialize: bool,
    pub capabilities: Vec<Capability>,
    pub cleanups: Arc<AtomicUsize>,
}

#[async_trait]
impl Extension for Probe {
    async fn initialize(&self, _ctx: &ExtensionContext) -> Result<Vec<Capability>, String> {
        if self.panic_initialize {
            panic!("probe initialize panicked");
        }
        if !self.init_delay.is_zero() {
            tokio::time::sleep(self.init_delay).await;
        }
        Ok(self.capabilities.clone())
    }

    async fn activate(&self) -> Result<(), String> {
        if !self.activate_delay.is_zero() {
            tokio::time::sleep(self.activate_delay).await;
        }
        if self.fail_activate {
            return Err("probe refused to activate".to_string());
        }
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), String> {
        self.cleanups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Registers a factory for `id` that builds a [`Probe`] via `make` and
/// counts instantiations.
pub async fn register_probe<F>(catalog: &ExtensionCatalog, id: &str, make: F) -> Arc<AtomicUsize>
where
    F: Fn() -> Probe + Send + Sync + 'static,
{
    let created = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&created);
    catalog
        .register(
            id,
            Arc::new(FnFactory::new(id, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(make()) as Arc<dyn Extension>)
            })),
        )
        .await;
    created
}

/// Wired registry and sequencer.
pub struct Runtime {
    pub catalog: Arc<ExtensionCatalog>,
    pub bus: EventBus,
    pub registry: Arc<Registry>,
    pub sequencer: Arc<Sequencer>,
}

pub fn runtime(config: &ExtensionsConfig, states: Vec<PersistedExtension>) -> Runtime {
    runtime_with_store(config, Arc::new(MemoryStateStore::new(states)))
}

pub fn runtime_with_store(config: &ExtensionsConfig, store: Arc<dyn ExtensionStateStore>) -> Runtime {
    let catalog = Arc::new(ExtensionCatalog::new());
    let bus = EventBus::new();
    let registry = Arc::new(Registry::new(Arc::clone(&catalog), bus.clone(), config));
    let sequencer = Sequencer::new(Arc::clone(&registry), store, config);
    Runtime {
        catalog,
        bus,
        registry,
        sequencer,
    }
}
