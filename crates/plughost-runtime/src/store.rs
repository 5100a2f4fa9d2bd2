//! Stand-alone implementations of [`ExtensionStateStore`].

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use plughost_core::error::AppError;
use plughost_core::result::AppResult;
use plughost_core::traits::{ExtensionStateStore, PersistedExtension};

/// In-memory store; mainly for tests and hosts without persistence.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    states: RwLock<Vec<PersistedExtension>>,
}

impl MemoryStateStore {
    /// Creates a store seeded with `states`.
    pub fn new(states: Vec<PersistedExtension>) -> Self {
        Self {
            states: RwLock::new(states),
        }
    }

    /// Sets the flag for one extension, adding it if unknown.
    pub async fn set(&self, state: PersistedExtension) {
        let mut states = self.states.write().await;
        match states.iter_mut().find(|s| s.id == state.id) {
            Some(existing) => *existing = state,
            None => states.push(state),
        }
    }
}

#[async_trait]
impl ExtensionStateStore for MemoryStateStore {
    async fn load_states(&self) -> AppResult<Vec<PersistedExtension>> {
        Ok(self.states.read().await.clone())
    }
}

/// Reads flags from a JSON array of `{id, kind, is_active}` objects.
/// A missing file means nothing is persisted.
#[derive(Debug, Clone)]
pub struct JsonFileStateStore {
    path: PathBuf,
}

impl JsonFileStateStore {
    /// Creates a store reading `path` on every boot.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ExtensionStateStore for JsonFileStateStore {
    async fn load_states(&self) -> AppResult<Vec<PersistedExtension>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No persisted extension states");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(AppError::with_source(
                    plughost_core::error::ErrorKind::Storage,
                    "Failed to read extension state file",
                    e,
                ));
            }
        };
        Ok(serde_json::from_slice(&bytes)?)
    }
}
