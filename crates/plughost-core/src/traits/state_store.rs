//! Durable extension state owned by the persistence layer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::result::AppResult;
use crate::types::ExtensionKind;

/// The persisted view of one installed extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedExtension {
    /// Extension identifier.
    pub id: String,
    /// Plugin or theme.
    pub kind: ExtensionKind,
    /// Whether an administrator left the extension enabled.
    pub is_active: bool,
}

/// Read access to persisted extension records.
///
/// The runtime reconciles discovered manifests against these flags at
/// every boot. It never writes them back; persisting an administrator's
/// choice is the caller's responsibility.
#[async_trait]
pub trait ExtensionStateStore: Send + Sync + std::fmt::Debug {
    /// Loads every persisted record.
    async fn load_states(&self) -> AppResult<Vec<PersistedExtension>>;
}
