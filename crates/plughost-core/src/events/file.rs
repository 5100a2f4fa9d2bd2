//! File events raised by extensions and relayed by the host.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::NamedEvent;

/// Events related to stored files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileEvent {
    /// A stored object was deleted by a storage extension.
    Deleted {
        /// Storage key of the deleted object.
        key: String,
        /// When the deletion happened.
        #[serde(alias = "deletedAt")]
        deleted_at: DateTime<Utc>,
    },
}

impl NamedEvent for FileEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Deleted { .. } => "file:deleted",
        }
    }
}
