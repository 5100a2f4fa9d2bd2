//! Readiness transitions of the extension runtime.

use serde::{Deserialize, Serialize};

use super::NamedEvent;

/// System-level events published by the initialization sequencer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SystemEvent {
    /// A boot sequence started.
    Booting {
        /// Re-initialization counter.
        generation: u64,
    },
    /// The extension set is settled.
    Ready {
        /// Re-initialization counter.
        generation: u64,
        /// Records that ended active.
        active: usize,
        /// Records that ended inactive.
        inactive: usize,
        /// Records that ended failed.
        failed: usize,
    },
    /// Discovery itself failed; no extension set is available.
    Failed {
        /// Re-initialization counter.
        generation: u64,
        /// Human-readable reason.
        error: String,
    },
}

impl NamedEvent for SystemEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Booting { .. } => "system:booting",
            Self::Ready { .. } => "system:ready",
            Self::Failed { .. } => "system:failed",
        }
    }
}
