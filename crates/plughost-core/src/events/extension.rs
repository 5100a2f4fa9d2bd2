//! Extension lifecycle events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::NamedEvent;
use crate::types::ExtensionKind;

/// Lifecycle events emitted by the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtensionEvent {
    /// An extension's activation hook completed.
    Activated {
        /// Extension identifier.
        id: String,
        /// Plugin or theme.
        kind: ExtensionKind,
        /// When the extension became active.
        timestamp: DateTime<Utc>,
    },
    /// An extension's deactivation hook completed.
    Deactivated {
        /// Extension identifier.
        id: String,
        /// Plugin or theme.
        kind: ExtensionKind,
        /// When the extension became inactive.
        timestamp: DateTime<Utc>,
    },
    /// The active theme changed.
    ThemeChanged {
        /// The newly active theme.
        id: String,
        /// The theme that was active before, if any.
        previous: Option<String>,
    },
}

impl NamedEvent for ExtensionEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Activated {
                kind: ExtensionKind::Plugin,
                ..
            } => "plugin:activated",
            Self::Activated {
                kind: ExtensionKind::Theme,
                ..
            } => "theme:activated",
            Self::Deactivated {
                kind: ExtensionKind::Plugin,
                ..
            } => "plugin:deactivated",
            Self::Deactivated {
                kind: ExtensionKind::Theme,
                ..
            } => "theme:deactivated",
            Self::ThemeChanged { .. } => "theme:changed",
        }
    }
}
