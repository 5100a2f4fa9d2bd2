//! Domain events published on the extension event bus.
//!
//! Every event travels as a [`DomainEvent`]: a name such as
//! `plugin:activated` plus a JSON payload. The typed enums in the
//! sub-modules build well-formed events for the names the runtime itself
//! emits; extensions may publish arbitrary names which are relayed as-is.

pub mod extension;
pub mod file;
pub mod system;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::id::EventId;

pub use extension::ExtensionEvent;
pub use file::FileEvent;
pub use system::SystemEvent;

/// Subscription key that matches every event name.
pub const WILDCARD: &str = "*";

/// A named event with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Unique event ID.
    pub id: EventId,
    /// Event name, `domain:action` by convention.
    pub name: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// The event payload.
    pub payload: Value,
}

impl DomainEvent {
    /// Create a new domain event.
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            id: EventId::new(),
            name: name.into(),
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Returns the part of the name before the first `:`.
    pub fn domain(&self) -> &str {
        self.name.split(':').next().unwrap_or_default()
    }

    /// Reads a string field from the payload.
    pub fn payload_str(&self, field: &str) -> Option<&str> {
        self.payload.get(field).and_then(Value::as_str)
    }
}

/// Implemented by the typed event enums.
pub trait NamedEvent: Serialize {
    /// The bus name of this event.
    fn name(&self) -> &'static str;

    /// Wraps the event into a [`DomainEvent`].
    fn into_domain(self) -> DomainEvent
    where
        Self: Sized,
    {
        let name = self.name();
        let payload = serde_json::to_value(&self).unwrap_or(Value::Null);
        DomainEvent::new(name, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExtensionKind;

    #[test]
    fn test_activated_event_shape() {
        let event = ExtensionEvent::Activated {
            id: "oauth".to_string(),
            kind: ExtensionKind::Plugin,
            timestamp: Utc::now(),
        }
        .into_domain();

        assert_eq!(event.name, "plugin:activated");
        assert_eq!(event.domain(), "plugin");
        assert_eq!(event.payload_str("id"), Some("oauth"));
        assert!(event.payload.get("timestamp").is_some());
    }

    #[test]
    fn test_theme_events_use_theme_domain() {
        let event = ExtensionEvent::Deactivated {
            id: "midnight".to_string(),
            kind: ExtensionKind::Theme,
            timestamp: Utc::now(),
        };
        assert_eq!(event.name(), "theme:deactivated");

        let changed = ExtensionEvent::ThemeChanged {
            id: "midnight".to_string(),
            previous: Some("default".to_string()),
        };
        assert_eq!(changed.name(), "theme:changed");
    }

    #[test]
    fn test_file_deleted_payload() {
        let event = FileEvent::Deleted {
            key: "uploads/a.png".to_string(),
            deleted_at: Utc::now(),
        }
        .into_domain();
        assert_eq!(event.name, "file:deleted");
        assert_eq!(event.payload_str("key"), Some("uploads/a.png"));
    }
}
