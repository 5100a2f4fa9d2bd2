//! Request DTOs.

use serde::Deserialize;

use plughost_core::types::ExtensionKind;

/// `?kind=plugin|theme` filter for listing endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KindQuery {
    /// Restrict results to one extension kind.
    #[serde(default)]
    pub kind: Option<ExtensionKind>,
}

/// Body of `POST /api/admin/events`.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayEventRequest {
    /// Event name, `domain:action`.
    pub name: String,
    /// Opaque payload forwarded to subscribers.
    #[serde(default)]
    pub payload: serde_json::Value,
}
