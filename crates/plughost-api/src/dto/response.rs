//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use plughost_core::events::DomainEvent;
use plughost_runtime::{BootPhase, CapabilityEntry, ExtensionSummary};

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the process serves requests.
    pub status: String,
    /// Version.
    pub version: String,
    /// Process start.
    pub started_at: DateTime<Utc>,
    /// Uptime.
    pub uptime_seconds: u64,
    /// Boot phase of the extension runtime.
    pub phase: BootPhase,
}

/// Extension listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionListResponse {
    /// Extensions in discovery order.
    pub items: Vec<ExtensionSummary>,
    /// Number of items.
    pub total: usize,
}

/// Capabilities of active extensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityListResponse {
    /// Capabilities in activation order.
    pub items: Vec<CapabilityEntry>,
    /// Number of items.
    pub total: usize,
}

/// Outcome of relaying an event onto the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayEventResponse {
    /// The published event.
    pub event: DomainEvent,
    /// Handlers that completed.
    pub delivered: usize,
    /// Handlers that did not complete.
    pub failed: usize,
}
