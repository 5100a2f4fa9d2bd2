//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};

use plughost_core::config::AppConfig;
use plughost_runtime::{ContentSource, EventBus, ReadinessGate, Registry, Sequencer};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped or cheap handles, so cloning per request
/// costs a few reference-count bumps.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Installed extensions and their live instances
    pub registry: Arc<Registry>,
    /// Boot sequencer owning the readiness state
    pub sequencer: Arc<Sequencer>,
    /// Barrier for extension-dependent requests
    pub gate: ReadinessGate,
    /// Sandboxed reader for extension-owned files
    pub content: Arc<dyn ContentSource>,
    /// In-process event bus
    pub bus: EventBus,
    /// Process start, wall clock
    pub started_at: DateTime<Utc>,
    /// Process start, monotonic
    pub started: Instant,
}
