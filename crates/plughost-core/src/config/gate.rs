//! Readiness gate configuration.

use serde::{Deserialize, Serialize};

/// Settings for requests waiting on the extension boot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// How long a gated request waits for readiness, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Value of the `Retry-After` header on a warming-up response.
    #[serde(default = "default_retry_after")]
    pub retry_after_seconds: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            retry_after_seconds: default_retry_after(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_retry_after() -> u64 {
    5
}
