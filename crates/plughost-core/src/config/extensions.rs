//! Extension discovery and lifecycle configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Plugin and theme runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionsConfig {
    /// Directory containing one sub-directory per installed plugin.
    #[serde(default = "default_plugins_dir")]
    pub plugins_dir: String,
    /// Directory containing one sub-directory per installed theme.
    #[serde(default = "default_themes_dir")]
    pub themes_dir: String,
    /// Whether the server boots the extension set on startup.
    #[serde(default = "default_true")]
    pub auto_boot: bool,
    /// Whether extensions without a persisted state record start active.
    #[serde(default = "default_true")]
    pub default_active: bool,
    /// Theme activated when no persisted theme state marks one active.
    #[serde(default = "default_theme")]
    pub default_theme: String,
    /// Upper bound for a single lifecycle hook invocation.
    #[serde(default = "default_hook_timeout")]
    pub hook_timeout_seconds: u64,
    /// Optional JSON file holding persisted `is_active` flags.
    #[serde(default)]
    pub state_file: Option<String>,
    /// Per-extension settings handed to the extension context, keyed by id.
    #[serde(default)]
    pub settings: HashMap<String, serde_json::Value>,
}

impl ExtensionsConfig {
    /// Returns the settings block for one extension, or `Null`.
    pub fn settings_for(&self, extension_id: &str) -> serde_json::Value {
        self.settings
            .get(extension_id)
            .cloned()
            .unwrap_or(serde_json::Value::Null)
    }
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            plugins_dir: default_plugins_dir(),
            themes_dir: default_themes_dir(),
            auto_boot: true,
            default_active: true,
            default_theme: default_theme(),
            hook_timeout_seconds: default_hook_timeout(),
            state_file: None,
            settings: HashMap::new(),
        }
    }
}

fn default_plugins_dir() -> String {
    "./plugins".to_string()
}

fn default_themes_dir() -> String {
    "./themes/installed".to_string()
}

fn default_theme() -> String {
    "default".to_string()
}

fn default_hook_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}
