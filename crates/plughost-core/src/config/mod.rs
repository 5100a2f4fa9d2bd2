//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section. Every field carries a serde default so a missing file yields
//! a usable configuration.

pub mod app;
pub mod content;
pub mod extensions;
pub mod gate;
pub mod logging;

use serde::{Deserialize, Serialize};

use self::app::ServerConfig;
use self::content::ContentConfig;
use self::extensions::ExtensionsConfig;
use self::gate::GateConfig;
use self::logging::LoggingConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Extension discovery and lifecycle settings.
    #[serde(default)]
    pub extensions: ExtensionsConfig,
    /// Readiness gate settings.
    #[serde(default)]
    pub gate: GateConfig,
    /// Extension content resolution settings.
    #[serde(default)]
    pub content: ContentConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the base configuration file at `path` with an
    /// environment-specific overlay (`config/{env}.toml`) and environment
    /// variables prefixed with `PLUGHOST__` (e.g. `PLUGHOST__GATE__TIMEOUT_MS`).
    pub fn load(path: &str, env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("PLUGHOST")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let config = AppConfig::load("does/not/exist", "none").expect("defaults");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.extensions.plugins_dir, "./plugins");
        assert_eq!(config.extensions.themes_dir, "./themes/installed");
        assert_eq!(config.gate.timeout_ms, 5000);
        assert!(config.content.cache_enabled);
    }

    #[test]
    fn test_load_from_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("plughost.toml");
        let mut file = std::fs::File::create(&path).expect("create");
        writeln!(
            file,
            r#"
[extensions]
plugins_dir = "/srv/plugins"
default_theme = "midnight"
hook_timeout_seconds = 5

[extensions.settings.oauth]
provider = "github"

[gate]
timeout_ms = 250
"#
        )
        .expect("write");

        let base = path.with_extension("");
        let config = AppConfig::load(base.to_str().expect("utf8"), "none").expect("load");
        assert_eq!(config.extensions.plugins_dir, "/srv/plugins");
        assert_eq!(config.extensions.default_theme, "midnight");
        assert_eq!(config.extensions.hook_timeout_seconds, 5);
        assert_eq!(config.gate.timeout_ms, 250);
        assert_eq!(
            config.extensions.settings_for("oauth")["provider"],
            serde_json::json!("github")
        );
        assert!(config.extensions.settings_for("missing").is_null());
    }
}
