//! PlugHost Server: plugin and theme runtime registry.
//!
//! Main entry point that loads configuration, installs logging, and runs
//! the HTTP API with the extension runtime behind it.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use plughost_api::run_server;
use plughost_core::config::AppConfig;
use plughost_core::error::AppError;
use plughost_runtime::ExtensionCatalog;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        plugins_dir = %config.extensions.plugins_dir,
        themes_dir = %config.extensions.themes_dir,
        "Starting PlugHost"
    );

    if let Err(e) = run_server(config, Arc::new(ExtensionCatalog::new())).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let config_path =
        std::env::var("PLUGHOST_CONFIG").unwrap_or_else(|_| "config/default".to_string());
    let env = std::env::var("PLUGHOST_ENV").unwrap_or_else(|_| "development".to_string());

    AppConfig::load(&config_path, &env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}
