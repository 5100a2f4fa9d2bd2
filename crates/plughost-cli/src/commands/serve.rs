//! Start the PlugHost server.

use std::sync::Arc;

use clap::Args;

use plughost_core::config::AppConfig;
use plughost_core::error::AppError;
use plughost_runtime::ExtensionCatalog;

use crate::output;

/// Arguments for the serve command
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Override the server port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Override the server host
    #[arg(long)]
    pub host: Option<String>,

    /// Do not boot extensions on startup
    #[arg(long)]
    pub no_boot: bool,
}

/// Execute the serve command
pub async fn execute(args: &ServeArgs, mut config: AppConfig) -> Result<(), AppError> {
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(ref host) = args.host {
        config.server.host = host.clone();
    }
    if args.no_boot {
        config.extensions.auto_boot = false;
    }

    println!("Starting PlugHost server...");
    output::print_kv("Host", &config.server.host);
    output::print_kv("Port", &config.server.port.to_string());
    output::print_kv("Plugins", &config.extensions.plugins_dir);
    output::print_kv("Themes", &config.extensions.themes_dir);

    plughost_api::run_server(config, Arc::new(ExtensionCatalog::new())).await
}
