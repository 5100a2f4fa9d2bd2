//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use crate::output::{self, OutputFormat};
use plughost_core::config::AppConfig;
use plughost_core::error::AppError;

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration (files + environment)
    Show,
    /// Validate the configuration and summarize it
    Validate,
    /// Generate a default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config/generated.toml")]
        output: String,
    },
}

/// Execute config commands
pub async fn execute(
    args: &ConfigArgs,
    config: &AppConfig,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => {
            let rendered = match format {
                OutputFormat::Json => serde_json::to_string_pretty(config)?,
                OutputFormat::Table => format!("{config:#?}"),
            };
            println!("{rendered}");
        }
        ConfigCommand::Validate => {
            output::print_success(&format!("Configuration '{config_path}' is valid"));
            output::print_kv(
                "Server",
                &format!("{}:{}", config.server.host, config.server.port),
            );
            output::print_kv("Plugins", &config.extensions.plugins_dir);
            output::print_kv("Themes", &config.extensions.themes_dir);
            output::print_kv("Default theme", &config.extensions.default_theme);
            output::print_kv(
                "State file",
                config.extensions.state_file.as_deref().unwrap_or("(memory)"),
            );
            output::print_kv("Gate timeout", &format!("{} ms", config.gate.timeout_ms));
            output::print_kv(
                "Content cache",
                if config.content.cache_enabled {
                    "enabled"
                } else {
                    "disabled"
                },
            );
            if config.extensions.hook_timeout_seconds == 0 {
                output::print_warning("extensions.hook_timeout_seconds is 0; every hook will time out");
            }
        }
        ConfigCommand::Generate { output: out_path } => {
            let default_config = include_str!("../../../../config/default.toml");

            if let Some(parent) = std::path::Path::new(out_path).parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| AppError::storage(format!("Failed to create dir: {e}")))?;
            }

            tokio::fs::write(out_path, default_config)
                .await
                .map_err(|e| AppError::storage(format!("Failed to write config: {e}")))?;

            output::print_success(&format!("Default config written to '{out_path}'"));
        }
    }

    Ok(())
}
