//! CLI command definitions and dispatch.

pub mod config;
pub mod serve;
pub mod validate;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use plughost_core::config::AppConfig;
use plughost_core::error::AppError;

/// PlugHost: plugin and theme runtime registry
#[derive(Debug, Parser)]
#[command(name = "plughost", version, about, long_about = None)]
pub struct Cli {
    /// Base configuration file, without extension
    #[arg(short, long, default_value = "config/default")]
    pub config: String,

    /// Environment overlay (`config/{env}.toml`)
    #[arg(short, long, env = "PLUGHOST_ENV", default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the PlugHost server
    Serve(serve::ServeArgs),
    /// Check installed extension manifests without starting anything
    Validate(validate::ValidateArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        let config = AppConfig::load(&self.config, &self.env)?;
        match &self.command {
            Commands::Serve(args) => serve::execute(args, config).await,
            Commands::Validate(args) => validate::execute(args, &config, self.format).await,
            Commands::Config(args) => config::execute(args, &config, &self.config, self.format).await,
        }
    }
}
