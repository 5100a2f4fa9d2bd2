//! PlugHost CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use plughost_core::error::{AppError, ErrorKind};

mod commands;
mod output;

use commands::Cli;

/// Invalid manifests or configuration.
const EXIT_INVALID: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so `--format json` output stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("PLUGHOST_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().execute().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&e.to_string());
            exit_code(&e)
        }
    }
}

fn exit_code(error: &AppError) -> ExitCode {
    match error.kind {
        ErrorKind::Validation | ErrorKind::Configuration => ExitCode::from(EXIT_INVALID),
        _ => ExitCode::FAILURE,
    }
}
