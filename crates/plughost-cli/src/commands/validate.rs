//! Offline manifest validation.
//!
//! Discovers plugins and themes exactly as a boot would, but never
//! instantiates anything or runs lifecycle hooks.

use std::collections::HashSet;
use std::path::Path;

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use plughost_core::config::AppConfig;
use plughost_core::error::AppError;
use plughost_core::types::ExtensionKind;
use plughost_runtime::ManifestLoader;
use plughost_runtime::manifest::DiscoveredExtension;

use crate::output::{self, OutputFormat};

/// Arguments for the validate command
#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Override the plugins directory
    #[arg(long)]
    pub plugins_dir: Option<String>,

    /// Override the themes directory
    #[arg(long)]
    pub themes_dir: Option<String>,
}

#[derive(Debug, Serialize, Tabled)]
struct ManifestRow {
    /// Plugin or theme
    kind: String,
    /// Directory name
    dir: String,
    /// Extension id
    id: String,
    /// Declared version
    version: String,
    /// Declared capability count
    capabilities: usize,
    /// `ok` or `error`
    status: String,
    /// Failure detail
    detail: String,
}

impl From<&DiscoveredExtension> for ManifestRow {
    fn from(found: &DiscoveredExtension) -> Self {
        match &found.result {
            Ok(manifest) => Self {
                kind: found.kind.to_string(),
                dir: found.dir_name.clone(),
                id: manifest.id.clone(),
                version: manifest.version.clone(),
                capabilities: manifest.capabilities.to_descriptors().len(),
                status: "ok".to_string(),
                detail: String::new(),
            },
            Err(e) => Self {
                kind: found.kind.to_string(),
                dir: found.dir_name.clone(),
                id: found.fallback_id.clone(),
                version: String::new(),
                capabilities: 0,
                status: "error".to_string(),
                detail: e.to_string(),
            },
        }
    }
}

/// Execute the validate command
pub async fn execute(
    args: &ValidateArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let plugins_dir = args
        .plugins_dir
        .as_deref()
        .unwrap_or(&config.extensions.plugins_dir);
    let themes_dir = args
        .themes_dir
        .as_deref()
        .unwrap_or(&config.extensions.themes_dir);

    let rows = inspect(Path::new(plugins_dir), Path::new(themes_dir)).await?;
    output::print_list(&rows, format, "No extensions installed");

    let invalid = rows.iter().filter(|r| r.status != "ok").count();
    let summary = output::validation_summary(rows.len(), invalid);
    if invalid > 0 {
        return Err(AppError::validation(summary));
    }
    if format == OutputFormat::Table && !rows.is_empty() {
        output::print_success(&summary);
    }
    Ok(())
}

async fn inspect(plugins_dir: &Path, themes_dir: &Path) -> Result<Vec<ManifestRow>, AppError> {
    let mut seen = HashSet::new();
    let mut rows = Vec::new();
    for (dir, kind) in [
        (plugins_dir, ExtensionKind::Plugin),
        (themes_dir, ExtensionKind::Theme),
    ] {
        let found = ManifestLoader::discover(dir, kind, &mut seen).await?;
        rows.extend(found.iter().map(ManifestRow::from));
    }
    Ok(rows)
}
