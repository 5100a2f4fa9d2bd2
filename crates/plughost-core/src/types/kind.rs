//! Extension kinds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The two kinds of pluggable units the host manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionKind {
    /// A plugin contributing routes, components, and admin pages.
    Plugin,
    /// A theme contributing layouts, pages, and assets.
    Theme,
}

impl ExtensionKind {
    /// Name of the manifest file at the root of an extension directory.
    pub fn manifest_file(&self) -> &'static str {
        match self {
            Self::Plugin => "plugin.json",
            Self::Theme => "theme.json",
        }
    }

    /// Lower-case label, also the event domain.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plugin => "plugin",
            Self::Theme => "theme",
        }
    }
}

impl fmt::Display for ExtensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtensionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "plugin" | "plugins" => Ok(Self::Plugin),
            "theme" | "themes" => Ok(Self::Theme),
            other => Err(format!("Unknown extension kind: {other}")),
        }
    }
}
