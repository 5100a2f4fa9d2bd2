//! Capability descriptors and the index of capabilities contributed by
//! active extensions.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use plughost_core::types::ExtensionKind;

/// One thing an extension contributes to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Capability {
    /// A public page, by file path inside the extension.
    Page {
        /// Relative file path.
        path: String,
    },
    /// A reusable UI component.
    Component {
        /// Component name (file stem unless declared otherwise).
        name: String,
        /// Relative file path.
        path: String,
    },
    /// An HTTP route served on behalf of the extension.
    Route {
        /// Route pattern, always starting with `/`.
        path: String,
    },
    /// An administration page.
    AdminPage {
        /// Relative file path.
        path: String,
    },
    /// A dashboard widget.
    Widget {
        /// Relative file path.
        path: String,
    },
    /// A page layout (themes).
    Layout {
        /// Layout name (file stem).
        name: String,
        /// Relative file path.
        path: String,
    },
}

impl Capability {
    /// Builds a component descriptor named after the file stem.
    pub fn component(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::Component {
            name: file_stem(&path),
            path,
        }
    }

    /// Builds a layout descriptor named after the file stem.
    pub fn layout(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::Layout {
            name: file_stem(&path),
            path,
        }
    }

    /// Short label of the variant.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Page { .. } => "page",
            Self::Component { .. } => "component",
            Self::Route { .. } => "route",
            Self::AdminPage { .. } => "admin_page",
            Self::Widget { .. } => "widget",
            Self::Layout { .. } => "layout",
        }
    }
}

fn file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// A capability attributed to the extension that contributed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityEntry {
    /// Contributing extension.
    pub extension_id: String,
    /// Plugin or theme.
    pub kind: ExtensionKind,
    /// The capability itself.
    pub capability: Capability,
}

/// Capabilities of every active extension, in activation order.
#[derive(Debug, Default)]
pub(crate) struct CapabilityIndex {
    entries: Vec<CapabilityEntry>,
}

impl CapabilityIndex {
    /// Adds all capabilities of one extension.
    pub(crate) fn insert(&mut self, extension_id: &str, kind: ExtensionKind, caps: &[Capability]) {
        for capability in caps {
            if let Capability::Route { path } = capability {
                if let Some(owner) = self.route_owner(path) {
                    warn!(
                        extension_id = %extension_id,
                        route = %path,
                        owner = %owner,
                        "Route already provided by another extension, first registration wins"
                    );
                }
            }
            self.entries.push(CapabilityEntry {
                extension_id: extension_id.to_string(),
                kind,
                capability: capability.clone(),
            });
        }
    }

    /// Removes every capability of one extension.
    pub(crate) fn remove_extension(&mut self, extension_id: &str) {
        self.entries.retain(|e| e.extension_id != extension_id);
    }

    /// Snapshot, optionally filtered by kind.
    pub(crate) fn list(&self, kind: Option<ExtensionKind>) -> Vec<CapabilityEntry> {
        self.entries
            .iter()
            .filter(|e| kind.is_none_or(|k| e.kind == k))
            .cloned()
            .collect()
    }

    /// The first route entry matching `path` exactly.
    pub(crate) fn find_route(&self, path: &str) -> Option<CapabilityEntry> {
        self.entries
            .iter()
            .find(|e| matches!(&e.capability, Capability::Route { path: p } if p == path))
            .cloned()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    fn route_owner(&self, path: &str) -> Option<&str> {
        self.entries.iter().find_map(|e| match &e.capability {
            Capability::Route { path: p } if p == path => Some(e.extension_id.as_str()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_name_from_stem() {
        let cap = Capability::component("components/OAuthButtons.jsx");
        assert_eq!(
            cap,
            Capability::Component {
                name: "OAuthButtons".to_string(),
                path: "components/OAuthButtons.jsx".to_string(),
            }
        );
        assert_eq!(cap.label(), "component");
    }

    #[test]
    fn test_index_insert_remove_and_route_lookup() {
        let mut index = CapabilityIndex::default();
        index.insert(
            "oauth",
            ExtensionKind::Plugin,
            &[
                Capability::Route {
                    path: "/oauth/callback".to_string(),
                },
                Capability::component("components/OAuthButtons.jsx"),
            ],
        );
        index.insert(
            "default",
            ExtensionKind::Theme,
            &[Capability::layout("layouts/default.tsx")],
        );

        assert_eq!(index.list(None).len(), 3);
        assert_eq!(index.list(Some(ExtensionKind::Theme)).len(), 1);

        let route = index.find_route("/oauth/callback").expect("route");
        assert_eq!(route.extension_id, "oauth");
        assert!(index.find_route("/missing").is_none());

        index.remove_extension("oauth");
        assert!(index.find_route("/oauth/callback").is_none());
        assert_eq!(index.list(None).len(), 1);
    }
}
