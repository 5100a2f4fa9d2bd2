//! Manifest loading and extension discovery.
//!
//! Every extension directory carries a JSON manifest at its root
//! (`plugin.json` or `theme.json`). Loading is a pure function of the
//! filesystem; discovery walks one extensions directory in lexicographic
//! order so duplicate-id detection is reproducible across boots.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use plughost_core::types::{ExtensionId, ExtensionKind};

use crate::capability::Capability;
use crate::error::{ExtensionFailure, ManifestError, RuntimeError};
use crate::resolver::path::sanitize_relative_path;

/// Capabilities declared in a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityMap {
    /// Page files.
    #[serde(default)]
    pub pages: Vec<String>,
    /// Component files.
    #[serde(default)]
    pub components: Vec<String>,
    /// Route patterns.
    #[serde(default)]
    pub routes: Vec<String>,
    /// Admin page files.
    #[serde(default)]
    pub admin: Vec<String>,
    /// Dashboard widget files.
    #[serde(default)]
    pub widgets: Vec<String>,
    /// Layout files.
    #[serde(default)]
    pub layouts: Vec<String>,
}

impl CapabilityMap {
    /// Expands the map into tagged descriptors.
    pub fn to_descriptors(&self) -> Vec<Capability> {
        let mut caps = Vec::new();
        caps.extend(self.pages.iter().map(|p| Capability::Page { path: p.clone() }));
        caps.extend(self.components.iter().map(|p| Capability::component(p.clone())));
        caps.extend(self.routes.iter().map(|p| Capability::Route { path: p.clone() }));
        caps.extend(self.admin.iter().map(|p| Capability::AdminPage { path: p.clone() }));
        caps.extend(self.widgets.iter().map(|p| Capability::Widget { path: p.clone() }));
        caps.extend(self.layouts.iter().map(|p| Capability::layout(p.clone())));
        caps
    }

    /// Whether nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.to_descriptors().is_empty()
    }

    fn validate(&self) -> Result<(), String> {
        let files = self
            .pages
            .iter()
            .chain(&self.components)
            .chain(&self.admin)
            .chain(&self.widgets)
            .chain(&self.layouts);
        for file in files {
            if sanitize_relative_path(file).is_none() {
                return Err(format!("capability file '{file}' escapes the extension directory"));
            }
        }
        for route in &self.routes {
            if !route.starts_with('/') {
                return Err(format!("route '{route}' must start with '/'"));
            }
        }
        Ok(())
    }
}

/// Immutable metadata of one installed extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionManifest {
    /// Unique, stable identifier.
    pub id: String,
    /// Plugin or theme.
    pub kind: ExtensionKind,
    /// Display name.
    pub name: String,
    /// Version string as declared.
    pub version: String,
    /// Description.
    pub description: String,
    /// Author or maintainer.
    pub author: String,
    /// Declared entry point, relative to `root_dir`.
    pub main: String,
    /// Declared capabilities.
    pub capabilities: CapabilityMap,
    /// Canonical absolute directory; all content resolution is scoped to it.
    #[serde(skip)]
    pub root_dir: PathBuf,
    /// Set on placeholders standing in for manifests that failed to load.
    #[serde(skip)]
    pub(crate) defect: Option<ExtensionFailure>,
}

impl ExtensionManifest {
    /// A stand-in manifest for an extension whose manifest could not be
    /// loaded. Registering it keeps the failure visible as a `Failed`
    /// record; activating it always fails with the original error.
    pub fn placeholder(
        id: impl Into<String>,
        kind: ExtensionKind,
        root_dir: PathBuf,
        failure: ExtensionFailure,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            kind,
            version: String::new(),
            description: String::new(),
            author: String::new(),
            main: String::new(),
            capabilities: CapabilityMap::default(),
            root_dir,
            defect: Some(failure),
        }
    }

    /// The load failure a placeholder stands for.
    pub fn defect(&self) -> Option<&ExtensionFailure> {
        self.defect.as_ref()
    }
}

/// On-disk manifest shape; every field optional so missing ones can be
/// reported precisely.
#[derive(Debug, Deserialize)]
struct RawManifest {
    id: Option<String>,
    name: Option<String>,
    version: Option<String>,
    description: Option<String>,
    author: Option<String>,
    main: Option<String>,
    capabilities: Option<CapabilityMap>,
}

/// Result of inspecting one directory during discovery.
#[derive(Debug)]
pub struct DiscoveredExtension {
    /// Plugin or theme.
    pub kind: ExtensionKind,
    /// Directory name inside the extensions directory.
    pub dir_name: String,
    /// Absolute directory.
    pub root_dir: PathBuf,
    /// Id to record a failure under: the manifest id if it could be read,
    /// otherwise the directory name.
    pub fallback_id: String,
    /// The loaded manifest or why it could not be used.
    pub result: Result<ExtensionManifest, ManifestError>,
}

/// Reads manifests from extension directories.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestLoader;

impl ManifestLoader {
    /// Loads the manifest of the extension rooted at `root_dir`.
    pub async fn load(root_dir: &Path, kind: ExtensionKind) -> Result<ExtensionManifest, ManifestError> {
        Self::load_with_identity(root_dir, kind).await.1
    }

    /// Loads a manifest and also returns the declared id when it could be
    /// read, even if the manifest is otherwise unusable.
    async fn load_with_identity(
        root_dir: &Path,
        kind: ExtensionKind,
    ) -> (Option<String>, Result<ExtensionManifest, ManifestError>) {
        let dir = dir_label(root_dir);
        let file = kind.manifest_file();
        let malformed = |reason: String| ManifestError::Malformed {
            dir: dir.clone(),
            reason,
        };

        let bytes = match fs::read(root_dir.join(file)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return (None, Err(ManifestError::NotFound { file, dir: dir.clone() }));
            }
            Err(e) => return (None, Err(malformed(format!("unreadable {file}: {e}")))),
        };

        let raw: RawManifest = match serde_json::from_slice(&bytes) {
            Ok(raw) => raw,
            Err(e) => return (None, Err(malformed(format!("invalid JSON: {e}")))),
        };

        let declared_id = raw
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| ExtensionId::is_valid(id))
            .map(str::to_string);

        let result = Self::build(raw, kind, root_dir, &dir).await;
        (declared_id, result)
    }

    async fn build(
        raw: RawManifest,
        kind: ExtensionKind,
        root_dir: &Path,
        dir: &str,
    ) -> Result<ExtensionManifest, ManifestError> {
        let malformed = |reason: String| ManifestError::Malformed {
            dir: dir.to_string(),
            reason,
        };

        let id = required(raw.id, "id").map_err(malformed)?;
        if !ExtensionId::is_valid(&id) {
            return Err(malformed(format!("invalid id '{id}'")));
        }
        let version = required(raw.version, "version").map_err(malformed)?;
        let main = required(raw.main, "main").map_err(malformed)?;
        if sanitize_relative_path(&main).is_none() {
            return Err(malformed(format!(
                "entry '{main}' must be a relative path inside the extension"
            )));
        }

        let name = optional(raw.name, "name", &id, || id.clone());
        let description = optional(raw.description, "description", &id, String::new);
        let author = optional(raw.author, "author", &id, String::new);
        let capabilities = match raw.capabilities {
            Some(caps) => caps,
            None => {
                warn!(extension_id = %id, field = "capabilities", "Manifest field missing, defaulting to none");
                CapabilityMap::default()
            }
        };
        capabilities.validate().map_err(malformed)?;

        let root_dir = fs::canonicalize(root_dir)
            .await
            .map_err(|e| malformed(format!("cannot resolve extension directory: {e}")))?;

        Ok(ExtensionManifest {
            id,
            kind,
            name,
            version,
            description,
            author,
            main,
            capabilities,
            root_dir,
            defect: None,
        })
    }

    /// Inspects every sub-directory of `dir`, in lexicographic order.
    ///
    /// `seen_ids` carries ids across calls so plugins and themes share one
    /// id space within a discovery pass. A missing directory is an empty
    /// set; any other failure to list it is catastrophic.
    pub async fn discover(
        dir: &Path,
        kind: ExtensionKind,
        seen_ids: &mut HashSet<String>,
    ) -> Result<Vec<DiscoveredExtension>, RuntimeError> {
        let discovery_error = |source: std::io::Error| RuntimeError::Discovery {
            kind: kind.as_str(),
            dir: dir.display().to_string(),
            source,
        };

        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(dir = %dir.display(), kind = %kind, "Extensions directory does not exist");
                return Ok(Vec::new());
            }
            Err(e) => return Err(discovery_error(e)),
        };

        let mut dirs = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(discovery_error)? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            match fs::metadata(entry.path()).await {
                Ok(meta) if meta.is_dir() => dirs.push((name, entry.path())),
                Ok(_) => {}
                Err(e) => warn!(entry = %name, error = %e, "Skipping unreadable entry"),
            }
        }
        dirs.sort_by(|a, b| a.0.cmp(&b.0));

        let mut discovered = Vec::with_capacity(dirs.len());
        for (dir_name, root_dir) in dirs {
            let (declared_id, mut result) = Self::load_with_identity(&root_dir, kind).await;

            if let Ok(manifest) = &result {
                if !seen_ids.insert(manifest.id.clone()) {
                    result = Err(ManifestError::DuplicateId {
                        id: manifest.id.clone(),
                        dir: dir_name.clone(),
                    });
                }
            }

            debug!(dir = %dir_name, kind = %kind, ok = result.is_ok(), "Inspected extension directory");

            discovered.push(DiscoveredExtension {
                kind,
                fallback_id: declared_id.unwrap_or_else(|| dir_name.clone()),
                dir_name,
                root_dir,
                result,
            });
        }

        Ok(discovered)
    }
}

fn dir_label(root_dir: &Path) -> String {
    root_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn required(value: Option<String>, field: &str) -> Result<String, String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(format!("missing required field '{field}'")),
    }
}

fn optional(
    value: Option<String>,
    field: &str,
    id: &str,
    default: impl FnOnce() -> String,
) -> String {
    match value {
        Some(v) => v,
        None => {
            warn!(extension_id = %id, field = %field, "Manifest field missing, using default");
            default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_manifest(root: &Path, dir: &str, file: &str, body: &str) -> PathBuf {
        let path = root.join(dir);
        std::fs::create_dir_all(&path).expect("mkdir");
        std::fs::write(path.join(file), body).expect("write manifest");
        path
    }

    #[tokio::test]
    async fn test_load_full_manifest() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dir = write_manifest(
            temp.path(),
            "oauth-plugin",
            "plugin.json",
            r#"{
                "id": "oauth",
                "name": "OAuth",
                "version": "1.2.0",
                "main": "index.js",
                "capabilities": {
                    "routes": ["/oauth/callback"],
                    "admin": ["admin/oauth-settings.jsx"],
                    "widgets": ["widgets/oauth-stats.jsx"],
                    "components": ["components/OAuthButtons.jsx"]
                }
            }"#,
        );

        let manifest = ManifestLoader::load(&dir, ExtensionKind::Plugin)
            .await
            .expect("manifest");
        assert_eq!(manifest.id, "oauth");
        assert_eq!(manifest.name, "OAuth");
        assert_eq!(manifest.description, "");
        assert!(manifest.root_dir.is_absolute());
        assert_eq!(manifest.capabilities.to_descriptors().len(), 4);
        assert!(manifest.defect().is_none());
    }

    #[tokio::test]
    async fn test_partial_manifest_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dir = write_manifest(
            temp.path(),
            "default",
            "theme.json",
            r#"{"id": "default", "version": "1.0.0", "main": "index.js"}"#,
        );

        let manifest = ManifestLoader::load(&dir, ExtensionKind::Theme)
            .await
            .expect("manifest");
        assert_eq!(manifest.name, "default");
        assert!(manifest.capabilities.is_empty());
    }

    #[tokio::test]
    async fn test_missing_main_is_malformed() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dir = write_manifest(
            temp.path(),
            "b",
            "plugin.json",
            r#"{"id": "b", "version": "1.0.0"}"#,
        );

        let err = ManifestLoader::load(&dir, ExtensionKind::Plugin)
            .await
            .expect_err("must fail");
        assert!(matches!(err, ManifestError::Malformed { ref reason, .. } if reason.contains("main")));
    }

    #[tokio::test]
    async fn test_escaping_entry_is_malformed() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dir = write_manifest(
            temp.path(),
            "evil",
            "plugin.json",
            r#"{"id": "evil", "version": "1.0.0", "main": "../../bin/sh"}"#,
        );

        let err = ManifestLoader::load(&dir, ExtensionKind::Plugin)
            .await
            .expect_err("must fail");
        assert!(matches!(err, ManifestError::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_missing_manifest_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dir = temp.path().join("empty");
        std::fs::create_dir_all(&dir).expect("mkdir");

        let err = ManifestLoader::load(&dir, ExtensionKind::Plugin)
            .await
            .expect_err("must fail");
        assert!(matches!(err, ManifestError::NotFound { file: "plugin.json", .. }));
    }

    #[tokio::test]
    async fn test_discover_orders_and_detects_duplicates() {
        let temp = tempfile::tempdir().expect("tempdir");
        let manifest = |id: &str| format!(r#"{{"id": "{id}", "version": "1.0.0", "main": "index.js"}}"#);
        write_manifest(temp.path(), "zeta", "plugin.json", &manifest("shared"));
        write_manifest(temp.path(), "alpha", "plugin.json", &manifest("shared"));
        write_manifest(temp.path(), "mid", "plugin.json", &manifest("mid"));
        std::fs::write(temp.path().join("README.md"), "not an extension").expect("write");

        let mut seen = HashSet::new();
        let found = ManifestLoader::discover(temp.path(), ExtensionKind::Plugin, &mut seen)
            .await
            .expect("discover");

        let names: Vec<_> = found.iter().map(|d| d.dir_name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
        assert!(found[0].result.is_ok());
        assert!(matches!(
            found[2].result,
            Err(ManifestError::DuplicateId { ref id, .. }) if id == "shared"
        ));
        assert_eq!(found[2].fallback_id, "shared");
    }

    #[tokio::test]
    async fn test_discover_missing_dir_is_empty() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut seen = HashSet::new();
        let found = ManifestLoader::discover(&temp.path().join("nope"), ExtensionKind::Theme, &mut seen)
            .await
            .expect("discover");
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_discover_unreadable_dir_is_catastrophic() {
        let temp = tempfile::tempdir().expect("tempdir");
        let file = temp.path().join("plugins");
        std::fs::write(&file, "not a directory").expect("write");

        let mut seen = HashSet::new();
        let err = ManifestLoader::discover(&file, ExtensionKind::Plugin, &mut seen)
            .await
            .expect_err("must fail");
        assert!(matches!(err, RuntimeError::Discovery { kind: "plugin", .. }));
    }
}
