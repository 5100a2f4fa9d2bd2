//! Secure resolution of extension-owned files.
//!
//! A request names an extension id and a path relative to that extension's
//! root. The path is validated syntactically before anything touches the
//! filesystem, then checked again after symlinks are resolved, so nothing
//! outside `root_dir` is ever read.

pub mod cache;
pub mod category;
pub mod path;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

use plughost_core::error::AppError;

use crate::registry::{ExtensionStatus, Registry};

pub use cache::CachedContentResolver;
pub use category::{ContentCategory, mime_from_path};
use path::{is_contained, sanitize_relative_path};

/// Why content could not be resolved. Messages never include filesystem
/// paths.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// No extension with this id is installed.
    #[error("Extension '{id}' is not installed")]
    NotFound {
        /// The id.
        id: String,
    },

    /// The extension exists but is not serving content.
    #[error("Extension '{id}' is not active")]
    Inactive {
        /// The id.
        id: String,
        /// Its current status.
        status: ExtensionStatus,
    },

    /// The path is malformed or escapes the extension directory.
    #[error("Invalid content path")]
    InvalidPath,

    /// The path is valid but no such file exists.
    #[error("Content not found")]
    FileNotFound,

    /// The file exceeds the configured size limit.
    #[error("Content exceeds the {limit} byte limit")]
    TooLarge {
        /// Configured limit in bytes.
        limit: u64,
    },

    /// The file exists but could not be read.
    #[error("Content could not be read: {reason}")]
    Unreadable {
        /// I/O error kind.
        reason: String,
    },
}

impl From<ResolveError> for AppError {
    fn from(err: ResolveError) -> Self {
        match &err {
            ResolveError::NotFound { .. } | ResolveError::FileNotFound => {
                AppError::not_found(err.to_string())
            }
            ResolveError::Inactive { .. } => AppError::conflict(err.to_string()),
            ResolveError::InvalidPath | ResolveError::TooLarge { .. } => {
                AppError::validation(err.to_string())
            }
            ResolveError::Unreadable { .. } => AppError::storage(err.to_string()),
        }
    }
}

/// A file read from inside an extension directory.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedContent {
    /// Owning extension.
    pub extension_id: String,
    /// Normalized relative path, `/`-separated.
    pub path: String,
    /// Inferred category.
    pub category: ContentCategory,
    /// MIME type.
    pub content_type: &'static str,
    /// File bytes.
    #[serde(skip)]
    pub content: Bytes,
}

/// Anything that can serve extension content.
#[async_trait]
pub trait ContentSource: Send + Sync + std::fmt::Debug {
    /// Resolves `relative_path` inside the active extension `id`.
    async fn resolve(&self, id: &str, relative_path: &str)
    -> Result<ResolvedContent, ResolveError>;
}

/// Resolves extension-relative paths against the registry.
#[derive(Debug, Clone)]
pub struct ContentResolver {
    registry: Arc<Registry>,
    max_file_bytes: u64,
}

impl ContentResolver {
    /// Creates a resolver reading files up to `max_file_bytes`.
    pub fn new(registry: Arc<Registry>, max_file_bytes: u64) -> Self {
        Self {
            registry,
            max_file_bytes,
        }
    }

    /// The registry the resolver reads from.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Resolves `relative_path` inside the active extension `id`.
    pub async fn resolve(
        &self,
        id: &str,
        relative_path: &str,
    ) -> Result<ResolvedContent, ResolveError> {
        let record = self
            .registry
            .get(id)
            .await
            .ok_or_else(|| ResolveError::NotFound { id: id.to_string() })?;
        if record.status != ExtensionStatus::Active {
            return Err(ResolveError::Inactive {
                id: id.to_string(),
                status: record.status,
            });
        }

        let relative = sanitize_relative_path(relative_path).ok_or_else(|| {
            warn!(extension_id = %id, "Rejected malformed content path");
            ResolveError::InvalidPath
        })?;

        let root = &record.manifest.root_dir;
        let candidate = root.join(&relative);
        if !is_contained(root, &candidate) {
            warn!(extension_id = %id, "Rejected content path outside the extension");
            return Err(ResolveError::InvalidPath);
        }

        let file = self.confine(id, root, &candidate).await?;

        let meta = fs::metadata(&file).await.map_err(io_error)?;
        if !meta.is_file() {
            return Err(ResolveError::FileNotFound);
        }
        if meta.len() > self.max_file_bytes {
            return Err(ResolveError::TooLarge {
                limit: self.max_file_bytes,
            });
        }

        let content = fs::read(&file).await.map_err(io_error)?;
        debug!(extension_id = %id, bytes = content.len(), "Resolved extension content");

        Ok(ResolvedContent {
            extension_id: id.to_string(),
            path: to_slash(&relative),
            category: ContentCategory::from_path(&relative),
            content_type: mime_from_path(&relative),
            content: Bytes::from(content),
        })
    }

    /// Resolves symlinks on both sides and re-checks containment.
    async fn confine(&self, id: &str, root: &Path, candidate: &Path) -> Result<PathBuf, ResolveError> {
        let real_root = fs::canonicalize(root).await.map_err(io_error)?;
        let real = fs::canonicalize(candidate).await.map_err(io_error)?;
        if !is_contained(&real_root, &real) {
            warn!(extension_id = %id, "Rejected content path escaping through a symlink");
            return Err(ResolveError::InvalidPath);
        }
        Ok(real)
    }
}

#[async_trait]
impl ContentSource for ContentResolver {
    async fn resolve(
        &self,
        id: &str,
        relative_path: &str,
    ) -> Result<ResolvedContent, ResolveError> {
        ContentResolver::resolve(self, id, relative_path).await
    }
}

fn io_error(err: std::io::Error) -> ResolveError {
    match err.kind() {
        std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory => ResolveError::FileNotFound,
        kind => ResolveError::Unreadable {
            reason: kind.to_string(),
        },
    }
}

fn to_slash(path: &Path) -> String {
    path.iter()
        .map(|s| s.to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
