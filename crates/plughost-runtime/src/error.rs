//! Runtime error types.
//!
//! Each subsystem has its own `thiserror` enum; all of them map into
//! [`AppError`] so the HTTP and CLI layers see one error type.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use plughost_core::error::AppError;

use crate::registry::ExtensionStatus;

/// Category of the error captured on a `Failed` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The extension directory has no manifest file.
    ManifestNotFound,
    /// The manifest is unreadable or misses required fields.
    MalformedManifest,
    /// No instance could be created for the declared entry.
    Instantiation,
    /// A lifecycle hook returned an error.
    HookFailed,
    /// A lifecycle hook exceeded the configured timeout.
    HookTimedOut,
    /// A lifecycle hook panicked.
    HookPanicked,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ManifestNotFound => "manifest_not_found",
            Self::MalformedManifest => "malformed_manifest",
            Self::Instantiation => "instantiation",
            Self::HookFailed => "hook_failed",
            Self::HookTimedOut => "hook_timed_out",
            Self::HookPanicked => "hook_panicked",
        };
        f.write_str(label)
    }
}

/// The `last_error` of a failed extension record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionFailure {
    /// What went wrong.
    pub kind: FailureKind,
    /// Human-readable detail.
    pub message: String,
}

impl ExtensionFailure {
    /// Creates a failure.
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ExtensionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Errors produced while loading a single manifest.
#[derive(Debug, Clone, Error)]
pub enum ManifestError {
    /// The directory has no manifest file.
    #[error("No {file} found in extension directory '{dir}'")]
    NotFound {
        /// Expected manifest file name.
        file: &'static str,
        /// Directory name (not the full path).
        dir: String,
    },

    /// The manifest exists but cannot be used.
    #[error("Malformed manifest in '{dir}': {reason}")]
    Malformed {
        /// Directory name (not the full path).
        dir: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Another manifest in the same discovery pass claimed this id.
    #[error("Duplicate extension id '{id}' in '{dir}'")]
    DuplicateId {
        /// The contested id.
        id: String,
        /// Directory of the rejected duplicate.
        dir: String,
    },
}

impl ManifestError {
    /// Converts the error into the failure recorded on the extension.
    pub fn to_failure(&self) -> ExtensionFailure {
        let kind = match self {
            Self::NotFound { .. } => FailureKind::ManifestNotFound,
            Self::Malformed { .. } | Self::DuplicateId { .. } => FailureKind::MalformedManifest,
        };
        ExtensionFailure::new(kind, self.to_string())
    }
}

/// Registry contract violations and lifecycle failures.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// An extension with the same id is already registered.
    #[error("Extension '{id}' is already registered")]
    AlreadyRegistered {
        /// The id.
        id: String,
    },

    /// The id is not installed.
    #[error("Extension '{id}' is not installed")]
    NotFound {
        /// The id.
        id: String,
    },

    /// The requested status change is not allowed from the current status.
    #[error("Illegal transition for extension '{id}': {from} -> {to}")]
    IllegalTransition {
        /// The id.
        id: String,
        /// Current status.
        from: ExtensionStatus,
        /// Requested status.
        to: ExtensionStatus,
    },

    /// The transition payload does not match the target status.
    #[error("Transition of extension '{id}' to {to} requires {expected}")]
    InvalidPayload {
        /// The id.
        id: String,
        /// Requested status.
        to: ExtensionStatus,
        /// Payload the target status needs.
        expected: &'static str,
    },

    /// Another lifecycle operation on the same extension is in progress.
    #[error("Extension '{id}' has a lifecycle operation in progress")]
    Busy {
        /// The id.
        id: String,
    },

    /// The operation requires a theme.
    #[error("Extension '{id}' is not a theme")]
    NotATheme {
        /// The id.
        id: String,
    },

    /// A lifecycle hook failed; the record is now `Failed`.
    #[error("Extension '{id}' failed: {failure}")]
    HookFailed {
        /// The id.
        id: String,
        /// The failure captured on the record.
        failure: ExtensionFailure,
    },
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match &err {
            RegistryError::NotFound { .. } => AppError::not_found(err.to_string()),
            RegistryError::AlreadyRegistered { .. }
            | RegistryError::IllegalTransition { .. }
            | RegistryError::Busy { .. } => AppError::conflict(err.to_string()),
            RegistryError::NotATheme { .. } => AppError::validation(err.to_string()),
            RegistryError::HookFailed { .. } => AppError::extension(err.to_string()),
            RegistryError::InvalidPayload { .. } => AppError::internal(err.to_string()),
        }
    }
}

/// Catastrophic boot failures; these fail the whole boot, not one extension.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// An extensions directory exists but cannot be read.
    #[error("Cannot read {kind} directory '{dir}': {source}")]
    Discovery {
        /// `plugin` or `theme`.
        kind: &'static str,
        /// The configured directory.
        dir: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The persisted extension states could not be loaded.
    #[error("Cannot load persisted extension states: {0}")]
    StateStore(#[from] AppError),
}

impl From<RuntimeError> for AppError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::StateStore(inner) => inner,
            other => AppError::internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plughost_core::error::ErrorKind;

    #[test]
    fn test_manifest_error_failure_kind() {
        let err = ManifestError::Malformed {
            dir: "broken".to_string(),
            reason: "missing required field 'main'".to_string(),
        };
        let failure = err.to_failure();
        assert_eq!(failure.kind, FailureKind::MalformedManifest);
        assert!(failure.message.contains("main"));

        let missing = ManifestError::NotFound {
            file: "plugin.json",
            dir: "empty".to_string(),
        };
        assert_eq!(missing.to_failure().kind, FailureKind::ManifestNotFound);
    }

    #[test]
    fn test_registry_error_mapping() {
        let err: AppError = RegistryError::IllegalTransition {
            id: "oauth".to_string(),
            from: ExtensionStatus::Active,
            to: ExtensionStatus::Initializing,
        }
        .into();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert!(err.message.contains("active -> initializing"));

        let err: AppError = RegistryError::NotFound {
            id: "ghost".to_string(),
        }
        .into();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
