//! Core type definitions used across the PlugHost workspace.

pub mod id;
pub mod kind;

pub use id::*;
pub use kind::ExtensionKind;
