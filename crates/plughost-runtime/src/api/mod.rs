//! The host surface exposed to running extensions.

pub mod context;

pub use context::ExtensionContext;
