//! Core traits defined in `plughost-core` and implemented by other crates.

pub mod state_store;

pub use state_store::{ExtensionStateStore, PersistedExtension};
