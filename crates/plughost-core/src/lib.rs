//! # plughost-core
//!
//! Core crate for PlugHost. Contains the unified error system,
//! configuration schemas, domain events published on the extension
//! event bus, typed identifiers, and the persistence trait the runtime
//! reconciles against at boot.
//!
//! This crate has **no** internal dependencies on other PlugHost crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
