//! # plughost-api
//!
//! HTTP API layer for PlugHost built on Axum.
//!
//! Provides health and readiness endpoints, gated extension listing and
//! content delivery, admin lifecycle endpoints, the readiness-gate and
//! request logging middleware, DTOs, and error mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, build_state, run_server};
pub use error::{ApiError, ApiErrorResponse};
pub use state::AppState;
