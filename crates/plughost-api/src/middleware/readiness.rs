//! Readiness gate middleware.
//!
//! Holds extension-dependent requests until the runtime is ready, up to
//! `gate.timeout_ms`. On timeout or a failed boot the request is answered
//! with `503 Service Unavailable` and a `Retry-After` header; the boot is
//! never cancelled by an abandoned wait.

use std::time::Duration;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// Waits for the readiness gate before running the inner handler.
pub async fn require_ready(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let timeout = Duration::from_millis(state.config.gate.timeout_ms);
    if let Err(err) = state.gate.await_ready(timeout).await {
        debug!(path = %request.uri().path(), error = %err, "Request rejected by readiness gate");
        return Err(ApiError::from(err).retry_after(state.config.gate.retry_after_seconds));
    }
    Ok(next.run(request).await)
}
