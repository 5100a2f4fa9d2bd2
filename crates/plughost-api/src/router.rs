//! Route definitions for the PlugHost HTTP API.
//!
//! All routes are organized by concern and mounted under `/api`.
//! Extension-dependent routes sit behind the readiness gate; health,
//! readiness, and reload never wait.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::middleware::cors::build_cors_layer;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let gated = Router::new()
        .merge(extension_routes())
        .merge(admin_lifecycle_routes())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::readiness::require_ready,
        ));

    let api_routes = Router::new()
        .merge(health_routes())
        .merge(system_routes())
        .merge(gated);

    let cors = build_cors_layer(&state.config.server.cors);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Extension listing, capabilities, and content (gated)
fn extension_routes() -> Router<AppState> {
    Router::new()
        .route("/extensions", get(handlers::extensions::list_extensions))
        .route("/extensions/{id}", get(handlers::extensions::get_extension))
        .route(
            "/extensions/{id}/content/{*path}",
            get(handlers::content::get_content),
        )
        .route("/capabilities", get(handlers::extensions::list_capabilities))
}

/// Admin lifecycle endpoints (gated)
fn admin_lifecycle_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/admin/extensions/{id}/activate",
            post(handlers::admin::activate),
        )
        .route(
            "/admin/extensions/{id}/deactivate",
            post(handlers::admin::deactivate),
        )
        .route(
            "/admin/themes/{id}/activate",
            post(handlers::admin::activate_theme),
        )
        .route("/admin/events", post(handlers::admin::relay_event))
}

/// Health check endpoints (never gated)
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}

/// Readiness and reload (never gated)
fn system_routes() -> Router<AppState> {
    Router::new()
        .route("/system/readiness", get(handlers::system::readiness))
        .route(
            "/admin/extensions/reload",
            post(handlers::admin::reload),
        )
}
