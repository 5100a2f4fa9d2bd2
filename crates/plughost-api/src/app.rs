//! Application builder: wires the extension runtime, state, and router
//! into an Axum app and runs the server.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use chrono::Utc;
use tracing::{info, warn};

use plughost_core::config::AppConfig;
use plughost_core::error::{AppError, ErrorKind};
use plughost_core::traits::ExtensionStateStore;
use plughost_runtime::{
    CachedContentResolver, ContentResolver, ContentSource, EventBus, ExtensionCatalog,
    JsonFileStateStore, MemoryStateStore, Registry, Sequencer,
};

use crate::router::build_router;
use crate::state::AppState;

/// Builds the shared state: bus, registry, sequencer, and content source.
///
/// `catalog` carries the factories of compiled-in extensions; extensions
/// without a factory run declaratively.
pub async fn build_state(config: AppConfig, catalog: Arc<ExtensionCatalog>) -> AppState {
    let config = Arc::new(config);
    let bus = EventBus::new();
    let registry = Arc::new(Registry::new(catalog, bus.clone(), &config.extensions));

    let store: Arc<dyn ExtensionStateStore> = match &config.extensions.state_file {
        Some(path) => {
            info!(path = %path, "Using persisted extension states");
            Arc::new(JsonFileStateStore::new(path))
        }
        None => Arc::new(MemoryStateStore::default()),
    };
    let sequencer = Sequencer::new(Arc::clone(&registry), store, &config.extensions);

    let resolver = ContentResolver::new(Arc::clone(&registry), config.content.max_file_bytes);
    let content: Arc<dyn ContentSource> = if config.content.cache_enabled {
        Arc::new(CachedContentResolver::new(resolver, &bus, &config.content).await)
    } else {
        Arc::new(resolver)
    };

    AppState {
        gate: sequencer.gate(),
        config,
        registry,
        sequencer,
        content,
        bus,
        started_at: Utc::now(),
        started: Instant::now(),
    }
}

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    build_router(state)
}

/// Runs the PlugHost server until Ctrl-C.
///
/// The extension boot is spawned in the background when
/// `extensions.auto_boot` is set; the listener accepts requests right away
/// and gated routes wait for readiness.
pub async fn run_server(config: AppConfig, catalog: Arc<ExtensionCatalog>) -> Result<(), AppError> {
    info!("Starting PlugHost server...");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let auto_boot = config.extensions.auto_boot;

    let state = build_state(config, catalog).await;
    let sequencer = Arc::clone(&state.sequencer);

    if auto_boot {
        let booting = Arc::clone(&sequencer);
        tokio::spawn(async move {
            let state = booting.boot().await;
            info!(phase = ?state.phase, generation = state.generation, "Extension boot settled");
        });
    } else {
        info!("Automatic boot disabled; waiting for a reload request");
    }

    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Internal, format!("Failed to bind {addr}"), e))?;

    info!("PlugHost server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    info!("Shutting down extensions...");
    if tokio::time::timeout(grace, sequencer.shutdown()).await.is_err() {
        warn!(grace_seconds = grace.as_secs(), "Extension shutdown exceeded the grace period");
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}
