//! Initialization sequencer: drives discovery, registration, and
//! activation exactly once per generation and publishes readiness.
//!
//! Readiness lives in a `watch` channel. Starting a boot is an atomic
//! `NotStarted -> Booting` flip on that channel; only the caller that wins
//! the flip spawns the boot task, everyone else waits for it to settle.
//! The boot task is detached, so callers that stop waiting never cancel it.

use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{error, info, warn};

use plughost_core::config::extensions::ExtensionsConfig;
use plughost_core::events::{ExtensionEvent, NamedEvent, SystemEvent};
use plughost_core::traits::ExtensionStateStore;
use plughost_core::types::ExtensionKind;

use crate::error::{FailureKind, ManifestError, RegistryError, RuntimeError};
use crate::gate::ReadinessGate;
use crate::lifecycle::panic_message;
use crate::manifest::{DiscoveredExtension, ExtensionManifest, ManifestLoader};
use crate::registry::{ExtensionStatus, Registry, TransitionPayload};

/// Boot phase of the runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BootPhase {
    /// No boot has been requested in this generation.
    #[default]
    NotStarted,
    /// A boot is running.
    Booting,
    /// Every extension settled.
    Ready,
    /// Discovery or the state store failed.
    Failed,
}

impl BootPhase {
    /// Whether the boot of this generation has finished.
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

/// An extension that ended `Failed` during boot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedExtension {
    pub id: String,
    pub kind: FailureKind,
    pub message: String,
}

/// A directory that produced no record at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedExtension {
    pub dir: String,
    pub reason: String,
}

/// Summary of one boot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootReport {
    pub generation: u64,
    pub discovered: usize,
    pub active: Vec<String>,
    pub inactive: Vec<String>,
    pub failed: Vec<FailedExtension>,
    pub skipped: Vec<SkippedExtension>,
    pub active_theme: Option<String>,
    pub duration_ms: u64,
}

/// Observable readiness of the runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemReadinessState {
    pub phase: BootPhase,
    pub generation: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub ready_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub report: Option<BootReport>,
}

#[derive(Debug, Clone)]
struct BootOptions {
    plugins_dir: PathBuf,
    themes_dir: PathBuf,
    default_active: bool,
    default_theme: String,
}

/// Runs the boot sequence and owns the readiness state.
#[derive(Debug)]
pub struct Sequencer {
    registry: Arc<Registry>,
    store: Arc<dyn ExtensionStateStore>,
    options: BootOptions,
    state: watch::Sender<SystemReadinessState>,
    runs: AtomicU64,
}

impl Sequencer {
    /// Creates a sequencer in `NotStarted`.
    pub fn new(
        registry: Arc<Registry>,
        store: Arc<dyn ExtensionStateStore>,
        config: &ExtensionsConfig,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(SystemReadinessState::default());
        Arc::new(Self {
            registry,
            store,
            options: BootOptions {
                plugins_dir: PathBuf::from(&config.plugins_dir),
                themes_dir: PathBuf::from(&config.themes_dir),
                default_active: config.default_active,
                default_theme: config.default_theme.clone(),
            },
            state,
            runs: AtomicU64::new(0),
        })
    }

    /// The registry being booted.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Snapshot of the readiness state.
    pub fn state(&self) -> SystemReadinessState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every readiness change.
    pub fn subscribe_state(&self) -> watch::Receiver<SystemReadinessState> {
        self.state.subscribe()
    }

    /// A readiness gate over this sequencer.
    pub fn gate(&self) -> ReadinessGate {
        ReadinessGate::new(self.state.subscribe())
    }

    /// Number of boot sequences actually executed.
    pub fn boot_runs(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }

    /// Boots the runtime if it has not started and waits until the boot
    /// settles. Concurrent callers share one boot.
    pub async fn boot(self: &Arc<Self>) -> SystemReadinessState {
        let won = self.state.send_if_modified(|s| {
            if s.phase != BootPhase::NotStarted {
                return false;
            }
            s.phase = BootPhase::Booting;
            s.started_at = Some(Utc::now());
            s.ready_at = None;
            s.error = None;
            s.report = None;
            true
        });

        if won {
            let this = Arc::clone(self);
            tokio::spawn(async move { this.run().await });
        }

        self.wait_settled().await
    }

    /// Re-initializes: tears the registry down and runs the whole sequence
    /// again under a new generation. Attaches to a boot already running.
    pub async fn reload(self: &Arc<Self>) -> SystemReadinessState {
        let reset = self.state.send_if_modified(|s| {
            if !s.phase.is_settled() {
                return false;
            }
            s.phase = BootPhase::NotStarted;
            s.generation += 1;
            true
        });
        if reset {
            info!(generation = self.state.borrow().generation, "Re-initializing extensions");
        }
        self.boot().await
    }

    /// Deactivates every extension; used on process shutdown.
    pub async fn shutdown(&self) {
        self.registry.teardown().await;
    }

    async fn wait_settled(&self) -> SystemReadinessState {
        let mut rx = self.state.subscribe();
        let settled = rx.wait_for(|s| s.phase.is_settled()).await.map(|s| s.clone());
        settled.unwrap_or_else(|_| self.state())
    }

    async fn run(&self) {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let generation = self.state.borrow().generation;
        let started = Instant::now();
        info!(generation, "Extension boot started");

        let outcome = AssertUnwindSafe(self.sequence(generation))
            .catch_unwind()
            .await;

        let bus = self.registry.bus().clone();
        match outcome {
            Ok(Ok(mut report)) => {
                report.duration_ms = started.elapsed().as_millis() as u64;
                let event = SystemEvent::Ready {
                    generation,
                    active: report.active.len(),
                    inactive: report.inactive.len(),
                    failed: report.failed.len(),
                };
                info!(
                    generation,
                    active = report.active.len(),
                    inactive = report.inactive.len(),
                    failed = report.failed.len(),
                    duration_ms = report.duration_ms,
                    "Extension runtime ready"
                );
                self.state.send_modify(|s| {
                    s.phase = BootPhase::Ready;
                    s.ready_at = Some(Utc::now());
                    s.report = Some(report);
                });
                bus.publish(event.into_domain()).await;
            }
            Ok(Err(err)) => self.fail(generation, err.to_string()).await,
            Err(panic) => {
                let message = format!("boot sequence panicked: {}", panic_message(panic.as_ref()));
                self.fail(generation, message).await;
            }
        }
    }

    async fn fail(&self, generation: u64, message: String) {
        error!(generation, error = %message, "Extension boot failed");
        self.state.send_modify(|s| {
            s.phase = BootPhase::Failed;
            s.error = Some(message.clone());
        });
        self.registry
            .bus()
            .publish(
                SystemEvent::Failed {
                    generation,
                    error: message,
                }
                .into_domain(),
            )
            .await;
    }

    async fn sequence(&self, generation: u64) -> Result<BootReport, RuntimeError> {
        self.registry.teardown().await;
        self.registry
            .bus()
            .publish(SystemEvent::Booting { generation }.into_domain())
            .await;

        let mut seen = HashSet::new();
        let mut discovered =
            ManifestLoader::discover(&self.options.plugins_dir, ExtensionKind::Plugin, &mut seen).await?;
        discovered.extend(
            ManifestLoader::discover(&self.options.themes_dir, ExtensionKind::Theme, &mut seen).await?,
        );

        let persisted: HashMap<String, bool> = self
            .store
            .load_states()
            .await?
            .into_iter()
            .map(|p| (p.id, p.is_active))
            .collect();

        let mut report = BootReport {
            generation,
            discovered: discovered.len(),
            ..BootReport::default()
        };

        let plan = self.register_all(discovered, &seen, &mut report).await;
        let theme = self.choose_theme(&plan, &persisted);

        for entry in &plan {
            let wanted = entry.broken
                || match entry.kind {
                    ExtensionKind::Plugin => persisted
                        .get(&entry.id)
                        .copied()
                        .unwrap_or(self.options.default_active),
                    ExtensionKind::Theme => theme.as_deref() == Some(entry.id.as_str()),
                };

            if wanted {
                self.start(&entry.id, &mut report).await;
            } else {
                match self
                    .registry
                    .transition(&entry.id, ExtensionStatus::Inactive, TransitionPayload::None)
                    .await
                {
                    Ok(_) => report.inactive.push(entry.id.clone()),
                    Err(e) => warn!(extension_id = %entry.id, error = %e, "Could not mark extension inactive"),
                }
            }
        }

        if let Some(active) = self.registry.active_theme().await {
            report.active_theme = Some(active.id().to_string());
            self.registry
                .bus()
                .publish(
                    ExtensionEvent::ThemeChanged {
                        id: active.id().to_string(),
                        previous: None,
                    }
                    .into_domain(),
                )
                .await;
        } else {
            warn!(default_theme = %self.options.default_theme, "No theme is active");
        }

        Ok(report)
    }

    /// Registers every discovered extension; broken manifests become
    /// placeholders that fail on activation. A placeholder never takes an
    /// id that a valid manifest in `claimed` declares; it falls back to its
    /// directory name instead.
    async fn register_all(
        &self,
        discovered: Vec<DiscoveredExtension>,
        claimed: &HashSet<String>,
        report: &mut BootReport,
    ) -> Vec<PlanEntry> {
        let mut plan = Vec::with_capacity(discovered.len());

        for found in discovered {
            let (manifest, broken) = match found.result {
                Ok(manifest) => (manifest, false),
                Err(err @ ManifestError::DuplicateId { .. }) => {
                    warn!(dir = %found.dir_name, error = %err, "Skipping duplicate extension");
                    report.skipped.push(SkippedExtension {
                        dir: found.dir_name,
                        reason: err.to_string(),
                    });
                    continue;
                }
                Err(err) => {
                    warn!(dir = %found.dir_name, error = %err, "Extension manifest rejected");
                    let placeholder_id = if claimed.contains(&found.fallback_id) {
                        found.dir_name.clone()
                    } else {
                        found.fallback_id
                    };
                    let placeholder = ExtensionManifest::placeholder(
                        placeholder_id,
                        found.kind,
                        found.root_dir,
                        err.to_failure(),
                    );
                    (placeholder, true)
                }
            };

            let id = manifest.id.clone();
            let kind = manifest.kind;
            match self.registry.register(manifest).await {
                Ok(_) => plan.push(PlanEntry { id, kind, broken }),
                Err(err) => {
                    warn!(dir = %found.dir_name, error = %err, "Extension not registered");
                    report.skipped.push(SkippedExtension {
                        dir: found.dir_name,
                        reason: err.to_string(),
                    });
                }
            }
        }

        plan
    }

    /// The persisted active theme, else the configured default.
    fn choose_theme(&self, plan: &[PlanEntry], persisted: &HashMap<String, bool>) -> Option<String> {
        let themes: Vec<&PlanEntry> = plan
            .iter()
            .filter(|e| e.kind == ExtensionKind::Theme && !e.broken)
            .collect();

        themes
            .iter()
            .find(|e| persisted.get(&e.id).copied().unwrap_or(false))
            .or_else(|| themes.iter().find(|e| e.id == self.options.default_theme))
            .map(|e| e.id.clone())
    }

    async fn start(&self, id: &str, report: &mut BootReport) {
        match self.registry.activate(id).await {
            Ok(_) => report.active.push(id.to_string()),
            Err(RegistryError::HookFailed { failure, .. }) => report.failed.push(FailedExtension {
                id: id.to_string(),
                kind: failure.kind,
                message: failure.message,
            }),
            Err(other) => {
                warn!(extension_id = %id, error = %other, "Extension could not be started");
                report.failed.push(FailedExtension {
                    id: id.to_string(),
                    kind: FailureKind::Instantiation,
                    message: other.to_string(),
                });
            }
        }
    }
}

#[derive(Debug)]
struct PlanEntry {
    id: String,
    kind: ExtensionKind,
    broken: bool,
}
