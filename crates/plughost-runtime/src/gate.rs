//! Readiness gate for extension-dependent requests.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;

use plughost_core::error::AppError;

use crate::sequencer::{BootPhase, SystemReadinessState};

/// Why a request may not proceed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GateError {
    /// The runtime did not become ready in time. The boot keeps running.
    #[error("System warming up: extensions not ready after {waited_ms} ms")]
    TimedOut {
        /// How long the caller waited.
        waited_ms: u64,
    },

    /// The boot failed; waiting would not help.
    #[error("System unavailable: extension boot failed: {reason}")]
    BootFailed {
        /// Boot error.
        reason: String,
    },
}

impl From<GateError> for AppError {
    fn from(err: GateError) -> Self {
        AppError::service_unavailable(err.to_string())
    }
}

/// Cheap, cloneable barrier over the sequencer's readiness state.
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    rx: watch::Receiver<SystemReadinessState>,
}

impl ReadinessGate {
    /// Wraps a readiness receiver.
    pub fn new(rx: watch::Receiver<SystemReadinessState>) -> Self {
        Self { rx }
    }

    /// Current phase.
    pub fn phase(&self) -> BootPhase {
        self.rx.borrow().phase
    }

    /// Returns once the runtime is ready.
    ///
    /// Ready returns without suspending. Failed returns
    /// [`GateError::BootFailed`] immediately. Otherwise the caller waits up
    /// to `timeout`; giving up never cancels the boot.
    pub async fn await_ready(&self, timeout: Duration) -> Result<(), GateError> {
        {
            let state = self.rx.borrow();
            match state.phase {
                BootPhase::Ready => return Ok(()),
                BootPhase::Failed => return Err(boot_failed(state.error.clone())),
                BootPhase::NotStarted | BootPhase::Booting => {}
            }
        }

        debug!(timeout_ms = timeout.as_millis() as u64, "Waiting for extension runtime");

        let mut rx = self.rx.clone();
        let settled = tokio::time::timeout(timeout, async move {
            rx.wait_for(|s| s.phase.is_settled())
                .await
                .map(|s| (s.phase, s.error.clone()))
        })
        .await;

        match settled {
            Ok(Ok((BootPhase::Ready, _))) => Ok(()),
            Ok(Ok((_, error))) => Err(boot_failed(error)),
            Ok(Err(_closed)) => Err(boot_failed(Some("readiness channel closed".to_string()))),
            Err(_) => Err(GateError::TimedOut {
                waited_ms: timeout.as_millis() as u64,
            }),
        }
    }
}

fn boot_failed(error: Option<String>) -> GateError {
    GateError::BootFailed {
        reason: error.unwrap_or_else(|| "unknown error".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    fn state(phase: BootPhase) -> SystemReadinessState {
        SystemReadinessState {
            phase,
            ..SystemReadinessState::default()
        }
    }

    #[tokio::test]
    async fn test_ready_passes_with_zero_timeout() {
        let (_tx, rx) = watch::channel(state(BootPhase::Ready));
        let gate = ReadinessGate::new(rx);
        assert_eq!(gate.await_ready(Duration::ZERO).await, Ok(()));
    }

    #[tokio::test]
    async fn test_failed_is_immediate() {
        let mut failed = state(BootPhase::Failed);
        failed.error = Some("plugins dir unreadable".to_string());
        let (_tx, rx) = watch::channel(failed);
        let gate = ReadinessGate::new(rx);

        let err = gate
            .await_ready(Duration::from_secs(60))
            .await
            .expect_err("must fail");
        assert!(matches!(err, GateError::BootFailed { ref reason } if reason.contains("unreadable")));
    }

    #[tokio::test]
    async fn test_times_out_no_earlier_than_timeout() {
        let (_tx, rx) = watch::channel(state(BootPhase::Booting));
        let gate = ReadinessGate::new(rx);

        let started = Instant::now();
        let err = gate
            .await_ready(Duration::from_millis(80))
            .await
            .expect_err("must time out");
        assert!(started.elapsed() >= Duration::from_millis(80));
        assert_eq!(err, GateError::TimedOut { waited_ms: 80 });
    }

    #[tokio::test]
    async fn test_wakes_when_ready() {
        let (tx, rx) = watch::channel(state(BootPhase::Booting));
        let gate = ReadinessGate::new(rx);

        let waiter = tokio::spawn(async move { gate.await_ready(Duration::from_secs(5)).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send_modify(|s| s.phase = BootPhase::Ready);

        assert_eq!(waiter.await.expect("join"), Ok(()));
    }
}
