//! Guarded execution of extension lifecycle hooks.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tracing::debug;

use crate::error::{ExtensionFailure, FailureKind};

/// Runs one hook with a timeout, converting errors and panics into the
/// failure recorded on the extension.
pub(crate) async fn run_hook<T, F>(
    extension_id: &str,
    hook: &'static str,
    timeout: Duration,
    fut: F,
) -> Result<T, ExtensionFailure>
where
    F: Future<Output = Result<T, String>>,
{
    debug!(extension_id = %extension_id, hook, "Running lifecycle hook");

    match tokio::time::timeout(timeout, AssertUnwindSafe(fut).catch_unwind()).await {
        Ok(Ok(Ok(value))) => Ok(value),
        Ok(Ok(Err(message))) => Err(ExtensionFailure::new(
            FailureKind::HookFailed,
            format!("{hook} hook failed: {message}"),
        )),
        Ok(Err(panic)) => Err(ExtensionFailure::new(
            FailureKind::HookPanicked,
            format!("{hook} hook panicked: {}", panic_message(panic.as_ref())),
        )),
        Err(_) => Err(ExtensionFailure::new(
            FailureKind::HookTimedOut,
            format!("{hook} hook did not finish within {} ms", timeout.as_millis()),
        )),
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hook_outcomes() {
        let ok = run_hook("a", "activate", Duration::from_secs(1), async { Ok::<_, String>(7) }).await;
        assert_eq!(ok, Ok(7));

        let failed = run_hook("a", "activate", Duration::from_secs(1), async {
            Err::<(), _>("db unreachable".to_string())
        })
        .await
        .expect_err("must fail");
        assert_eq!(failed.kind, FailureKind::HookFailed);
        assert!(failed.message.contains("db unreachable"));
    }

    #[tokio::test]
    async fn test_hook_panic_is_captured() {
        async fn explode() -> Result<(), String> {
            panic!("bad state")
        }

        let failure = run_hook("a", "initialize", Duration::from_secs(1), explode())
            .await
            .expect_err("must fail");
        assert_eq!(failure.kind, FailureKind::HookPanicked);
        assert!(failure.message.contains("bad state"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hook_timeout() {
        let failure = run_hook("a", "activate", Duration::from_secs(2), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<(), String>(())
        })
        .await
        .expect_err("must time out");
        assert_eq!(failure.kind, FailureKind::HookTimedOut);
    }
}
