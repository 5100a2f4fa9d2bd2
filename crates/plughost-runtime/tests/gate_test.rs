mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use plughost_runtime::{BootPhase, ExtensionStatus, GateError};

use common::{Fixture, Probe, register_probe, runtime};

#[tokio::test]
async fn test_fifty_gated_requests_during_boot_all_proceed() {
    let fixture = Fixture::new();
    fixture.plugin("slow", "slow");
    let rt = runtime(&fixture.config(), Vec::new());
    register_probe(&rt.catalog, "slow", || Probe {
        init_delay: Duration::from_millis(100),
        ..Probe::default()
    })
    .await;

    let sequencer = Arc::clone(&rt.sequencer);
    let boot = tokio::spawn(async move { sequencer.boot().await });

    let requests: Vec<_> = (0..50)
        .map(|_| {
            let gate = rt.sequencer.gate();
            let registry = Arc::clone(&rt.registry);
            tokio::spawn(async move {
                gate.await_ready(Duration::from_secs(5)).await?;
                let status = registry.get("slow").await.map(|r| r.status);
                Ok::<_, GateError>(status)
            })
        })
        .collect();

    for request in requests {
        let status = request.await.expect("join").expect("gate");
        assert_eq!(status, Some(ExtensionStatus::Active));
    }
    assert_eq!(boot.await.expect("join").phase, BootPhase::Ready);
    assert_eq!(rt.sequencer.boot_runs(), 1);
}

#[tokio::test]
async fn test_timeout_does_not_cancel_boot() {
    let fixture = Fixture::new();
    fixture.plugin("slow", "slow");
    let rt = runtime(&fixture.config(), Vec::new());
    register_probe(&rt.catalog, "slow", || Probe {
        init_delay: Duration::from_millis(300),
        ..Probe::default()
    })
    .await;

    let sequencer = Arc::clone(&rt.sequencer);
    let boot = tokio::spawn(async move { sequencer.boot().await });
    tokio::time::sleep(Duration::from_millis(10)).await;

    let gate = rt.sequencer.gate();
    assert_eq!(gate.phase(), BootPhase::Booting);

    let started = Instant::now();
    let err = gate
        .await_ready(Duration::from_millis(50))
        .await
        .expect_err("still booting");
    assert!(matches!(err, GateError::TimedOut { waited_ms: 50 }));
    assert!(started.elapsed() >= Duration::from_millis(50));

    // The abandoned wait left the boot running to completion.
    assert_eq!(boot.await.expect("join").phase, BootPhase::Ready);
    assert_eq!(gate.await_ready(Duration::ZERO).await, Ok(()));
}

#[tokio::test]
async fn test_waits_through_not_started() {
    let fixture = Fixture::new();
    fixture.plugin("oauth", "oauth");
    let rt = runtime(&fixture.config(), Vec::new());

    let gate = rt.sequencer.gate();
    assert_eq!(gate.phase(), BootPhase::NotStarted);
    let waiter = tokio::spawn(async move { gate.await_ready(Duration::from_secs(5)).await });

    tokio::time::sleep(Duration::from_millis(20)).await;
    rt.sequencer.boot().await;

    assert_eq!(waiter.await.expect("join"), Ok(()));
}

#[tokio::test]
async fn test_reload_gates_requests_until_ready_again() {
    let fixture = Fixture::new();
    fixture.plugin("slow", "slow");
    let rt = runtime(&fixture.config(), Vec::new());
    register_probe(&rt.catalog, "slow", || Probe {
        init_delay: Duration::from_millis(100),
        ..Probe::default()
    })
    .await;
    rt.sequencer.boot().await;

    let sequencer = Arc::clone(&rt.sequencer);
    let reload = tokio::spawn(async move { sequencer.reload().await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    let gate = rt.sequencer.gate();
    assert!(gate.await_ready(Duration::from_millis(10)).await.is_err());
    gate.await_ready(Duration::from_secs(5)).await.expect("ready again");

    let state = reload.await.expect("join");
    assert_eq!(state.generation, 1);
}
