//! Contract Test: Shutdown Determinism
//!
//! This test verifies that shutdown is deterministic and complete.
//!
//! Constraints verified:
//! - Cancellation interrupts the sleep between cycles
//! - A cycle in flight is allowed to finish and write its document
//! - A token cancelled before start means no cycle runs at all
//! - A Stopped event is emitted on the way out
//!
//! If this test fails, someone has added:
//! - Sleeps that ignore cancellation
//! - Cancellation that tears a cycle between probing and writing
//! - Detached tasks outliving the engine

mod common;

use common::*;
use geoping_core::{EngineEvent, RefreshEngine, SnapshotHandle};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn cancellation_interrupts_sleep() {
    let store = CountingStore::new(alice_and_bob());
    let (engine, mut events) = RefreshEngine::new(
        Arc::new(ScriptedProber::new()),
        Arc::new(store.clone()),
        SnapshotHandle::new(),
        &fast_config(3600),
    )
    .expect("engine construction succeeds");

    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    let engine_handle = tokio::spawn(async move { engine.run(token).await });

    // Wait for the first cycle, after which the engine sleeps for an hour
    loop {
        match events.recv().await {
            Some(EngineEvent::CycleCompleted { .. }) => break,
            Some(_) => continue,
            None => panic!("engine stopped before completing a cycle"),
        }
    }

    shutdown.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), engine_handle).await;
    assert!(result.is_ok(), "Engine should terminate within 5 seconds");
    let engine_result = result.unwrap().unwrap();
    assert!(
        engine_result.is_ok(),
        "Engine should shut down successfully: {:?}",
        engine_result
    );
    assert_eq!(store.replace_count(), 1);

    let mut stopped = false;
    while let Some(event) = events.recv().await {
        if let EngineEvent::Stopped { reason } = event {
            assert_eq!(reason, "Shutdown signal");
            stopped = true;
        }
    }
    assert!(stopped, "Stopped event should be the last thing the engine says");
}

#[tokio::test]
async fn in_flight_cycle_finishes() {
    let store = CountingStore::new(alice_and_bob());
    let prober = ScriptedProber::new()
        .up("10.0.0.1", 5.0)
        .with_delay(Duration::from_millis(200));
    let probes = ScriptedProber::sharing_counters_with(&prober);

    let (engine, mut events) = RefreshEngine::new(
        Arc::new(prober),
        Arc::new(store.clone()),
        SnapshotHandle::new(),
        &fast_config(3600),
    )
    .unwrap();

    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    let engine_handle = tokio::spawn(async move { engine.run(token).await });

    loop {
        match events.recv().await {
            Some(EngineEvent::CycleStarted { .. }) => break,
            Some(_) => continue,
            None => panic!("engine stopped before starting a cycle"),
        }
    }

    // Probes are sleeping now
    shutdown.cancel();

    tokio::time::timeout(Duration::from_secs(5), engine_handle)
        .await
        .expect("engine terminates")
        .unwrap()
        .expect("clean shutdown");

    assert_eq!(probes.probe_count(), 2);
    assert_eq!(store.replace_count(), 1, "the interrupted cycle still writes");
    let written = store.devices().await;
    assert_eq!(written[0].status, 1);
}

#[tokio::test]
async fn cancelled_before_start_runs_nothing() {
    let store = CountingStore::new(alice_and_bob());
    let (engine, _events) = RefreshEngine::new(
        Arc::new(ScriptedProber::new()),
        Arc::new(store.clone()),
        SnapshotHandle::new(),
        &fast_config(30),
    )
    .unwrap();

    let shutdown = CancellationToken::new();
    shutdown.cancel();

    engine.run(shutdown).await.unwrap();
    assert_eq!(store.load_count(), 0);
    assert_eq!(store.replace_count(), 0);
}
