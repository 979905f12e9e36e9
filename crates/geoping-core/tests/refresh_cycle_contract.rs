//! Contract Test: Refresh Cycle
//!
//! Constraints verified:
//! - One cycle sets `status` and `latency` from the prober and nothing else
//! - Records are neither added, removed nor reordered
//! - The written document and the published snapshot agree
//! - The owner filter applies to the published snapshot

mod common;

use common::*;
use geoping_core::state::FileSnapshotStore;
use geoping_core::{
    Device, RefreshEngine, SchemaVariant, SnapshotHandle, SnapshotStore, filter_by_identity,
};
use std::sync::Arc;

#[tokio::test]
async fn cycle_records_status_and_latency() {
    let store = CountingStore::new(alice_and_bob());
    let prober = ScriptedProber::new().up("10.0.0.1", 5.0).down("10.0.0.2");
    let handle = SnapshotHandle::new();

    let (engine, _events) = RefreshEngine::new(
        Arc::new(prober),
        Arc::new(store.clone()),
        handle.clone(),
        &fast_config(30),
    )
    .expect("engine construction succeeds");

    engine.run_cycle().await.expect("cycle succeeds");

    let written = store.devices().await;
    assert_eq!(written.len(), 2);
    assert_eq!(written[0].address, "10.0.0.1");
    assert_eq!(written[0].status, 1);
    assert_eq!(written[0].latency, Some(5.0));
    assert_eq!(written[1].address, "10.0.0.2");
    assert_eq!(written[1].status, 0);
    assert_eq!(written[1].latency, Some(0.0));

    let snapshot = handle.current();
    assert_eq!(snapshot.devices, written);
    assert!(snapshot.refreshed_at.is_some());

    let alice = filter_by_identity(&snapshot.devices, Some("alice"), "admin");
    assert_eq!(alice.len(), 1);
    assert_eq!(alice[0].address, "10.0.0.1");

    let admin = filter_by_identity(&snapshot.devices, Some("admin"), "admin");
    assert_eq!(admin, written);
}

#[tokio::test]
async fn cycle_preserves_every_other_field() {
    let mut devices = alice_and_bob();
    devices[0]
        .extra
        .insert("model".to_string(), serde_json::json!("hAP ac2"));
    devices[1].visible = Some(false);
    let before = devices.clone();

    let store = CountingStore::new(devices);
    let prober = ScriptedProber::new().up("10.0.0.1", 12.5).up("10.0.0.2", 30.0);

    let (engine, _events) = RefreshEngine::new(
        Arc::new(prober),
        Arc::new(store.clone()),
        SnapshotHandle::new(),
        &fast_config(30),
    )
    .unwrap();
    engine.run_cycle().await.unwrap();

    let after = store.devices().await;
    for (old, new) in before.iter().zip(after.iter()) {
        let mut expected = old.clone();
        expected.status = new.status;
        expected.latency = new.latency;
        assert_eq!(&expected, new, "only status and latency may change");
    }
    assert_eq!(after[0].extra["model"], "hAP ac2");
    assert_eq!(after[1].visible, Some(false));
}

#[tokio::test]
async fn basic_schema_never_writes_latency() {
    let devices = vec![Device::new("10.0.0.1", 0.0, 0.0, "Paris")];
    let store = CountingStore::new(devices);
    let prober = ScriptedProber::new().up("10.0.0.1", 5.0);

    let mut config = fast_config(30);
    config.schema = SchemaVariant::Basic;

    let (engine, _events) = RefreshEngine::new(
        Arc::new(prober),
        Arc::new(store.clone()),
        SnapshotHandle::new(),
        &config,
    )
    .unwrap();
    engine.run_cycle().await.unwrap();

    let written = store.devices().await;
    assert_eq!(written[0].status, 1);
    assert_eq!(written[0].latency, None);
}

#[tokio::test]
async fn empty_inventory_is_a_valid_cycle() {
    let store = CountingStore::new(Vec::new());
    let prober = ScriptedProber::new();
    let probes = ScriptedProber::sharing_counters_with(&prober);

    let (engine, _events) = RefreshEngine::new(
        Arc::new(prober),
        Arc::new(store.clone()),
        SnapshotHandle::new(),
        &fast_config(30),
    )
    .unwrap();

    let report = engine.run_cycle().await.unwrap();
    assert_eq!(report.device_count(), 0);
    assert_eq!(probes.probe_count(), 0);
    assert_eq!(store.replace_count(), 1);
}

#[tokio::test]
async fn file_store_cycle_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("devices.json");
    let seed = FileSnapshotStore::new(&path);
    seed.replace(&alice_and_bob()).await.unwrap();

    let prober = ScriptedProber::new().up("10.0.0.1", 5.0).down("10.0.0.2");
    let handle = SnapshotHandle::new();
    let (engine, _events) = RefreshEngine::new(
        Arc::new(prober),
        Arc::new(FileSnapshotStore::new(&path)),
        handle.clone(),
        &fast_config(30),
    )
    .unwrap();

    engine.prime().await.unwrap();
    engine.run_cycle().await.unwrap();

    let on_disk = FileSnapshotStore::new(&path).load().await.unwrap();
    assert_eq!(on_disk, handle.current().devices);
    assert_eq!(on_disk[0].status, 1);

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\"statut\": 1"));
    assert!(raw.contains("    {"), "document is indented with four spaces");
}
