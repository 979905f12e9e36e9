//! Test doubles and common utilities for contract tests
//!
//! This module provides minimal test doubles for the engine's collaborators:
//! a prober whose answers are scripted per address, and stores that count
//! calls or fail on demand.

#![allow(dead_code)]

use async_trait::async_trait;
use geoping_core::error::{Error, Result};
use geoping_core::model::Device;
use geoping_core::state::MemorySnapshotStore;
use geoping_core::traits::{ProbeOutcome, Prober, SnapshotStore};
use geoping_core::GeopingConfig;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Scripted answer for one address
#[derive(Debug, Clone, Copy)]
pub enum Script {
    Up(f64),
    Down,
    Fail,
}

/// A prober answering from a per-address script
///
/// Unknown addresses are down.
pub struct ScriptedProber {
    script: HashMap<String, Script>,
    delay: Duration,
    probe_count: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl ScriptedProber {
    pub fn new() -> Self {
        Self {
            script: HashMap::new(),
            delay: Duration::ZERO,
            probe_count: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn up(mut self, address: &str, latency_ms: f64) -> Self {
        self.script.insert(address.to_string(), Script::Up(latency_ms));
        self
    }

    pub fn down(mut self, address: &str) -> Self {
        self.script.insert(address.to_string(), Script::Down);
        self
    }

    pub fn failing(mut self, address: &str) -> Self {
        self.script.insert(address.to_string(), Script::Fail);
        self
    }

    /// Sleep this long inside every probe
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Create a new ScriptedProber that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            script: other.script.clone(),
            delay: other.delay,
            probe_count: Arc::clone(&other.probe_count),
            in_flight: Arc::clone(&other.in_flight),
            max_in_flight: Arc::clone(&other.max_in_flight),
        }
    }

    pub fn probe_count(&self) -> usize {
        self.probe_count.load(Ordering::SeqCst)
    }

    /// Highest number of probes observed running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, address: &str) -> Result<ProbeOutcome> {
        self.probe_count.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.script.get(address).copied().unwrap_or(Script::Down) {
            Script::Up(ms) => Ok(ProbeOutcome::reachable(ms)),
            Script::Down => Ok(ProbeOutcome::unreachable()),
            Script::Fail => Err(Error::probe_setup("socket closed")),
        }
    }

    fn prober_name(&self) -> &'static str {
        "scripted"
    }
}

/// A memory store that counts calls and can be told to fail
#[derive(Clone)]
pub struct CountingStore {
    inner: MemorySnapshotStore,
    load_count: Arc<AtomicUsize>,
    replace_count: Arc<AtomicUsize>,
    fail_loads: Arc<AtomicBool>,
    fail_replaces: Arc<AtomicBool>,
}

impl CountingStore {
    pub fn new(devices: Vec<Device>) -> Self {
        Self {
            inner: MemorySnapshotStore::with_devices(devices),
            load_count: Arc::new(AtomicUsize::new(0)),
            replace_count: Arc::new(AtomicUsize::new(0)),
            fail_loads: Arc::new(AtomicBool::new(false)),
            fail_replaces: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn load_count(&self) -> usize {
        self.load_count.load(Ordering::SeqCst)
    }

    pub fn replace_count(&self) -> usize {
        self.replace_count.load(Ordering::SeqCst)
    }

    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_replaces(&self, fail: bool) {
        self.fail_replaces.store(fail, Ordering::SeqCst);
    }

    pub async fn devices(&self) -> Vec<Device> {
        self.inner.devices().await
    }
}

#[async_trait]
impl SnapshotStore for CountingStore {
    async fn load(&self) -> Result<Vec<Device>> {
        self.load_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(Error::store("document is malformed"));
        }
        self.inner.load().await
    }

    async fn replace(&self, devices: &[Device]) -> Result<()> {
        self.replace_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_replaces.load(Ordering::SeqCst) {
            return Err(Error::store("disk full"));
        }
        self.inner.replace(devices).await
    }

    fn describe(&self) -> String {
        "counting".to_string()
    }
}

/// The two-device inventory used across contract tests
pub fn alice_and_bob() -> Vec<Device> {
    vec![
        Device::new("10.0.0.1", 48.85, 2.35, "Paris")
            .with_owner("alice")
            .with_latency(0.0)
            .with_visible(true),
        Device::new("10.0.0.2", 45.76, 4.83, "Lyon")
            .with_owner("bob")
            .with_latency(0.0)
            .with_visible(true),
    ]
}

/// Configuration with a short interval suitable for tests
pub fn fast_config(interval_secs: u64) -> GeopingConfig {
    let mut config = GeopingConfig::new();
    config.refresh.interval_secs = interval_secs;
    config
}
