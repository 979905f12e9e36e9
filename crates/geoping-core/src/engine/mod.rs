//! Refresh engine
//!
//! The RefreshEngine is responsible for:
//! - Loading the inventory from the SnapshotStore
//! - Probing every device through the Prober
//! - Writing the updated inventory back
//! - Publishing the result on the shared SnapshotHandle
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐   load / replace   ┌───────────────┐
//! │ SnapshotStore │◄──────────────────►│ RefreshEngine │
//! └───────────────┘                    └───────────────┘
//!                                              │
//!         ┌────────────────────────────────────┼──────────────────────┐
//!         │                                    │                      │
//!         ▼                                    ▼                      ▼
//! ┌───────────────┐                  ┌────────────────┐      ┌──────────────┐
//! │    Prober     │                  │ SnapshotHandle │      │    Events    │
//! │ (N in flight) │                  │   (publish)    │      │   (notify)   │
//! └───────────────┘                  └────────────────┘      └──────────────┘
//! ```
//!
//! ## Cycle
//!
//! 1. Load the whole inventory
//! 2. Probe every device, at most `probe_concurrency` at a time
//! 3. Once all probes are back, set `status` (and `latency` for the full schema)
//! 4. Replace the whole inventory
//! 5. Publish the new snapshot and sleep for the refresh interval
//!
//! Records are never added, removed or reordered, and no field other than
//! `status` and `latency` changes.
//!
//! ## Failures
//!
//! Store failures skip the cycle. After `max_consecutive_store_failures` of
//! them in a row the engine stops with an error. Any `Err` from the prober is
//! systemic and stops the engine immediately.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{GeopingConfig, RefreshConfig};
use crate::error::{Error, Result};
use crate::model::{Device, SchemaVariant};
use crate::state::SnapshotHandle;
use crate::traits::{ProbeOutcome, Prober, SnapshotStore};

/// Events emitted by the RefreshEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine started
    Started { device_count: usize },

    /// A cycle began probing
    CycleStarted { cycle: u64, device_count: usize },

    /// A cycle wrote and published its snapshot
    CycleCompleted {
        cycle: u64,
        version: u64,
        reachable: usize,
        unreachable: usize,
    },

    /// A cycle was abandoned because of a store failure
    CycleSkipped {
        cycle: u64,
        error: String,
        consecutive_failures: u32,
    },

    /// Engine stopped
    Stopped { reason: String },
}

/// Summary of one completed cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Snapshot version published by this cycle
    pub version: u64,
    pub reachable: usize,
    pub unreachable: usize,
    pub elapsed: Duration,
}

impl CycleReport {
    pub fn device_count(&self) -> usize {
        self.reachable + self.unreachable
    }
}

/// Why a cycle did not complete
enum CycleFailure {
    Store(Error),
    Probe(Error),
}

impl From<CycleFailure> for Error {
    fn from(failure: CycleFailure) -> Self {
        match failure {
            CycleFailure::Store(e) | CycleFailure::Probe(e) => e,
        }
    }
}

/// Periodic probe-and-persist loop
///
/// One engine is the single writer of the inventory's `status` and
/// `latency` fields. Readers never touch the file: they read the
/// [`SnapshotHandle`] the engine publishes to after each successful write.
///
/// ## Lifecycle
///
/// 1. Create with [`RefreshEngine::new()`]
/// 2. Load the initial snapshot with [`RefreshEngine::prime()`]
/// 3. Run with [`RefreshEngine::run()`] until the token is cancelled
///
/// Cancellation interrupts the sleep between cycles. A cycle already in
/// flight runs to completion so the document on disk always reflects a whole
/// cycle.
pub struct RefreshEngine {
    prober: Arc<dyn Prober>,
    store: Arc<dyn SnapshotStore>,
    handle: SnapshotHandle,
    schema: SchemaVariant,
    refresh: RefreshConfig,
    event_tx: mpsc::Sender<EngineEvent>,
    /// Cycles started so far, shared by `run` and `run_cycle`
    cycles: AtomicU64,
}

impl RefreshEngine {
    /// Create a new refresh engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        prober: Arc<dyn Prober>,
        store: Arc<dyn SnapshotStore>,
        handle: SnapshotHandle,
        config: &GeopingConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.refresh.event_channel_capacity);

        let engine = Self {
            prober,
            store,
            handle,
            schema: config.schema,
            refresh: config.refresh.clone(),
            event_tx: tx,
            cycles: AtomicU64::new(0),
        };

        Ok((engine, rx))
    }

    /// Handle readers should be served from
    pub fn snapshot_handle(&self) -> SnapshotHandle {
        self.handle.clone()
    }

    /// Load the inventory once and publish it without probing
    ///
    /// A failure here is a startup failure: nothing has been published yet,
    /// so there is no previous snapshot to fall back on.
    pub async fn prime(&self) -> Result<u64> {
        let devices = self.store.load().await?;
        let count = devices.len();
        let version = self.handle.publish(devices, None);
        info!(
            "Loaded {} devices from {}",
            count,
            self.store.describe()
        );
        Ok(version)
    }

    /// Run a single cycle
    ///
    /// Store and prober failures are both returned as errors; the
    /// failure-tolerance policy lives in [`RefreshEngine::run()`].
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        self.cycle(self.next_cycle()).await.map_err(Error::from)
    }

    /// Number of cycles started so far
    pub fn cycles_started(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    fn next_cycle(&self) -> u64 {
        self.cycles.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Run until `shutdown` is cancelled
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: Systemic probe failure, or too many consecutive store failures
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        self.emit_event(EngineEvent::Started {
            device_count: self.handle.current().len(),
        });
        info!(
            "Refresh engine started: every {}s, {} probes in flight, schema {}",
            self.refresh.interval_secs, self.refresh.probe_concurrency, self.schema
        );

        let mut consecutive_failures: u32 = 0;

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let cycle = self.next_cycle();
            match self.cycle(cycle).await {
                Ok(report) => {
                    if consecutive_failures > 0 {
                        info!("Store recovered after {} failed cycles", consecutive_failures);
                    }
                    consecutive_failures = 0;
                    debug!(
                        "Cycle {} took {:?} for {} devices",
                        cycle,
                        report.elapsed,
                        report.device_count()
                    );
                }
                Err(CycleFailure::Store(e)) => {
                    consecutive_failures += 1;
                    warn!(
                        "Cycle {} skipped ({}/{}): {}",
                        cycle, consecutive_failures, self.refresh.max_consecutive_store_failures, e
                    );
                    self.emit_event(EngineEvent::CycleSkipped {
                        cycle,
                        error: e.to_string(),
                        consecutive_failures,
                    });

                    if consecutive_failures >= self.refresh.max_consecutive_store_failures {
                        error!("Giving up after {} consecutive store failures", consecutive_failures);
                        self.emit_event(EngineEvent::Stopped {
                            reason: format!("Store failed {} times in a row", consecutive_failures),
                        });
                        return Err(Error::store(format!(
                            "{} consecutive cycles failed, last error: {}",
                            consecutive_failures, e
                        )));
                    }
                }
                Err(CycleFailure::Probe(e)) => {
                    error!("Prober {} failed: {}", self.prober.prober_name(), e);
                    self.emit_event(EngineEvent::Stopped {
                        reason: format!("Probe failure: {}", e),
                    });
                    return Err(e);
                }
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.refresh.interval()) => {}
            }
        }

        info!("Shutdown signal received, refresh engine stopped");
        self.emit_event(EngineEvent::Stopped {
            reason: "Shutdown signal".to_string(),
        });
        Ok(())
    }

    async fn cycle(&self, cycle: u64) -> std::result::Result<CycleReport, CycleFailure> {
        let started = Instant::now();

        let mut devices = self.store.load().await.map_err(|e| CycleFailure::Store(as_store_error(e)))?;
        self.emit_event(EngineEvent::CycleStarted {
            cycle,
            device_count: devices.len(),
        });

        let outcomes = self.probe_all(&devices).await.map_err(CycleFailure::Probe)?;

        let mut reachable = 0;
        for (device, outcome) in devices.iter_mut().zip(outcomes) {
            if outcome.reachable {
                reachable += 1;
            }
            device.record_probe(outcome, self.schema);
        }
        let unreachable = devices.len() - reachable;

        self.store
            .replace(&devices)
            .await
            .map_err(|e| CycleFailure::Store(as_store_error(e)))?;

        let version = self.handle.publish(devices, Some(chrono::Utc::now()));
        info!(
            "Cycle {}: {} up, {} down (snapshot v{})",
            cycle, reachable, unreachable, version
        );
        self.emit_event(EngineEvent::CycleCompleted {
            cycle,
            version,
            reachable,
            unreachable,
        });

        Ok(CycleReport {
            version,
            reachable,
            unreachable,
            elapsed: started.elapsed(),
        })
    }

    /// Probe every device, returning outcomes in inventory order
    async fn probe_all(&self, devices: &[Device]) -> Result<Vec<ProbeOutcome>> {
        let semaphore = Arc::new(Semaphore::new(self.refresh.probe_concurrency));
        let mut tasks = JoinSet::new();

        for (index, device) in devices.iter().enumerate() {
            let prober = Arc::clone(&self.prober);
            let semaphore = Arc::clone(&semaphore);
            let address = device.address.clone();

            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| Error::probe(e.to_string()))?;
                let outcome = prober.probe(&address).await?;
                Ok::<_, Error>((index, address, outcome))
            });
        }

        let mut outcomes = vec![ProbeOutcome::unreachable(); devices.len()];
        while let Some(joined) = tasks.join_next().await {
            // Returning early drops the JoinSet, which aborts the remaining probes
            let (index, address, outcome) =
                joined.map_err(|e| Error::probe(format!("Probe task failed: {}", e)))??;
            debug!(
                "{}: reachable={} rtt={:.2}ms",
                address, outcome.reachable, outcome.latency_ms
            );
            outcomes[index] = outcome;
        }

        Ok(outcomes)
    }

    /// Emit an engine event, dropping it with a warning if the channel is full
    fn emit_event(&self, event: EngineEvent) {
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}

fn as_store_error(e: Error) -> Error {
    if e.is_store() { e } else { Error::store(e.to_string()) }
}
