// # Shared Snapshot Handle
//
// The single in-memory copy of the inventory that readers are served from.
//
// The refresh engine publishes a new immutable `Arc<Snapshot>` after every
// successful write; the query service clones the current `Arc` per request.
// Publication is an atomic pointer swap through a `watch` channel, so a reader
// holds either the previous snapshot or the new one and never blocks the
// writer. The inventory file stays the persisted mirror.

use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::Stream;
use tokio_stream::wrappers::WatchStream;

use crate::model::{Device, Snapshot};

/// Cloneable handle to the most recently published snapshot
#[derive(Debug, Clone)]
pub struct SnapshotHandle {
    tx: Arc<watch::Sender<Arc<Snapshot>>>,
}

impl SnapshotHandle {
    /// Create a handle holding an empty, version `0` snapshot
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(Snapshot::empty()));
        Self { tx: Arc::new(tx) }
    }

    /// The current snapshot
    pub fn current(&self) -> Arc<Snapshot> {
        self.tx.borrow().clone()
    }

    /// Version of the current snapshot
    pub fn version(&self) -> u64 {
        self.tx.borrow().version
    }

    /// Swap in a new snapshot and return its version
    pub fn publish(
        &self,
        devices: Vec<Device>,
        refreshed_at: Option<chrono::DateTime<chrono::Utc>>,
    ) -> u64 {
        let mut version = 0;
        self.tx.send_modify(|current| {
            version = current.version + 1;
            *current = Arc::new(Snapshot {
                version,
                refreshed_at,
                devices,
            });
        });
        version
    }

    /// Receiver notified on every publication
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.tx.subscribe()
    }

    /// Stream of snapshots
    ///
    /// Yields the current snapshot first, then the latest one after each
    /// publication. Intermediate snapshots may be skipped by slow consumers.
    pub fn watch(&self) -> Pin<Box<dyn Stream<Item = Arc<Snapshot>> + Send + 'static>> {
        Box::pin(WatchStream::new(self.tx.subscribe()))
    }
}

impl Default for SnapshotHandle {
    fn default() -> Self {
        Self::new()
    }
}
