// # Memory Snapshot Store
//
// In-memory implementation of SnapshotStore.
//
// Nothing survives a restart. Useful for tests and for embedding the engine
// where the inventory comes from somewhere other than a file.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::model::Device;
use crate::traits::SnapshotStore;

/// In-memory inventory store
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    inner: Arc<RwLock<Vec<Device>>>,
}

impl MemorySnapshotStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with `devices`
    pub fn with_devices(devices: Vec<Device>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(devices)),
        }
    }

    /// Current contents
    pub async fn devices(&self) -> Vec<Device> {
        self.inner.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self) -> Result<Vec<Device>, Error> {
        Ok(self.inner.read().await.clone())
    }

    async fn replace(&self, devices: &[Device]) -> Result<(), Error> {
        *self.inner.write().await = devices.to_vec();
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
