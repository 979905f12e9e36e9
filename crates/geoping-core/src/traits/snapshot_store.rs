// # Snapshot Store Trait
//
// Defines the interface for the persisted inventory document.
//
// ## Purpose
//
// The inventory is one flat JSON array. The store only knows two operations:
// read the whole array, or replace the whole array. There is no record-level
// update and no locking; the refresh engine is the only writer during normal
// operation and the editor runs between cycles.
//
// ## Implementations
//
// - File-based: `state::FileSnapshotStore` (atomic write-then-rename)
// - In-memory: `state::MemorySnapshotStore` (tests, embedding)

use async_trait::async_trait;

use crate::model::Device;

/// Trait for inventory snapshot stores
///
/// # Consistency
///
/// `replace` must be atomic with respect to `load`: a concurrent reader sees
/// either the previous document or the new one, never a mix. Readers may still
/// observe a stale document; the store makes no freshness promise.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Read and parse the full inventory
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<Device>)`: devices in document order
    /// - `Err(Error::Store)`: missing, unreadable or malformed document
    async fn load(&self) -> Result<Vec<Device>, crate::Error>;

    /// Replace the full inventory
    ///
    /// # Parameters
    ///
    /// - `devices`: the new document contents, in order
    ///
    /// # Returns
    ///
    /// - `Ok(())`: the new document is durable and visible to readers
    /// - `Err(Error::Store)`: nothing was replaced
    async fn replace(&self, devices: &[Device]) -> Result<(), crate::Error>;

    /// Human-readable location, for logs
    fn describe(&self) -> String;
}
