// # File Snapshot Store
//
// File-based implementation of SnapshotStore.
//
// ## Purpose
//
// Persists the inventory as a JSON array that the editor, the daemon and
// operators all read and write by hand.
//
// ## Consistency
//
// - Atomic writes: the new document is written to a temporary sibling and
//   renamed over the old one, so readers never observe a torn array
// - Backup: the previous document is kept as `<name>.backup` (optional)
// - Strict loads: a missing or malformed document is a store error; the
//   caller decides whether that is fatal
//
// ## File Format
//
// ```json
// [
//     {
//         "ip": "10.0.0.1",
//         "lat": 48.85,
//         "lon": 2.35,
//         "adresse": "1 Rue de Rivoli 75001 Paris",
//         "username": "alice",
//         "statut": 1,
//         "rtt": 4.2,
//         "visible": true
//     }
// ]
// ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::Error;
use crate::model::Device;
use crate::state::atomic;
use crate::traits::SnapshotStore;

/// File-based inventory store
///
/// # Example
///
/// ```rust,no_run
/// use geoping_core::state::FileSnapshotStore;
/// use geoping_core::traits::SnapshotStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileSnapshotStore::new("/var/lib/geoping/devices.json");
///
///     let mut devices = store.load().await?;
///     for device in &mut devices {
///         device.status = 0;
///     }
///     store.replace(&devices).await?;
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileSnapshotStore {
    path: PathBuf,
    keep_backup: bool,
    /// Serializes writers inside this process
    write_lock: Mutex<()>,
}

impl FileSnapshotStore {
    /// Create a store for the document at `path`, keeping a backup
    ///
    /// Nothing is read until the first [`SnapshotStore::load`].
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self::with_backup(path, true)
    }

    /// Create a store choosing whether to keep `<name>.backup`
    pub fn with_backup<P: AsRef<Path>>(path: P, keep_backup: bool) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            keep_backup,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the copy of the previous document
    pub fn backup_path(&self) -> PathBuf {
        atomic::backup_path(&self.path)
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn load(&self) -> Result<Vec<Device>, Error> {
        let devices: Vec<Device> = atomic::read_json(&self.path).await?;
        tracing::trace!(
            "Loaded {} device(s) from {}",
            devices.len(),
            self.path.display()
        );
        Ok(devices)
    }

    async fn replace(&self, devices: &[Device]) -> Result<(), Error> {
        let _guard = self.write_lock.lock().await;
        atomic::write_json_atomic(&self.path, devices, self.keep_backup).await
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}
