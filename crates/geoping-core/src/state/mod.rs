// # State
//
// Persistence of the inventory document and the shared in-memory snapshot
// readers are served from.

pub mod atomic;
pub mod file;
pub mod handle;
pub mod memory;

pub use file::FileSnapshotStore;
pub use handle::SnapshotHandle;
pub use memory::MemorySnapshotStore;
