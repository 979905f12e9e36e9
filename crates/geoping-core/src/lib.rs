// # geoping-core
//
// Core library for the device reachability map.
//
// ## Architecture Overview
//
// This library provides the core functionality of the probe-and-serve loop:
// - **Prober**: Trait for one bounded reachability check per device
// - **SnapshotStore**: Trait for whole-document inventory persistence
// - **Geocoder**: Trait for postal address lookup used by the editor
// - **RefreshEngine**: Periodic load → probe → replace → publish loop
// - **SnapshotHandle**: Shared, atomically swapped snapshot readers are served from
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from ICMP, HTTP and geocoding
// 2. **Single Writer**: Only the engine writes `status` and `latency`
// 3. **Whole Documents**: The inventory is always read and replaced as one array
// 4. **Library-First**: All core functionality can be used as a library

pub mod traits;
pub mod engine;
pub mod config;
pub mod error;
pub mod model;
pub mod filter;
pub mod inventory;
pub mod targets;
pub mod state;

// Re-export core types for convenience
pub use traits::{Prober, ProbeOutcome, SnapshotStore, Geocoder, GeocodeResult};
pub use engine::{RefreshEngine, EngineEvent, CycleReport};
pub use config::{GeopingConfig, InventoryConfig, ProbeConfig, RefreshConfig, QueryConfig};
pub use error::{Error, Result};
pub use model::{Device, Snapshot, SchemaVariant, STATUS_UP, STATUS_DOWN};
pub use filter::filter_by_identity;
pub use inventory::InventoryEditor;
pub use targets::ScrapeTargetFile;
pub use state::{FileSnapshotStore, MemorySnapshotStore, SnapshotHandle};
