//! Core traits for the geoping system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`Prober`]: One bounded reachability check per device
//! - [`SnapshotStore`]: Whole-document inventory persistence
//! - [`Geocoder`]: Postal address lookup for the editor

pub mod prober;
pub mod snapshot_store;
pub mod geocoder;

pub use prober::{Prober, ProbeOutcome};
pub use snapshot_store::SnapshotStore;
pub use geocoder::{Geocoder, GeocodeResult};
