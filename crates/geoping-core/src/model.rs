//! Inventory data model
//!
//! The inventory document is a JSON array of [`Device`] records. Field names
//! on the wire follow the canonical dashboard schema:
//!
//! ```json
//! [
//!     {
//!         "ip": "10.0.0.1",
//!         "lat": 48.85,
//!         "lon": 2.35,
//!         "adresse": "1 Rue de Rivoli 75001 Paris",
//!         "username": "alice",
//!         "statut": 1,
//!         "rtt": 4.2,
//!         "visible": true
//!     }
//! ]
//! ```
//!
//! Older documents omit `username`, `rtt` and `visible`; those fields are
//! optional here and are written back only when they were present. Unknown
//! fields are carried through untouched.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::traits::ProbeOutcome;

/// Status code written for a device that answered its last probe
pub const STATUS_UP: i32 = 1;

/// Status code written for a device that did not answer its last probe
pub const STATUS_DOWN: i32 = 0;

/// One monitored network endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Network address, unique within the inventory
    #[serde(rename = "ip")]
    pub address: String,

    #[serde(rename = "lat", default)]
    pub latitude: f64,

    #[serde(rename = "lon", default)]
    pub longitude: f64,

    /// Human-readable location
    #[serde(rename = "adresse", default)]
    pub label: String,

    /// Identity the query filter matches against
    #[serde(rename = "username", default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// [`STATUS_UP`] or [`STATUS_DOWN`], written only by the refresh engine
    #[serde(rename = "statut", default)]
    pub status: i32,

    /// Last round-trip time in milliseconds, `0` on timeout
    #[serde(rename = "rtt", default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<f64>,

    /// Display flag owned by the editor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,

    /// Fields this version does not know about
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Device {
    /// Create a device in the unreachable state
    pub fn new(address: impl Into<String>, latitude: f64, longitude: f64, label: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            latitude,
            longitude,
            label: label.into(),
            owner: None,
            status: STATUS_DOWN,
            latency: None,
            visible: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Set the owner identity
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Set the display flag
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    /// Set the latency field
    pub fn with_latency(mut self, latency_ms: f64) -> Self {
        self.latency = Some(latency_ms);
        self
    }

    /// Whether the last probe got a reply
    pub fn is_up(&self) -> bool {
        self.status == STATUS_UP
    }

    /// Owner as a plain string, empty when absent
    pub fn owner_or_empty(&self) -> &str {
        self.owner.as_deref().unwrap_or("")
    }

    /// Record a probe result
    ///
    /// Only `status` and, when the schema carries it, `latency` change.
    pub fn record_probe(&mut self, outcome: ProbeOutcome, schema: SchemaVariant) {
        self.status = if outcome.reachable { STATUS_UP } else { STATUS_DOWN };
        if schema.records_latency() {
            self.latency = Some(outcome.latency_ms);
        }
    }
}

/// Point-in-time view of the inventory shared with readers
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    /// Monotonic publication counter, `0` before anything was published
    pub version: u64,

    /// When the last completed refresh cycle wrote this snapshot
    pub refreshed_at: Option<chrono::DateTime<chrono::Utc>>,

    /// Devices in inventory order
    pub devices: Vec<Device>,
}

impl Snapshot {
    /// Snapshot with no devices and version `0`
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Number of devices whose last probe got a reply
    pub fn reachable_count(&self) -> usize {
        self.devices.iter().filter(|d| d.is_up()).count()
    }
}

/// Shape of the inventory records
///
/// Deployments accumulated three record shapes over time. The variant decides
/// which optional fields the engine and the editor write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVariant {
    /// `ip`, `lat`, `lon`, `adresse`, `statut`
    Basic,
    /// Basic plus `username`
    Owned,
    /// Owned plus `rtt` and `visible`
    #[default]
    Full,
}

impl SchemaVariant {
    /// Whether the engine writes `rtt` after each probe
    pub fn records_latency(self) -> bool {
        matches!(self, Self::Full)
    }

    /// Whether new records carry `username`
    pub fn has_owner(self) -> bool {
        matches!(self, Self::Owned | Self::Full)
    }

    /// Whether new records carry `visible`
    pub fn has_visibility(self) -> bool {
        matches!(self, Self::Full)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Owned => "owned",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaVariant {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "owned" => Ok(Self::Owned),
            "full" => Ok(Self::Full),
            other => Err(crate::Error::config(format!(
                "unknown schema variant '{}', expected basic, owned or full",
                other
            ))),
        }
    }
}
