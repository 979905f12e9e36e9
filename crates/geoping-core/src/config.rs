//! Configuration types for the geoping system
//!
//! This module defines all configuration structures used throughout the workspace.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::model::SchemaVariant;

/// Probe timeouts below this are accepted but warned about
pub const WEAK_PROBE_TIMEOUT_MS: u64 = 100;

/// Main geoping configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeopingConfig {
    /// Inventory document settings
    #[serde(default)]
    pub inventory: InventoryConfig,

    /// Prober settings
    #[serde(default)]
    pub probe: ProbeConfig,

    /// Refresh cycle settings
    #[serde(default)]
    pub refresh: RefreshConfig,

    /// Query service settings
    #[serde(default)]
    pub query: QueryConfig,

    /// Record shape of the inventory
    #[serde(default)]
    pub schema: SchemaVariant,
}

impl GeopingConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.inventory.validate()?;
        self.probe.validate()?;
        self.refresh.validate()?;
        self.query.validate()?;
        Ok(())
    }
}

/// Inventory document configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// Path to the inventory JSON array
    #[serde(default = "default_inventory_path")]
    pub path: PathBuf,

    /// Path to the metrics collector's scrape-target file
    #[serde(default = "default_targets_path")]
    pub targets_path: PathBuf,

    /// Keep a `.backup` copy of the previous document on every write
    #[serde(default = "default_keep_backup")]
    pub keep_backup: bool,
}

impl InventoryConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.path.as_os_str().is_empty() {
            return Err(crate::Error::config("Inventory path cannot be empty"));
        }
        Ok(())
    }
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            path: default_inventory_path(),
            targets_path: default_targets_path(),
            keep_backup: default_keep_backup(),
        }
    }
}

/// Prober configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// How long to wait for an echo reply (in milliseconds)
    ///
    /// Values below [`WEAK_PROBE_TIMEOUT_MS`] mark distant devices down even
    /// when they answer. 300 ms is a reasonable WAN default.
    #[serde(default = "default_probe_timeout_ms")]
    pub timeout_ms: u64,

    /// ICMP payload size in bytes
    #[serde(default = "default_payload_size")]
    pub payload_size: usize,
}

impl ProbeConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.timeout_ms == 0 {
            return Err(crate::Error::config("Probe timeout must be > 0"));
        }
        if self.payload_size > 1400 {
            return Err(crate::Error::config(format!(
                "Probe payload of {} bytes is too large (max 1400)",
                self.payload_size
            )));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Whether the timeout is strict enough to misreport healthy devices
    pub fn is_weak_timeout(&self) -> bool {
        self.timeout_ms < WEAK_PROBE_TIMEOUT_MS
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_probe_timeout_ms(),
            payload_size: default_payload_size(),
        }
    }
}

/// Refresh cycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Pause between the end of one cycle and the start of the next (in seconds)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Maximum number of probes in flight within one cycle
    #[serde(default = "default_probe_concurrency")]
    pub probe_concurrency: usize,

    /// Consecutive cycles allowed to fail on the store before giving up
    ///
    /// `1` restores fail-fast behavior.
    #[serde(default = "default_max_consecutive_store_failures")]
    pub max_consecutive_store_failures: u32,

    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped with a warning.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl RefreshConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.interval_secs == 0 {
            return Err(crate::Error::config("Refresh interval must be > 0"));
        }
        if self.probe_concurrency == 0 {
            return Err(crate::Error::config("Probe concurrency must be > 0"));
        }
        if self.max_consecutive_store_failures == 0 {
            return Err(crate::Error::config(
                "Maximum consecutive store failures must be > 0",
            ));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            probe_concurrency: default_probe_concurrency(),
            max_consecutive_store_failures: default_max_consecutive_store_failures(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

/// Query service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Socket address to listen on
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Path of the query endpoint, in addition to `/`
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Identity that bypasses the owner filter
    #[serde(default = "default_admin_identity")]
    pub admin_identity: String,
}

impl QueryConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(crate::Error::config(format!(
                "Listen address '{}' is not a valid socket address",
                self.listen_addr
            )));
        }
        if !self.endpoint.starts_with('/') {
            return Err(crate::Error::config(format!(
                "Query endpoint '{}' must start with '/'",
                self.endpoint
            )));
        }
        if self.admin_identity.is_empty() {
            return Err(crate::Error::config("Admin identity cannot be empty"));
        }
        Ok(())
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            endpoint: default_endpoint(),
            admin_identity: default_admin_identity(),
        }
    }
}

/// Base directory for geoping documents
///
/// Under `sudo` the invoking user's home is used rather than root's, so the
/// daemon (which needs privilege to probe) and the editor (which does not)
/// agree on the same files.
pub fn default_data_dir() -> PathBuf {
    if let Ok(user) = std::env::var("SUDO_USER")
        && !user.is_empty()
    {
        return PathBuf::from("/home").join(user).join("geoping");
    }
    match std::env::var("HOME") {
        Ok(home) if !home.is_empty() => PathBuf::from(home).join("geoping"),
        _ => PathBuf::from("/var/lib/geoping"),
    }
}

fn default_inventory_path() -> PathBuf {
    default_data_dir().join("devices.json")
}

fn default_targets_path() -> PathBuf {
    default_data_dir().join("scrape_targets.json")
}

fn default_keep_backup() -> bool {
    true
}

fn default_probe_timeout_ms() -> u64 {
    300
}

fn default_payload_size() -> usize {
    56
}

fn default_interval_secs() -> u64 {
    30
}

fn default_probe_concurrency() -> usize {
    32
}

fn default_max_consecutive_store_failures() -> u32 {
    3
}

fn default_event_channel_capacity() -> usize {
    256
}

fn default_listen_addr() -> String {
    "127.0.0.1:3333".to_string()
}

fn default_endpoint() -> String {
    "/mikromap".to_string()
}

fn default_admin_identity() -> String {
    "admin".to_string()
}
