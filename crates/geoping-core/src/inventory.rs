//! Inventory editing
//!
//! Add and remove devices while keeping the scrape-target file in step. These
//! operations run from the editor between refresh cycles; the refresh engine
//! never adds, removes or reorders devices.

use std::net::IpAddr;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::{Device, SchemaVariant};
use crate::targets::ScrapeTargetFile;
use crate::traits::{GeocodeResult, SnapshotStore};

/// Device-type prefixes accepted in front of an address (`router:10.0.0.1`)
const DEVICE_TYPE_PREFIXES: &[&str] = &["router", "routeur", "switch", "ap", "firewall", "host"];

/// Normalize an operator-typed address
///
/// Trims whitespace, strips one known device-type prefix and requires a valid
/// IP literal. The canonical textual form of the IP is returned.
pub fn normalize_address(input: &str) -> Result<String> {
    let mut candidate = input.trim();

    if let Some((prefix, rest)) = candidate.split_once(':') {
        let prefix = prefix.trim().to_lowercase();
        if DEVICE_TYPE_PREFIXES.contains(&prefix.as_str()) {
            candidate = rest.trim();
        }
    }

    let ip: IpAddr = candidate
        .parse()
        .map_err(|_| Error::invalid_input(format!("'{}' is not an IP address", input.trim())))?;
    Ok(ip.to_string())
}

/// Build a new record for `schema`, initially unreachable
pub fn new_record(
    address: String,
    location: GeocodeResult,
    owner: Option<String>,
    visible: bool,
    schema: SchemaVariant,
) -> Device {
    let mut device = Device::new(address, location.latitude, location.longitude, location.label);
    if schema.has_owner() {
        device.owner = Some(owner.unwrap_or_default());
    }
    if schema.records_latency() {
        device.latency = Some(0.0);
    }
    if schema.has_visibility() {
        device.visible = Some(visible);
    }
    device
}

/// Append `device`, rejecting an address already present
pub fn add_device(devices: &mut Vec<Device>, device: Device) -> Result<()> {
    if devices.iter().any(|d| d.address == device.address) {
        return Err(Error::duplicate(format!(
            "{} is already in the inventory",
            device.address
        )));
    }
    devices.push(device);
    Ok(())
}

/// Remove the device with `address`
pub fn remove_device(devices: &mut Vec<Device>, address: &str) -> Result<Device> {
    let index = devices
        .iter()
        .position(|d| d.address == address)
        .ok_or_else(|| Error::not_found(format!("{} is not in the inventory", address)))?;
    Ok(devices.remove(index))
}

/// Inventory editor writing both the inventory and the scrape targets
pub struct InventoryEditor {
    store: Arc<dyn SnapshotStore>,
    targets: ScrapeTargetFile,
    schema: SchemaVariant,
}

impl InventoryEditor {
    pub fn new(store: Arc<dyn SnapshotStore>, targets: ScrapeTargetFile, schema: SchemaVariant) -> Self {
        Self {
            store,
            targets,
            schema,
        }
    }

    pub fn schema(&self) -> SchemaVariant {
        self.schema
    }

    /// Current inventory
    pub async fn list(&self) -> Result<Vec<Device>> {
        self.store.load().await
    }

    /// Add a device and register it as a scrape target
    pub async fn add(
        &self,
        address: &str,
        location: GeocodeResult,
        owner: Option<String>,
        visible: bool,
    ) -> Result<Device> {
        let address = normalize_address(address)?;
        let mut devices = self.store.load().await?;

        let device = new_record(address.clone(), location, owner, visible, self.schema);
        add_device(&mut devices, device.clone())?;
        self.store.replace(&devices).await?;

        if !self.targets.add(&address).await? {
            tracing::debug!("{} was already a scrape target", address);
        }

        tracing::info!("Added {} ({})", address, device.label);
        Ok(device)
    }

    /// Remove a device and its scrape target
    pub async fn remove(&self, address: &str) -> Result<Device> {
        let address = normalize_address(address)?;
        let mut devices = self.store.load().await?;

        let removed = remove_device(&mut devices, &address)?;
        self.store.replace(&devices).await?;

        if self.targets.remove(&address).await? == 0 {
            tracing::debug!("{} was not a scrape target", address);
        }

        tracing::info!("Removed {}", address);
        Ok(removed)
    }
}
