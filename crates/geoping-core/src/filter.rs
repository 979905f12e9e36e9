//! Owner filter applied to query results
//!
//! Callers identify themselves with a free-form identity. The administrative
//! identity sees every device; anyone else sees the devices whose owner equals
//! their identity ignoring case. This is a display filter, not access control.

use crate::model::Device;

/// Case-insensitive identity comparison
///
/// Uses full Unicode lowercasing so `"ÉLODIE"` matches `"élodie"`.
pub fn identity_matches(owner: &str, identity: &str) -> bool {
    owner == identity || owner.to_lowercase() == identity.to_lowercase()
}

/// Select the devices visible to `identity`
///
/// - `None`, or an identity equal to `admin_identity`: every device
/// - `Some(u)`: devices whose owner matches `u`; a missing owner compares as
///   the empty string, so `Some("")` selects unowned devices
///
/// Relative order is preserved.
pub fn filter_by_identity(devices: &[Device], identity: Option<&str>, admin_identity: &str) -> Vec<Device> {
    match identity {
        None => devices.to_vec(),
        Some(id) if id == admin_identity => devices.to_vec(),
        Some(id) => devices
            .iter()
            .filter(|d| identity_matches(d.owner_or_empty(), id))
            .cloned()
            .collect(),
    }
}
