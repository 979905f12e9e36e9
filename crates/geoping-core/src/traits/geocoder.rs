// # Geocoder Trait
//
// Resolves a postal address to map coordinates for new inventory records.
//
// ## Implementations
//
// - French national address base: `geoping-geocode` crate
//
// Geocoders are single-shot HTTP lookups used by the editor only. They never
// touch the inventory and never retry.

use async_trait::async_trait;

/// Coordinates and normalized label for a postal address
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeResult {
    pub latitude: f64,
    pub longitude: f64,
    /// Address as the geocoding service spells it
    pub label: String,
}

/// Trait for geocoding backends
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Look up the best match for `address`
    ///
    /// # Returns
    ///
    /// - `Ok(GeocodeResult)`: the first match
    /// - `Err(Error::Geocode)`: transport failure, non-success status, or no match
    async fn geocode(&self, address: &str) -> Result<GeocodeResult, crate::Error>;

    /// Name used in logs
    fn geocoder_name(&self) -> &'static str;
}
