// # Address Geocoding
//
// Resolves a postal address to coordinates through the French national
// address base (BAN).
//
// ## API Reference
//
// - Search: GET `/search/?q=<address>&limit=1`
// - Response: GeoJSON `FeatureCollection`; `geometry.coordinates` is
//   `[longitude, latitude]`, `properties.label` the normalized address
//
// The service is free and allows about 50 requests per second per IP. It only
// knows French addresses; anything else comes back with no features.
//
// One request per call. No retries and no caching.

use async_trait::async_trait;
use geoping_core::traits::{GeocodeResult, Geocoder};
use geoping_core::{Error, Result};
use serde::Deserialize;
use std::time::Duration;

/// BAN API base URL
pub const BAN_API_BASE: &str = "https://api-adresse.data.gouv.fr";

/// Default HTTP timeout for lookups
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Geometry,
    #[serde(default)]
    properties: Properties,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    coordinates: Vec<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct Properties {
    #[serde(default)]
    label: String,
}

/// Extract the first match from a BAN search response
pub fn parse_response(body: &str, query: &str) -> Result<GeocodeResult> {
    let collection: FeatureCollection = serde_json::from_str(body)
        .map_err(|e| Error::geocode(format!("Malformed response: {}", e)))?;

    let feature = collection
        .features
        .into_iter()
        .next()
        .ok_or_else(|| Error::geocode(format!("No match for '{}'", query)))?;

    let [longitude, latitude] = feature.geometry.coordinates[..] else {
        return Err(Error::geocode(format!(
            "Expected [lon, lat], got {} coordinates",
            feature.geometry.coordinates.len()
        )));
    };

    let label = if feature.properties.label.is_empty() {
        query.to_string()
    } else {
        feature.properties.label
    };

    Ok(GeocodeResult {
        latitude,
        longitude,
        label,
    })
}

/// Geocoder backed by the BAN search API
pub struct BanGeocoder {
    base_url: String,
    client: reqwest::Client,
}

impl BanGeocoder {
    /// Create a geocoder against the public API
    pub fn new() -> Result<Self> {
        Self::with_base_url(BAN_API_BASE)
    }

    /// Create a geocoder against another deployment of the same API
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::geocode(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl Geocoder for BanGeocoder {
    async fn geocode(&self, address: &str) -> Result<GeocodeResult> {
        let address = address.trim();
        if address.is_empty() {
            return Err(Error::invalid_input("Postal address cannot be empty"));
        }

        let url = format!("{}/search/", self.base_url);
        tracing::debug!("Geocoding '{}' via {}", address, url);

        let response = self
            .client
            .get(&url)
            .query(&[("q", address), ("limit", "1")])
            .send()
            .await
            .map_err(|e| Error::geocode(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return match status.as_u16() {
                400 => Err(Error::geocode(format!("Address rejected by the service: '{}'", address))),
                429 => Err(Error::geocode("Rate limit exceeded. Please retry later.")),
                _ => Err(Error::geocode(format!("Lookup failed with status {}", status))),
            };
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::geocode(format!("Failed to read response: {}", e)))?;

        let result = parse_response(&body, address)?;
        tracing::info!(
            "Geocoded '{}' to {} ({}, {})",
            address,
            result.label,
            result.latitude,
            result.longitude
        );
        Ok(result)
    }

    fn geocoder_name(&self) -> &'static str {
        "ban"
    }
}
