//! Geocoding abstraction layer
//!
//! - `GoogleGeocoder` for production lookups
//! - `MockGeocoder` for tests and dry runs (deterministic, no network)
//!
//! Backend selection via the `GEOCODER_BACKEND` configuration value:
//! - "google" → GoogleGeocoder (production)
//! - "mock" → MockGeocoder

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::Config;
use crate::services::google::GoogleMapsClient;
use crate::types::Coordinates;

/// Geocoder trait - abstraction for all geocoding implementations
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Geocode an address to coordinates
    /// Returns None if the address cannot be geocoded
    async fn geocode(&self, address: &str) -> Result<Option<GeocodingResult>>;

    /// Get the name of this geocoder implementation
    fn name(&self) -> &'static str;
}

/// Result of a geocoding operation
#[derive(Debug, Clone)]
pub struct GeocodingResult {
    /// Latitude and longitude
    pub coordinates: Coordinates,
    /// Canonical address returned by the geocoder
    pub formatted_address: String,
}

// ==========================================================================
// GoogleGeocoder Implementation
// ==========================================================================

/// Production geocoder backed by the Google Maps Geocoding API.
pub struct GoogleGeocoder {
    client: GoogleMapsClient,
}

impl GoogleGeocoder {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: GoogleMapsClient::new(api_key),
        }
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<GeocodingResult>> {
        match self.client.geocode(address).await? {
            Some((coordinates, formatted_address)) => Ok(Some(GeocodingResult {
                coordinates,
                formatted_address,
            })),
            None => Ok(None),
        }
    }

    fn name(&self) -> &'static str {
        "google"
    }
}

// ==========================================================================
// MockGeocoder Implementation
// ==========================================================================

/// Mock geocoder for testing - returns deterministic fake coordinates
pub struct MockGeocoder;

impl MockGeocoder {
    pub fn new() -> Self {
        Self
    }

    /// Generate deterministic coordinates from the address hash, kept inside
    /// inhabited latitudes.
    fn hash_to_coordinates(address: &str) -> Coordinates {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        address.hash(&mut hasher);
        let hash = hasher.finish();

        const LAT_MIN: f64 = -60.0;
        const LAT_MAX: f64 = 70.0;
        const LNG_MIN: f64 = -180.0;
        const LNG_MAX: f64 = 180.0;

        // Use different parts of the hash for lat and lng
        let lat_normalized = ((hash >> 32) as f64) / (u32::MAX as f64);
        let lng_normalized = ((hash & 0xFFFF_FFFF) as f64) / (u32::MAX as f64);

        Coordinates {
            lat: LAT_MIN + lat_normalized * (LAT_MAX - LAT_MIN),
            lng: LNG_MIN + lng_normalized * (LNG_MAX - LNG_MIN),
        }
    }
}

impl Default for MockGeocoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Geocoder for MockGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<GeocodingResult>> {
        Ok(Some(GeocodingResult {
            coordinates: Self::hash_to_coordinates(address),
            formatted_address: address.to_string(),
        }))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

// ==========================================================================
// Factory function
// ==========================================================================

/// Create the geocoder named by `Config::geocoder_backend`. The google
/// backend requires an API key; an unknown backend is an error rather than a
/// silent fallback, since this worker writes its results back to the CRM.
pub fn create_geocoder(config: &Config) -> Result<Arc<dyn Geocoder>> {
    match config.geocoder_backend.as_str() {
        "google" => {
            if config.geocode_api_key.is_empty() {
                anyhow::bail!("GEOCODE_API_KEY must be set for the google geocoder backend");
            }
            tracing::info!("Using GoogleGeocoder");
            Ok(Arc::new(GoogleGeocoder::new(&config.geocode_api_key)))
        }
        "mock" => {
            tracing::info!("Using MockGeocoder");
            Ok(Arc::new(MockGeocoder::new()))
        }
        other => anyhow::bail!("unknown GEOCODER_BACKEND '{}' (expected google or mock)", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(backend: &str, api_key: &str) -> Config {
        Config {
            login_url: "https://login.example.com".to_string(),
            username: "user@example.com".to_string(),
            password: "secret".to_string(),
            security_token: "tok".to_string(),
            client_id: "client".to_string(),
            client_secret: "shh".to_string(),
            geocode_api_key: api_key.to_string(),
            geocoder_backend: backend.to_string(),
        }
    }

    #[tokio::test]
    async fn mock_geocoder_returns_coordinates_for_any_address() {
        let geocoder = MockGeocoder::new();

        let result = geocoder.geocode("1600 Amphitheatre Pkwy").await.unwrap();
        assert!(result.is_some(), "MockGeocoder should always return coordinates");
    }

    #[tokio::test]
    async fn mock_geocoder_returns_deterministic_coordinates() {
        let geocoder = MockGeocoder::new();

        let first = geocoder.geocode("1 Main St").await.unwrap().unwrap();
        let second = geocoder.geocode("1 Main St").await.unwrap().unwrap();

        assert_eq!(first.coordinates.lat, second.coordinates.lat);
        assert_eq!(first.coordinates.lng, second.coordinates.lng);
    }

    #[tokio::test]
    async fn mock_geocoder_returns_different_coordinates_for_different_addresses() {
        let geocoder = MockGeocoder::new();

        let a = geocoder.geocode("1 Main St").await.unwrap().unwrap();
        let b = geocoder.geocode("2 Main St").await.unwrap().unwrap();

        assert_ne!(a.coordinates.lat, b.coordinates.lat);
        assert_ne!(a.coordinates.lng, b.coordinates.lng);
    }

    #[tokio::test]
    async fn mock_geocoder_stays_in_bounds() {
        let geocoder = MockGeocoder::new();

        for address in ["a", "b", "c", "somewhere long and specific"] {
            let result = geocoder.geocode(address).await.unwrap().unwrap();
            assert!(result.coordinates.lat >= -60.0 && result.coordinates.lat <= 70.0);
            assert!(result.coordinates.lng >= -180.0 && result.coordinates.lng <= 180.0);
        }
    }

    #[test]
    fn mock_geocoder_name_is_mock() {
        assert_eq!(MockGeocoder::new().name(), "mock");
    }

    #[test]
    fn factory_creates_mock_backend() {
        let geocoder = create_geocoder(&test_config("mock", "")).unwrap();
        assert_eq!(geocoder.name(), "mock");
    }

    #[test]
    fn factory_creates_google_backend_with_key() {
        let geocoder = create_geocoder(&test_config("google", "AIza-test")).unwrap();
        assert_eq!(geocoder.name(), "google");
    }

    #[test]
    fn factory_requires_api_key_for_google() {
        assert!(create_geocoder(&test_config("google", "")).is_err());
    }

    #[test]
    fn factory_rejects_unknown_backend() {
        assert!(create_geocoder(&test_config("nominatim", "key")).is_err());
    }
}
