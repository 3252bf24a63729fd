//! Google Maps Geocoding API client

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::types::Coordinates;

pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Geocoding API response envelope
#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Location,
}

#[derive(Debug, Deserialize)]
struct Location {
    lat: f64,
    lng: f64,
}

/// Google Maps geocoding client. The client library's own connection
/// handling is treated as sufficient; no extra retry layer here.
pub struct GoogleMapsClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GoogleMapsClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, api_key)
    }

    pub fn with_base_url(base_url: &str, api_key: &str) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("geosync-worker/0.3")
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            client,
        }
    }

    /// Geocode a free-text address. Returns the top-confidence result, or
    /// `None` when the API has no parse for it.
    pub async fn geocode(&self, address: &str) -> Result<Option<(Coordinates, String)>> {
        let url = format!(
            "{}?address={}&key={}",
            self.base_url,
            urlencoding::encode(address),
            self.api_key
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("failed to send geocoding request")?;

        if !response.status().is_success() {
            anyhow::bail!("geocoding request failed with {}", response.status());
        }

        let body: GeocodeResponse = response
            .json()
            .await
            .context("failed to parse geocoding response")?;
        top_result(body)
    }
}

fn top_result(body: GeocodeResponse) -> Result<Option<(Coordinates, String)>> {
    match body.status.as_str() {
        "OK" => Ok(body.results.into_iter().next().map(|r| {
            (
                Coordinates {
                    lat: r.geometry.location.lat,
                    lng: r.geometry.location.lng,
                },
                r.formatted_address,
            )
        })),
        "ZERO_RESULTS" => Ok(None),
        other => anyhow::bail!(
            "geocoding API returned {}: {}",
            other,
            body.error_message.unwrap_or_default()
        ),
    }
}
