//! Configuration management

use anyhow::{Context, Result};

/// Application configuration, loaded once at startup and passed explicitly to
/// the network clients. Credentials never live in globals.
#[derive(Debug, Clone)]
pub struct Config {
    /// CRM login endpoint
    pub login_url: String,

    /// CRM API user
    pub username: String,
    pub password: String,
    pub security_token: String,

    /// Connected-app consumer key/secret for the OAuth2 password grant
    pub client_id: String,
    pub client_secret: String,

    /// Geocoding API key (required for the google backend only)
    pub geocode_api_key: String,

    /// Geocoder backend: "google" or "mock"
    pub geocoder_backend: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let login_url = std::env::var("CRM_LOGIN_URL")
            .unwrap_or_else(|_| "https://login.salesforce.com".to_string());

        let username = std::env::var("CRM_USERNAME").context("CRM_USERNAME must be set")?;
        let password = std::env::var("CRM_PASSWORD").context("CRM_PASSWORD must be set")?;
        let security_token =
            std::env::var("CRM_SECURITY_TOKEN").context("CRM_SECURITY_TOKEN must be set")?;
        let client_id = std::env::var("CRM_CLIENT_ID").context("CRM_CLIENT_ID must be set")?;
        let client_secret =
            std::env::var("CRM_CLIENT_SECRET").context("CRM_CLIENT_SECRET must be set")?;

        let geocode_api_key = std::env::var("GEOCODE_API_KEY").unwrap_or_default();

        let geocoder_backend =
            std::env::var("GEOCODER_BACKEND").unwrap_or_else(|_| "google".to_string());

        Ok(Self {
            login_url,
            username,
            password,
            security_token,
            client_id,
            client_secret,
            geocode_api_key,
            geocoder_backend,
        })
    }
}
