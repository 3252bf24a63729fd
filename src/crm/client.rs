//! CRM REST client
//!
//! Session login, SOQL queries with pagination, and bulk record updates via
//! the composite sObject collections endpoint. This is the only module that
//! talks to the CRM directly.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::config::Config;

/// REST API version all data requests are issued against.
pub const API_VERSION: &str = "v56.0";

/// The collections endpoint accepts at most this many records per request.
const MAX_RECORDS_PER_REQUEST: usize = 200;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    instance_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    done: bool,
    records: Vec<Map<String, Value>>,
    next_records_url: Option<String>,
}

/// Per-record outcome of a bulk update.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResult {
    pub id: Option<String>,
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<SaveError>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveError {
    pub status_code: Option<String>,
    pub message: String,
}

/// Authenticated CRM session.
pub struct CrmClient {
    http: reqwest::Client,
    instance_url: String,
    access_token: String,
}

impl CrmClient {
    /// Obtain a session via the OAuth2 password grant. The security token is
    /// appended to the password, as the CRM requires for API logins.
    pub async fn login(config: &Config) -> Result<Self> {
        let http = build_http_client();

        let password = format!("{}{}", config.password, config.security_token);
        let params = [
            ("grant_type", "password"),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("username", config.username.as_str()),
            ("password", password.as_str()),
        ];

        let response = http
            .post(format!("{}/services/oauth2/token", config.login_url))
            .form(&params)
            .send()
            .await
            .context("failed to send login request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("CRM login failed with {}: {}", status, body);
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("failed to parse login response")?;
        info!("Logged in to CRM at {}", token.instance_url);

        Ok(Self {
            http,
            instance_url: token.instance_url,
            access_token: token.access_token,
        })
    }

    /// Build a client around an existing session.
    pub fn with_session(instance_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            http: build_http_client(),
            instance_url: instance_url.into(),
            access_token: access_token.into(),
        }
    }

    pub fn instance_url(&self) -> &str {
        &self.instance_url
    }

    /// Absolute URL of a data API path, e.g. `query` or
    /// `sobjects/Attachment/{id}/body`.
    pub fn data_url(&self, path: &str) -> String {
        format!("{}/services/data/{}/{}", self.instance_url, API_VERSION, path)
    }

    /// Authenticated GET request builder; used for queries and attachment
    /// downloads.
    pub fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.http.get(url).bearer_auth(&self.access_token)
    }

    /// Run a SOQL query and follow `nextRecordsUrl` until every page has been
    /// fetched.
    pub async fn query_all(&self, soql: &str) -> Result<Vec<Map<String, Value>>> {
        debug!("querying: {}", soql);
        let mut url = format!("{}?q={}", self.data_url("query"), urlencoding::encode(soql));
        let mut records = Vec::new();

        loop {
            let response = self
                .get(&url)
                .send()
                .await
                .context("failed to send query request")?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                anyhow::bail!("query failed with {}: {}", status, body);
            }

            let page: QueryResponse = response
                .json()
                .await
                .context("failed to parse query response")?;
            records.extend(page.records);

            match (page.done, page.next_records_url) {
                (false, Some(next)) => url = format!("{}{}", self.instance_url, next),
                _ => break,
            }
        }

        Ok(records)
    }

    /// Apply update-by-id records to `object` through the collections
    /// endpoint, chunked to its per-request limit, with `allOrNone` off so
    /// one bad record does not roll back its chunk.
    pub async fn update_batch(
        &self,
        object: &str,
        records: Vec<Map<String, Value>>,
    ) -> Result<Vec<SaveResult>> {
        let mut results = Vec::with_capacity(records.len());

        for chunk in records.chunks(MAX_RECORDS_PER_REQUEST) {
            let chunk: Vec<Value> = chunk.iter().map(|r| with_attributes(r, object)).collect();
            let body = json!({ "allOrNone": false, "records": chunk });

            let response = self
                .http
                .patch(self.data_url("composite/sobjects"))
                .bearer_auth(&self.access_token)
                .json(&body)
                .send()
                .await
                .context("failed to send bulk update request")?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                anyhow::bail!("bulk update failed with {}: {}", status, body);
            }

            let chunk_results: Vec<SaveResult> = response
                .json()
                .await
                .context("failed to parse bulk update response")?;
            results.extend(chunk_results);
        }

        Ok(results)
    }
}

fn build_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent("geosync-worker/0.3")
        .build()
        .expect("Failed to create HTTP client")
}

/// Each record in a collections request carries its object type alongside the
/// fields.
fn with_attributes(record: &Map<String, Value>, object: &str) -> Value {
    let mut record = record.clone();
    record.insert("attributes".to_string(), json!({ "type": object }));
    Value::Object(record)
}
