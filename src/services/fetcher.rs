//! Retrying attachment fetcher
//!
//! Downloads one remote image to a local path, retrying transient failures
//! with exponential backoff. Exhausted retries are the caller's problem to
//! log and skip; they never abort sibling work.

use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use reqwest::StatusCode;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::crm::CrmClient;

/// Maximum attempts per resource, counting the first.
pub const MAX_ATTEMPTS: u32 = 5;

/// First retry delay; doubled after every failed attempt.
pub const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Per-attempt request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Fetch outcome taxonomy: transient failures are retried, permanent ones are
/// not.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transient fetch failure: {0}")]
    Transient(String),
    #[error("permanent fetch failure: {0}")]
    Permanent(String),
}

impl FetchError {
    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            FetchError::Transient(e.to_string())
        } else if e.is_builder() || e.is_decode() {
            FetchError::Permanent(e.to_string())
        } else {
            // Dropped connections, resets, body errors
            FetchError::Transient(e.to_string())
        }
    }
}

/// Run `op` up to [`MAX_ATTEMPTS`] times, sleeping [`INITIAL_BACKOFF`] and
/// doubling between transient failures. Permanent failures return
/// immediately.
pub async fn fetch_with_retry<T, F, Fut>(mut op: F) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, FetchError>>,
{
    let mut delay = INITIAL_BACKOFF;
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e @ FetchError::Permanent(_)) => return Err(e),
            Err(e) if attempt >= MAX_ATTEMPTS => return Err(e),
            Err(e) => {
                warn!(
                    "fetch attempt {}/{} failed: {}; retrying in {:?}",
                    attempt, MAX_ATTEMPTS, e, delay
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
        }
    }
}

/// Resolve an image locator to the attachment-body URL. Relative locators
/// resolve against the session's instance URL; the `file` query parameter
/// names the attachment to stream.
pub fn attachment_url(crm: &CrmClient, locator: &str) -> Result<String, FetchError> {
    let absolute = if locator.starts_with("http") {
        locator.to_string()
    } else {
        format!("{}{}", crm.instance_url(), locator)
    };

    let parsed = reqwest::Url::parse(&absolute)
        .map_err(|e| FetchError::Permanent(format!("invalid locator {}: {}", locator, e)))?;
    let file_id = parsed
        .query_pairs()
        .find_map(|(key, value)| (key == "file").then(|| value.into_owned()))
        .ok_or_else(|| {
            FetchError::Permanent(format!("locator {} has no file parameter", locator))
        })?;

    Ok(crm.data_url(&format!("sobjects/Attachment/{}/body", file_id)))
}

/// Download the attachment behind `locator` to `dest`, retrying transient
/// failures. A retried attempt re-creates (truncates) the destination file.
pub async fn download_attachment(
    crm: &CrmClient,
    locator: &str,
    dest: &Path,
) -> Result<(), FetchError> {
    let url = attachment_url(crm, locator)?;
    fetch_with_retry(|| attempt_download(crm, &url, dest)).await
}

async fn attempt_download(crm: &CrmClient, url: &str, dest: &Path) -> Result<(), FetchError> {
    let response = crm
        .get(url)
        .timeout(REQUEST_TIMEOUT)
        .send()
        .await
        .map_err(FetchError::from_reqwest)?;

    let status = response.status();
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        return Err(FetchError::Transient(format!("HTTP {}", status)));
    }
    if !status.is_success() {
        return Err(FetchError::Permanent(format!("HTTP {}", status)));
    }

    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| FetchError::Permanent(format!("cannot create {}: {}", dest.display(), e)))?;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::from_reqwest)?;
        file.write_all(&chunk)
            .await
            .map_err(|e| FetchError::Permanent(format!("cannot write {}: {}", dest.display(), e)))?;
    }
    file.flush()
        .await
        .map_err(|e| FetchError::Permanent(format!("cannot flush {}: {}", dest.display(), e)))?;

    Ok(())
}
