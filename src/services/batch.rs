//! Batch writer
//!
//! Filters empty updates out of a batch result and submits the rest as one
//! bulk write. The bulk write is the only mutation of persistent state in
//! the whole pipeline.

use anyhow::Result;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::crm::{CrmClient, SaveResult};
use crate::types::update::ID_FIELD;
use crate::types::{BatchResult, FieldUpdate};

/// Flatten a batch result into update-by-id records, dropping updates with no
/// data fields. Sorted by id so submissions and logs are reproducible.
pub fn collect_updates(results: BatchResult) -> Vec<Map<String, Value>> {
    let mut records: Vec<Map<String, Value>> = results
        .into_values()
        .filter(|update| !update.is_empty())
        .map(FieldUpdate::into_record)
        .collect();
    records.sort_by(|a, b| {
        a.get(ID_FIELD)
            .and_then(Value::as_str)
            .cmp(&b.get(ID_FIELD).and_then(Value::as_str))
    });
    records
}

/// Submit the non-empty subset of `results` as one bulk update against
/// `object`. An all-empty batch performs no network write at all. Per-record
/// failures are logged and returned; an HTTP-level failure propagates.
pub async fn write_updates(
    crm: &CrmClient,
    object: &str,
    results: BatchResult,
) -> Result<Vec<SaveResult>> {
    let records = collect_updates(results);
    if records.is_empty() {
        info!("no non-empty updates; skipping bulk write to {}", object);
        return Ok(Vec::new());
    }

    info!("sending batch update of {} records to {}", records.len(), object);
    let save_results = crm.update_batch(object, records).await?;

    for result in save_results.iter().filter(|r| !r.success) {
        warn!(
            "bulk update failed for {}: {}",
            result.id.as_deref().unwrap_or("<unknown>"),
            result
                .errors
                .iter()
                .map(|e| {
                    format!(
                        "{}: {}",
                        e.status_code.as_deref().unwrap_or("UNKNOWN"),
                        e.message
                    )
                })
                .collect::<Vec<_>>()
                .join("; ")
        );
    }

    Ok(save_results)
}
