//! Address geocoding job
//!
//! Fetches records whose residency coordinates are still empty, geocodes
//! their free-text addresses, and bulk-writes the coordinates back. Records
//! with a null address field are filtered client-side; the limit applies
//! after that filter.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::config::Config;
use crate::crm::{soql, CrmClient};
use crate::services::{address, batch, dispatcher, geocoding};
use crate::types::{AddressRecord, ADDRESS_OBJECT};

pub async fn run(config: &Config, limit: usize, pool_size: usize) -> Result<()> {
    let crm = CrmClient::login(config).await?;
    let geocoder = geocoding::create_geocoder(config)?;

    let rows = crm.query_all(&soql::address_query()).await?;
    let mut records: Vec<AddressRecord> = rows.iter().filter_map(AddressRecord::from_row).collect();
    if limit > 0 {
        records.truncate(limit);
    }
    info!("Got {} addresses to geocode", records.len());

    let results = dispatcher::dispatch_all(records, pool_size, |record| {
        let geocoder = Arc::clone(&geocoder);
        async move { address::process_address(geocoder.as_ref(), record).await }
    })
    .await;

    batch::write_updates(&crm, ADDRESS_OBJECT, results).await?;

    Ok(())
}
