//! Survey image enrichment job
//!
//! Downloads the image files attached to unprocessed surveys, extracts GPS
//! coordinates from their EXIF data, and bulk-writes the coordinates back.
//!
//! Images that cannot be downloaded or opened are skipped, and will not be
//! retried on later runs: the work-set query treats a record with any
//! populated coordinate field as handled.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::crm::{soql, CrmClient};
use crate::services::{batch, dispatcher, survey};
use crate::types::{SurveyRecord, SURVEY_OBJECT};

pub async fn run(config: &Config, outdir: &Path, limit: usize, pool_size: usize) -> Result<()> {
    std::fs::create_dir_all(outdir)
        .with_context(|| format!("failed to create output directory {}", outdir.display()))?;

    let crm = Arc::new(CrmClient::login(config).await?);

    let rows = crm.query_all(&soql::survey_query(limit)).await?;
    let records: Vec<SurveyRecord> = rows.iter().filter_map(SurveyRecord::from_row).collect();
    info!("Got {} surveys to update", records.len());

    let outdir_owned = outdir.to_path_buf();
    let results = dispatcher::dispatch_all(records, pool_size, |record| {
        let crm = Arc::clone(&crm);
        let outdir = outdir_owned.clone();
        async move { survey::process_survey(&crm, &outdir, record).await }
    })
    .await;

    batch::write_updates(&crm, SURVEY_OBJECT, results).await?;

    std::fs::remove_dir_all(outdir)
        .with_context(|| format!("failed to remove output directory {}", outdir.display()))?;

    Ok(())
}
