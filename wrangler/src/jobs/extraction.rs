//! Extraction job
//!
//! Finds warehouse containers destined for extraction that have not been
//! wrangled yet, registers each with the LIMS, and marks the ones the LIMS
//! created as wrangled. Containers are processed one at a time and in
//! isolation: a failure in one never stops the others.

use crate::lims::{LimsResponse, UuidCache};
use crate::wrangle::{resolve_uuids, LabwareRequest};
use crate::AppState;
use futures::{pin_mut, Stream, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{error, info, warn};
use wrangler_common::db::WarehouseRow;
use wrangler_common::labware::{
    determine_labware_type, LabwareType, PlateBody, RackSize, TubeRackBody,
};
use wrangler_common::Result;

/// Result of trying to register one container
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    pub barcode: String,
    /// `None` when the container failed before reaching the LIMS
    pub response: Option<LimsResponse>,
    pub successful: bool,
}

/// Barcodes created and failed during one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobSummary {
    pub created: Vec<String>,
    pub failed: Vec<String>,
}

/// Run the job once
///
/// Errors are only returned for the bulk warehouse query and the final
/// wrangled update; per-container failures are counted in the summary.
pub async fn run(state: &AppState) -> Result<JobSummary> {
    let rows = state
        .warehouse
        .unwrangled_rows(&state.config.job.destination)
        .await?;

    if rows.is_empty() {
        info!("No unwrangled labware found");
        return Ok(JobSummary::default());
    }

    let outcomes = create_labwares(state, rows);
    pin_mut!(outcomes);

    let mut summary = JobSummary::default();
    while let Some(outcome) = outcomes.next().await {
        if outcome.successful {
            summary.created.push(outcome.barcode);
        } else {
            summary.failed.push(outcome.barcode);
        }
    }

    if !summary.created.is_empty() {
        state.warehouse.mark_wrangled(&summary.created).await?;
        info!(
            "The following labware were successfully created: {}",
            summary.created.join(",")
        );
    }

    if !summary.failed.is_empty() {
        error!(
            "The following labware failed to be created: {}",
            summary.failed.join(",")
        );
    }

    Ok(summary)
}

/// Register every container in `rows`, yielding one outcome per container
///
/// UUID lookups are shared across containers for the lifetime of the stream.
pub fn create_labwares(
    state: &AppState,
    rows: Vec<WarehouseRow>,
) -> impl Stream<Item = JobOutcome> + '_ {
    async_stream::stream! {
        let mut uuids = UuidCache::new();

        for (barcode, container_rows) in group_by_container(rows) {
            match create_labware(state, &mut uuids, &barcode, &container_rows).await {
                Ok(response) => {
                    let successful = response.is_created();
                    if !successful {
                        warn!(barcode = %barcode, status = response.status, "LIMS did not create labware");
                    }
                    yield JobOutcome { barcode, response: Some(response), successful };
                }
                Err(e) => {
                    error!(barcode = %barcode, kind = e.kind_name(), error = %e, "Failed to create labware");
                    yield JobOutcome { barcode, response: None, successful: false };
                }
            }
        }
    }
}

/// Build and send the body for one container from its warehouse rows
async fn create_labware(
    state: &AppState,
    uuids: &mut UuidCache,
    barcode: &str,
    rows: &[WarehouseRow],
) -> Result<LimsResponse> {
    let labware_type = determine_labware_type(barcode, rows)?;
    let rack_size = RackSize::from_row_count(rows.len());

    let (purpose_uuid, study_uuid) = resolve_uuids(
        state.lims.as_ref(),
        uuids,
        &state.config,
        barcode,
        labware_type,
        rack_size,
        rows,
    )
    .await?;

    let request = match labware_type {
        LabwareType::TubeRack => LabwareRequest::TubeRack(TubeRackBody::from_rows(
            barcode,
            rows,
            purpose_uuid,
            study_uuid,
        )?),
        LabwareType::Plate => LabwareRequest::Plate(PlateBody::from_rows(
            barcode,
            rows,
            purpose_uuid,
            study_uuid,
        )?),
    };

    state
        .lims
        .post(request.endpoint(&state.config.lims), &request.to_request())
        .await
}

/// Group rows by container barcode, in order of first appearance
fn group_by_container(rows: Vec<WarehouseRow>) -> Vec<(String, Vec<WarehouseRow>)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<WarehouseRow>)> = Vec::new();

    for row in rows {
        match index.get(&row.container_barcode) {
            Some(&position) => groups[position].1.push(row),
            None => {
                index.insert(row.container_barcode.clone(), groups.len());
                groups.push((row.container_barcode.clone(), vec![row]));
            }
        }
    }

    groups
}
