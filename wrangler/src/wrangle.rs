//! Labware wrangling orchestration
//!
//! Per labware barcode:
//! 1. fetch the warehouse rows (none: barcode not found)
//! 2. classify the labware and its samples
//! 3. tube racks only: read the rack CSV and reconcile its tubes and
//!    coordinates with the warehouse; plates skip the CSV entirely
//! 4. resolve the purpose and study UUIDs and build the body
//! 5. POST the body and hand back the LIMS response unchanged

use crate::lims::{Lims, LimsResponse, UuidCache, PLATE_PURPOSE_ENTITY, STUDY_ENTITY};
use serde_json::Value;
use tracing::{debug, info, warn};
use wrangler_common::config::{LimsConfig, WranglerConfig};
use wrangler_common::db::{Warehouse, WarehouseRow};
use wrangler_common::labware::{
    determine_labware_type, determine_purpose_name, determine_sample_type,
    validate_coordinates, validate_tubes, validation_failed_body, LabwareType, PlateBody,
    RackSize, TubeRackBody, TubeRackDir,
};
use wrangler_common::{Error, Result};

/// Body ready to be sent to the LIMS
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabwareRequest {
    TubeRack(TubeRackBody),
    Plate(PlateBody),
}

impl LabwareRequest {
    pub fn labware_type(&self) -> LabwareType {
        match self {
            LabwareRequest::TubeRack(_) => LabwareType::TubeRack,
            LabwareRequest::Plate(_) => LabwareType::Plate,
        }
    }

    /// LIMS endpoint registering this kind of labware
    pub fn endpoint<'a>(&self, lims: &'a LimsConfig) -> &'a str {
        match self {
            LabwareRequest::TubeRack(_) => &lims.tube_rack_endpoint,
            LabwareRequest::Plate(_) => &lims.plate_endpoint,
        }
    }

    pub fn to_request(&self) -> Value {
        match self {
            LabwareRequest::TubeRack(body) => body.to_request(),
            LabwareRequest::Plate(body) => body.to_request(),
        }
    }
}

/// Orchestrates one wrangling pass over borrowed collaborators
pub struct LabwareWrangler<'a> {
    warehouse: &'a dyn Warehouse,
    lims: &'a dyn Lims,
    config: &'a WranglerConfig,
}

impl<'a> LabwareWrangler<'a> {
    pub fn new(warehouse: &'a dyn Warehouse, lims: &'a dyn Lims, config: &'a WranglerConfig) -> Self {
        Self {
            warehouse,
            lims,
            config,
        }
    }

    /// Reconcile a labware and register it with the LIMS
    ///
    /// Returns the LIMS response, whatever its status.
    pub async fn wrangle_labware(&self, labware_barcode: &str) -> Result<LimsResponse> {
        let request = self.prepare(labware_barcode).await?;
        let endpoint = request.endpoint(&self.config.lims);

        info!(barcode = %labware_barcode, endpoint = %endpoint, "Sending {} to LIMS", request.labware_type());
        self.lims.post(endpoint, &request.to_request()).await
    }

    /// Everything up to, but not including, the POST
    pub async fn prepare(&self, labware_barcode: &str) -> Result<LabwareRequest> {
        let rows = self.warehouse.labware_rows(labware_barcode).await?;
        debug!(barcode = %labware_barcode, "Number of records found: {}", rows.len());

        if rows.is_empty() {
            return Err(Error::BarcodeNotFound(labware_barcode.to_string()));
        }

        let labware_type = determine_labware_type(labware_barcode, &rows)?;
        info!(barcode = %labware_barcode, "Determined labware type: {}", labware_type);

        let mut uuids = UuidCache::new();

        match labware_type {
            LabwareType::TubeRack => {
                let racks = TubeRackDir::new(&self.config.tube_racks.dir);
                let layout = racks.read_layout(labware_barcode)?;

                validate_tubes(
                    labware_barcode,
                    layout.tube_barcodes(),
                    rows.iter().filter_map(WarehouseRow::tube_barcode),
                )?;
                validate_coordinates(labware_barcode, layout.coordinates())?;

                let rack_size = RackSize::from_row_count(layout.row_count);
                let (purpose_uuid, study_uuid) = resolve_uuids(
                    self.lims,
                    &mut uuids,
                    self.config,
                    labware_barcode,
                    labware_type,
                    rack_size,
                    &rows,
                )
                .await?;

                let body = TubeRackBody::from_layout(&layout, &rows, purpose_uuid, study_uuid)?;
                Ok(LabwareRequest::TubeRack(body))
            }
            LabwareType::Plate => {
                let (purpose_uuid, study_uuid) = resolve_uuids(
                    self.lims,
                    &mut uuids,
                    self.config,
                    labware_barcode,
                    labware_type,
                    RackSize::default(),
                    &rows,
                )
                .await?;

                let body = PlateBody::from_rows(labware_barcode, &rows, purpose_uuid, study_uuid)?;
                Ok(LabwareRequest::Plate(body))
            }
        }
    }

    /// Best-effort "validation failed" status record for a rejected rack
    ///
    /// A failure to deliver it is logged and otherwise ignored.
    pub async fn notify_validation_failure(&self, labware_barcode: &str, error: &Error) {
        let body = validation_failed_body(labware_barcode, error);
        let endpoint = &self.config.lims.tube_rack_status_endpoint;

        match self.lims.post(endpoint, &body).await {
            Ok(response) => {
                debug!(barcode = %labware_barcode, status = response.status, "Validation failure recorded in LIMS");
            }
            Err(e) => {
                warn!(barcode = %labware_barcode, error = %e, "Failed to record validation failure in LIMS");
            }
        }
    }
}

/// Purpose and study UUIDs for a container
///
/// Sample state and study are read from the first row.
pub(crate) async fn resolve_uuids(
    lims: &dyn Lims,
    uuids: &mut UuidCache,
    config: &WranglerConfig,
    labware_barcode: &str,
    labware_type: LabwareType,
    rack_size: RackSize,
    rows: &[WarehouseRow],
) -> Result<(String, String)> {
    let sample_type = determine_sample_type(labware_barcode, rows)?;
    let purpose_name = determine_purpose_name(
        &config.purposes,
        labware_barcode,
        labware_type,
        sample_type,
        rack_size,
    )?;

    let study_name = rows
        .first()
        .map(|row| row.study.as_str())
        .ok_or_else(|| Error::BarcodeNotFound(labware_barcode.to_string()))?;
    info!(barcode = %labware_barcode, study = %study_name, purpose = %purpose_name, "Resolving UUIDs");

    let purpose_uuid = uuids.entity_uuid(lims, PLATE_PURPOSE_ENTITY, purpose_name).await?;
    let study_uuid = uuids.entity_uuid(lims, STUDY_ENTITY, study_name).await?;

    Ok((purpose_uuid, study_uuid))
}
