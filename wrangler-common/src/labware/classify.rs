//! Labware, sample type and purpose classification
//!
//! The warehouse does not declare what a container is; it is inferred from
//! the shape of its rows. Study and sample state are read from the first
//! row only: every row of a container is assumed to agree.

use crate::config::PurposeNames;
use crate::db::WarehouseRow;
use crate::{Error, Result};
use serde::Serialize;
use std::fmt;

/// Kind of container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LabwareType {
    TubeRack,
    Plate,
}

impl fmt::Display for LabwareType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabwareType::TubeRack => write!(f, "tube rack"),
            LabwareType::Plate => write!(f, "plate"),
        }
    }
}

/// State of the samples held by a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SampleType {
    Extract,
    Lysate,
}

/// Rack format; anything other than exactly 48 rows is a 96 rack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum RackSize {
    Tubes48,
    #[default]
    Tubes96,
}

impl RackSize {
    pub fn from_row_count(rows: usize) -> Self {
        if rows == 48 {
            RackSize::Tubes48
        } else {
            RackSize::Tubes96
        }
    }

    pub fn tubes(self) -> usize {
        match self {
            RackSize::Tubes48 => 48,
            RackSize::Tubes96 => 96,
        }
    }
}

/// Decide whether the rows describe a tube rack or a plate
///
/// - every row has a tube barcode: tube rack
/// - no row has a tube barcode: plate
/// - anything else (including no rows): indeterminable
pub fn determine_labware_type(labware_barcode: &str, rows: &[WarehouseRow]) -> Result<LabwareType> {
    let with_tube = rows.iter().filter(|row| row.tube_barcode().is_some()).count();

    match (rows.len(), with_tube) {
        (0, _) => Err(Error::IndeterminableLabware(labware_barcode.to_string())),
        (total, tubes) if total == tubes => Ok(LabwareType::TubeRack),
        (_, 0) => Ok(LabwareType::Plate),
        _ => Err(Error::IndeterminableLabware(labware_barcode.to_string())),
    }
}

/// Sample type from the first row's sample state
pub fn determine_sample_type(labware_barcode: &str, rows: &[WarehouseRow]) -> Result<SampleType> {
    let sample_state = rows.first().and_then(|row| row.sample_state.as_deref());

    match sample_state {
        Some("Extract") => Ok(SampleType::Extract),
        Some("Lysate") => Ok(SampleType::Lysate),
        _ => Err(Error::IndeterminableSampleType(labware_barcode.to_string())),
    }
}

/// Downstream purpose name for the labware
///
/// Extract racks pick the 48 or 96 purpose by rack size; every other
/// combination has a single purpose. A blank configured name cannot be
/// resolved downstream and is reported as indeterminable.
pub fn determine_purpose_name<'a>(
    purposes: &'a PurposeNames,
    labware_barcode: &str,
    labware_type: LabwareType,
    sample_type: SampleType,
    rack_size: RackSize,
) -> Result<&'a str> {
    let name = match (labware_type, sample_type) {
        (LabwareType::TubeRack, SampleType::Extract) => match rack_size {
            RackSize::Tubes48 => &purposes.extract_tube_rack_48,
            RackSize::Tubes96 => &purposes.extract_tube_rack_96,
        },
        (LabwareType::TubeRack, SampleType::Lysate) => &purposes.lysate_tube_rack,
        (LabwareType::Plate, SampleType::Extract) => &purposes.extract_plate,
        (LabwareType::Plate, SampleType::Lysate) => &purposes.lysate_plate,
    };

    let name = name.trim();
    if name.is_empty() {
        return Err(Error::IndeterminablePurpose(labware_barcode.to_string()));
    }

    Ok(name)
}
