//! Request bodies for the downstream LIMS
//!
//! Bodies are JSON:API documents: `{"data": {"type": ..., "attributes": ...}}`.
//! Tube racks key their tubes by coordinate, plates key their wells by
//! coordinate; both embed each sample's content with its control annotation.

use super::control::ControlAnnotation;
use super::rack_csv::RackLayout;
use crate::db::WarehouseRow;
use crate::{Error, Result};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};

/// Status recorded downstream when a rack fails validation
pub const STATUS_VALIDATION_FAILED: &str = "validation failed";

/// Content of one tube or well
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleContent {
    pub supplier_name: String,
    pub control: ControlAnnotation,
}

impl SampleContent {
    pub fn for_supplier_sample_id(supplier_sample_id: &str) -> Self {
        Self {
            supplier_name: supplier_sample_id.to_string(),
            control: ControlAnnotation::for_supplier_sample_id(supplier_sample_id),
        }
    }
}

/// `control` and `control_type` are only written for control samples; the
/// downstream API reads their absence as "not a control".
impl Serialize for SampleContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let len = if self.control.is_control { 3 } else { 1 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("supplier_name", &self.supplier_name)?;
        if self.control.is_control {
            map.serialize_entry("control", &true)?;
            map.serialize_entry("control_type", &self.control.control_type)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TubeEntry {
    pub barcode: String,
    pub content: SampleContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WellEntry {
    pub content: SampleContent,
}

/// Tube rack registration body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TubeRackBody {
    pub barcode: String,
    pub purpose_uuid: String,
    pub study_uuid: String,
    /// Coordinate → tube
    pub tubes: BTreeMap<String, TubeEntry>,
}

impl TubeRackBody {
    /// Build from a reconciled rack layout
    ///
    /// Each layout tube takes its supplier sample id from the warehouse row
    /// with the same tube barcode.
    pub fn from_layout(
        layout: &RackLayout,
        rows: &[WarehouseRow],
        purpose_uuid: impl Into<String>,
        study_uuid: impl Into<String>,
    ) -> Result<Self> {
        let supplier_ids: HashMap<&str, &str> = rows
            .iter()
            .filter_map(|row| Some((row.tube_barcode()?, row.supplier_sample_id.as_str())))
            .collect();

        let mut tubes = BTreeMap::new();
        for (tube_barcode, coordinate) in layout.layout() {
            let supplier_sample_id = supplier_ids
                .get(tube_barcode)
                .ok_or_else(|| Error::BarcodesMismatch(layout.rack_barcode.clone()))?;

            insert_at(
                &mut tubes,
                &layout.rack_barcode,
                coordinate,
                TubeEntry {
                    barcode: tube_barcode.to_string(),
                    content: SampleContent::for_supplier_sample_id(supplier_sample_id),
                },
            )?;
        }

        Ok(Self {
            barcode: layout.rack_barcode.clone(),
            purpose_uuid: purpose_uuid.into(),
            study_uuid: study_uuid.into(),
            tubes,
        })
    }

    /// Build from warehouse rows alone, using their tube barcodes and
    /// coordinates
    pub fn from_rows(
        labware_barcode: &str,
        rows: &[WarehouseRow],
        purpose_uuid: impl Into<String>,
        study_uuid: impl Into<String>,
    ) -> Result<Self> {
        let mut tubes = BTreeMap::new();
        for row in rows {
            let tube_barcode = row
                .tube_barcode()
                .ok_or_else(|| Error::IndeterminableLabware(labware_barcode.to_string()))?;

            insert_at(
                &mut tubes,
                labware_barcode,
                row.coordinate.trim(),
                TubeEntry {
                    barcode: tube_barcode.to_string(),
                    content: SampleContent::for_supplier_sample_id(&row.supplier_sample_id),
                },
            )?;
        }

        Ok(Self {
            barcode: labware_barcode.to_string(),
            purpose_uuid: purpose_uuid.into(),
            study_uuid: study_uuid.into(),
            tubes,
        })
    }

    /// JSON:API request document
    pub fn to_request(&self) -> Value {
        json!({ "data": { "type": "tube_racks", "attributes": self } })
    }
}

/// Plate registration body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlateBody {
    pub barcode: String,
    pub purpose_uuid: String,
    pub study_uuid: String,
    /// Coordinate → well
    pub wells: BTreeMap<String, WellEntry>,
}

impl PlateBody {
    pub fn from_rows(
        labware_barcode: &str,
        rows: &[WarehouseRow],
        purpose_uuid: impl Into<String>,
        study_uuid: impl Into<String>,
    ) -> Result<Self> {
        let mut wells = BTreeMap::new();
        for row in rows {
            insert_at(
                &mut wells,
                labware_barcode,
                row.coordinate.trim(),
                WellEntry {
                    content: SampleContent::for_supplier_sample_id(&row.supplier_sample_id),
                },
            )?;
        }

        Ok(Self {
            barcode: labware_barcode.to_string(),
            purpose_uuid: purpose_uuid.into(),
            study_uuid: study_uuid.into(),
            wells,
        })
    }

    /// JSON:API request document
    pub fn to_request(&self) -> Value {
        json!({ "data": { "type": "plates", "attributes": self } })
    }
}

/// Add an entry at a coordinate no other entry holds
fn insert_at<T>(
    entries: &mut BTreeMap<String, T>,
    labware_barcode: &str,
    coordinate: &str,
    entry: T,
) -> Result<()> {
    match entries.entry(coordinate.to_string()) {
        Entry::Vacant(slot) => {
            slot.insert(entry);
            Ok(())
        }
        Entry::Occupied(_) => Err(Error::DuplicateCoordinate {
            barcode: labware_barcode.to_string(),
            coordinate: coordinate.to_string(),
        }),
    }
}

/// Tube rack status record reporting a validation failure
pub fn validation_failed_body(labware_barcode: &str, error: &Error) -> Value {
    json!({
        "data": {
            "attributes": {
                "tube_rack_status": {
                    "tube_rack": {
                        "barcode": labware_barcode,
                        "status": STATUS_VALIDATION_FAILED,
                        "messages": [error.to_string()],
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rack_row(tube: &str, coordinate: &str, supplier: &str) -> WarehouseRow {
        WarehouseRow {
            container_barcode: "DN123".to_string(),
            tube_barcode: Some(tube.to_string()),
            coordinate: coordinate.to_string(),
            study: "heron".to_string(),
            supplier_sample_id: supplier.to_string(),
            sample_state: Some("Extract".to_string()),
            destination: None,
            wrangled: None,
        }
    }

    fn plate_row(coordinate: &str, supplier: &str) -> WarehouseRow {
        WarehouseRow {
            tube_barcode: None,
            ..rack_row("", coordinate, supplier)
        }
    }

    #[test]
    fn test_sample_content_omits_control_fields_for_normal_sample() {
        let content = SampleContent::for_supplier_sample_id("xyz123");
        assert_eq!(
            serde_json::to_value(&content).unwrap(),
            json!({"supplier_name": "xyz123"})
        );
    }

    #[test]
    fn test_sample_content_control_fields() {
        let content = SampleContent::for_supplier_sample_id("is a positive control");
        assert_eq!(
            serde_json::to_value(&content).unwrap(),
            json!({
                "supplier_name": "is a positive control",
                "control": true,
                "control_type": "Positive"
            })
        );

        let content = SampleContent::for_supplier_sample_id("a control");
        assert_eq!(
            serde_json::to_value(&content).unwrap(),
            json!({"supplier_name": "a control", "control": true, "control_type": null})
        );
    }

    #[test]
    fn test_tube_rack_body_from_layout() {
        let layout =
            RackLayout::parse("DN123", "A01,TB123\nA02,TB456\n".as_bytes()).unwrap();
        let rows = vec![
            rack_row("TB456", "A02", "negative control 1"),
            rack_row("TB123", "A01", "xyz123"),
        ];

        let body = TubeRackBody::from_layout(&layout, &rows, "54321", "12345").unwrap();

        assert_eq!(
            body.to_request(),
            json!({
                "data": {
                    "type": "tube_racks",
                    "attributes": {
                        "barcode": "DN123",
                        "purpose_uuid": "54321",
                        "study_uuid": "12345",
                        "tubes": {
                            "A01": {"barcode": "TB123", "content": {"supplier_name": "xyz123"}},
                            "A02": {
                                "barcode": "TB456",
                                "content": {
                                    "supplier_name": "negative control 1",
                                    "control": true,
                                    "control_type": "Negative"
                                }
                            }
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn test_tube_rack_body_reads_back_layout_barcodes() {
        let csv = "A01,TB123\nA02,TB124\nA03,TB125\nB01,TB126\nB02,TB127\nB03,TB128\n";
        let layout = RackLayout::parse("DN123", csv.as_bytes()).unwrap();
        let rows: Vec<_> = layout
            .tubes
            .iter()
            .map(|tube| rack_row(&tube.barcode, &tube.coordinate, "sample"))
            .collect();

        let body = TubeRackBody::from_layout(&layout, &rows, "p", "s").unwrap();

        assert_eq!(body.tubes.len(), 6);
        for tube in &layout.tubes {
            assert_eq!(body.tubes[&tube.coordinate].barcode, tube.barcode);
        }
    }

    #[test]
    fn test_tube_rack_body_unknown_tube() {
        let layout = RackLayout::parse("DN123", "A01,TB999\n".as_bytes()).unwrap();
        let rows = vec![rack_row("TB123", "A01", "xyz123")];

        let result = TubeRackBody::from_layout(&layout, &rows, "p", "s");
        assert!(matches!(result, Err(Error::BarcodesMismatch(_))));
    }

    #[test]
    fn test_tube_rack_body_from_rows() {
        let rows = vec![rack_row("tb1", "A01", "SSID1"), rack_row("tb2", "A02", "SSID2")];
        let body = TubeRackBody::from_rows("RACK-1", &rows, "9999", "3333").unwrap();

        assert_eq!(body.barcode, "RACK-1");
        assert_eq!(body.tubes["A02"].barcode, "tb2");

        let rows = vec![plate_row("A01", "SSID1")];
        assert!(TubeRackBody::from_rows("RACK-1", &rows, "9999", "3333").is_err());
    }

    #[test]
    fn test_tube_rack_body_rejects_shared_coordinate() {
        let layout =
            RackLayout::parse("DN123", "B02,TB127\nB02,TB128\n".as_bytes()).unwrap();
        let rows = vec![rack_row("TB127", "B02", "s1"), rack_row("TB128", "B03", "s2")];

        let result = TubeRackBody::from_layout(&layout, &rows, "p", "s");
        assert!(matches!(
            result,
            Err(Error::DuplicateCoordinate { ref coordinate, .. }) if coordinate == "B02"
        ));

        let rows = vec![rack_row("tb1", "A01", "s1"), rack_row("tb2", " A01 ", "s2")];
        let result = TubeRackBody::from_rows("RACK-1", &rows, "p", "s");
        assert!(matches!(result, Err(Error::DuplicateCoordinate { .. })));
    }

    #[test]
    fn test_plate_body_rejects_shared_coordinate() {
        let rows = vec![plate_row("A01", "s1"), plate_row("A01", "s2")];

        let result = PlateBody::from_rows("PLATE1", &rows, "p", "s");
        assert!(matches!(
            result,
            Err(Error::DuplicateCoordinate { ref barcode, .. }) if barcode == "PLATE1"
        ));
    }

    #[test]
    fn test_plate_body() {
        let rows = vec![plate_row("A01", "xyz123"), plate_row("A02", "Positive Control")];
        let body = PlateBody::from_rows("DN123", &rows, "54321", "12345").unwrap();

        assert_eq!(
            body.to_request(),
            json!({
                "data": {
                    "type": "plates",
                    "attributes": {
                        "barcode": "DN123",
                        "purpose_uuid": "54321",
                        "study_uuid": "12345",
                        "wells": {
                            "A01": {"content": {"supplier_name": "xyz123"}},
                            "A02": {
                                "content": {
                                    "supplier_name": "Positive Control",
                                    "control": true,
                                    "control_type": "Positive"
                                }
                            }
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn test_validation_failed_body() {
        let error = Error::TubesCount("DN123".to_string());
        let body = validation_failed_body("DN123", &error);
        let tube_rack = &body["data"]["attributes"]["tube_rack_status"]["tube_rack"];

        assert_eq!(tube_rack["barcode"], "DN123");
        assert_eq!(tube_rack["status"], STATUS_VALIDATION_FAILED);
        assert_eq!(tube_rack["messages"][0], error.to_string());
    }
}
