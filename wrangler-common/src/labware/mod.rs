//! Labware reconciliation core
//!
//! Leaf-first: rack layout parsing, control detection, labware/sample
//! classification, tube reconciliation, then request body construction.

pub mod body;
pub mod classify;
pub mod control;
pub mod rack_csv;
pub mod reconcile;

pub use body::{
    validation_failed_body, PlateBody, SampleContent, TubeEntry, TubeRackBody, WellEntry,
    STATUS_VALIDATION_FAILED,
};
pub use classify::{
    determine_labware_type, determine_purpose_name, determine_sample_type, LabwareType,
    RackSize, SampleType,
};
pub use control::{control_for, control_type_for, ControlAnnotation, Polarity};
pub use rack_csv::{RackLayout, RackTube, TubeRackDir, NO_READ};
pub use reconcile::{validate_coordinates, validate_tubes};
