//! Control sample detection
//!
//! Control samples are recognised by naming convention on the supplier
//! sample id: anything containing "control" (any case) is a control, and
//! "positive" / "negative" give its polarity.

use serde::{Deserialize, Serialize};

/// Polarity of a control sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarity {
    Positive,
    Negative,
}

/// Control classification of one sample
///
/// Always present on a sample; `control_type` is `None` both for
/// non-controls and for controls with no recognisable polarity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlAnnotation {
    pub is_control: bool,
    pub control_type: Option<Polarity>,
}

impl ControlAnnotation {
    pub fn for_supplier_sample_id(supplier_sample_id: &str) -> Self {
        let is_control = control_for(supplier_sample_id);
        Self {
            is_control,
            control_type: if is_control {
                control_type_for(supplier_sample_id)
            } else {
                None
            },
        }
    }
}

/// True if the supplier sample id names a control sample
pub fn control_for(supplier_sample_id: &str) -> bool {
    contains_ignore_case(supplier_sample_id, "control")
}

/// Polarity named by the supplier sample id, if any
pub fn control_type_for(supplier_sample_id: &str) -> Option<Polarity> {
    if contains_ignore_case(supplier_sample_id, "positive") {
        Some(Polarity::Positive)
    } else if contains_ignore_case(supplier_sample_id, "negative") {
        Some(Polarity::Negative)
    } else {
        None
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}
