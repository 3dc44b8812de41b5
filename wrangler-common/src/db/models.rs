//! Warehouse row model

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One MLWH record per tube (tube rack) or well (plate)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct WarehouseRow {
    pub container_barcode: String,
    /// Null for plate wells
    pub tube_barcode: Option<String>,
    pub coordinate: String,
    pub study: String,
    pub supplier_sample_id: String,
    /// "Extract" or "Lysate"
    pub sample_state: Option<String>,
    pub destination: Option<String>,
    pub wrangled: Option<NaiveDateTime>,
}

impl WarehouseRow {
    /// Tube barcode when present and non-blank
    pub fn tube_barcode(&self) -> Option<&str> {
        self.tube_barcode
            .as_deref()
            .map(str::trim)
            .filter(|barcode| !barcode.is_empty())
    }
}
