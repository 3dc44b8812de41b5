//! Tube rack layout CSV parsing
//!
//! A scanner drops one `<rack barcode>.csv` file per rack: two un-headered
//! columns, coordinate then tube barcode. Tubes the scanner could not read
//! carry the `NO READ` marker instead of a barcode.

use crate::{Error, Result};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Marker written by the scanner for an unreadable tube
pub const NO_READ: &str = "NO READ";

/// A tube read from the layout file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RackTube {
    pub coordinate: String,
    pub barcode: String,
}

/// Parsed rack layout
///
/// `tubes` keeps every readable row in file order, duplicates included, so
/// that reconciliation can tell a collapsed duplicate from a genuine match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RackLayout {
    pub rack_barcode: String,
    /// Raw data rows in the file, `NO READ` rows included
    pub row_count: usize,
    pub tubes: Vec<RackTube>,
}

impl RackLayout {
    /// Parse layout CSV content
    pub fn parse<R: Read>(rack_barcode: &str, reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut row_count = 0;
        let mut tubes = Vec::new();

        for record in csv_reader.records() {
            let record = record?;
            let (Some(coordinate), Some(tube_barcode)) = (record.get(0), record.get(1)) else {
                return Err(Error::InvalidInput(format!(
                    "Tube rack CSV for {} has a row with fewer than two columns (line {})",
                    rack_barcode,
                    record.position().map(|p| p.line()).unwrap_or_default()
                )));
            };

            row_count += 1;

            if tube_barcode.contains(NO_READ) {
                debug!(rack = %rack_barcode, coordinate = %coordinate, "Skipping unread tube");
                continue;
            }

            tubes.push(RackTube {
                coordinate: coordinate.to_string(),
                barcode: tube_barcode.to_string(),
            });
        }

        Ok(Self {
            rack_barcode: rack_barcode.to_string(),
            row_count,
            tubes,
        })
    }

    /// Tube barcode → coordinate
    ///
    /// A barcode listed twice keeps its last coordinate.
    pub fn layout(&self) -> BTreeMap<&str, &str> {
        self.tubes
            .iter()
            .map(|tube| (tube.barcode.as_str(), tube.coordinate.as_str()))
            .collect()
    }

    /// Coordinates in file order, duplicates included
    pub fn coordinates(&self) -> impl Iterator<Item = &str> {
        self.tubes.iter().map(|tube| tube.coordinate.as_str())
    }

    /// Tube barcodes in file order, duplicates included
    pub fn tube_barcodes(&self) -> impl Iterator<Item = &str> {
        self.tubes.iter().map(|tube| tube.barcode.as_str())
    }
}

impl Serialize for RackLayout {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("RackLayout", 2)?;
        state.serialize_field("rack_barcode", &self.rack_barcode)?;
        state.serialize_field("layout", &self.layout())?;
        state.end()
    }
}

/// Directory of rack layout files
#[derive(Debug, Clone)]
pub struct TubeRackDir {
    dir: PathBuf,
}

impl TubeRackDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Expected layout file for a rack
    ///
    /// The barcode must be a plain file name: empty barcodes, path
    /// separators and `..` are rejected so lookups stay inside the directory.
    pub fn csv_path(&self, rack_barcode: &str) -> Result<PathBuf> {
        let plain = !rack_barcode.is_empty()
            && !rack_barcode.contains(&['/', '\\', '\0'][..])
            && !rack_barcode.contains("..");
        if !plain {
            return Err(Error::InvalidInput(format!(
                "Not a valid rack barcode: {:?}",
                rack_barcode
            )));
        }
        Ok(self.dir.join(format!("{}.csv", rack_barcode)))
    }

    /// True when the rack's layout file exists and is not empty
    pub fn csv_exists(&self, rack_barcode: &str) -> bool {
        match self.csv_path(rack_barcode) {
            Ok(path) => file_has_content(&path),
            Err(e) => {
                warn!("{}", e);
                false
            }
        }
    }

    /// Read and parse the rack's layout file
    ///
    /// Fails with [`Error::InvalidInput`] for a barcode that is not a plain
    /// file name and with [`Error::CsvNotFound`] when the file is absent or
    /// empty.
    pub fn read_layout(&self, rack_barcode: &str) -> Result<RackLayout> {
        let path = self.csv_path(rack_barcode)?;
        if !file_has_content(&path) {
            return Err(Error::CsvNotFound(rack_barcode.to_string()));
        }

        let file = std::fs::File::open(&path)?;
        let layout = RackLayout::parse(rack_barcode, file)?;

        debug!(
            rack = %rack_barcode,
            rows = layout.row_count,
            tubes = layout.tubes.len(),
            "Parsed tube rack CSV"
        );

        Ok(layout)
    }
}

fn file_has_content(path: &Path) -> bool {
    debug!("Finding file: {}", path.display());

    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => {
            info!("File found: {}", path.display());
            true
        }
        _ => {
            warn!("File not found: {}", path.display());
            false
        }
    }
}
