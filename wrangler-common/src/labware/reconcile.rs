//! Tube reconciliation between a rack layout and the warehouse

use crate::{Error, Result};
use std::collections::BTreeSet;

/// Check that the layout and the warehouse describe the same tubes
///
/// Both inputs are raw barcode sequences. A barcode repeated on one side
/// collapses in a set, so the raw and unique counts of each side are
/// compared as well as the counts across sides; any difference is a
/// [`Error::TubesCount`]. Equal counts with different barcodes is a
/// [`Error::BarcodesMismatch`]. Ordering is irrelevant.
pub fn validate_tubes<'a, L, W>(labware_barcode: &str, layout_tubes: L, warehouse_tubes: W) -> Result<()>
where
    L: IntoIterator<Item = &'a str>,
    W: IntoIterator<Item = &'a str>,
{
    let (layout_count, layout_set) = count_and_collect(layout_tubes);
    let (warehouse_count, warehouse_set) = count_and_collect(warehouse_tubes);

    if layout_count != warehouse_count
        || layout_set.len() != layout_count
        || warehouse_set.len() != warehouse_count
    {
        return Err(Error::TubesCount(labware_barcode.to_string()));
    }

    if layout_set != warehouse_set {
        return Err(Error::BarcodesMismatch(labware_barcode.to_string()));
    }

    Ok(())
}

/// Check that no coordinate holds more than one tube or sample
///
/// Fails with [`Error::DuplicateCoordinate`] naming the first repeat.
pub fn validate_coordinates<'a, C>(labware_barcode: &str, coordinates: C) -> Result<()>
where
    C: IntoIterator<Item = &'a str>,
{
    let mut seen = BTreeSet::new();
    for coordinate in coordinates {
        if !seen.insert(coordinate) {
            return Err(Error::DuplicateCoordinate {
                barcode: labware_barcode.to_string(),
                coordinate: coordinate.to_string(),
            });
        }
    }
    Ok(())
}

fn count_and_collect<'a>(tubes: impl IntoIterator<Item = &'a str>) -> (usize, BTreeSet<&'a str>) {
    tubes
        .into_iter()
        .fold((0, BTreeSet::new()), |(count, mut set), tube| {
            set.insert(tube);
            (count + 1, set)
        })
}
