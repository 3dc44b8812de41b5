//! Common error types for the wrangler

use thiserror::Error;

/// Common result type for wrangler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds raised while wrangling labware
///
/// The labware kinds all carry the barcode of the labware being wrangled.
#[derive(Error, Debug)]
pub enum Error {
    /// No rows for the barcode in the warehouse
    #[error("Labware barcode not found in the MLWH: {0}")]
    BarcodeNotFound(String),

    /// Rack layout CSV missing or zero-length
    #[error("Tube rack CSV file not found or empty: {0}")]
    CsvNotFound(String),

    /// Rack layout and warehouse disagree on the number of tubes
    #[error("Different number of tubes between the rack layout and the MLWH: {0}")]
    TubesCount(String),

    /// Same number of tubes but different tube barcodes
    #[error("Tube barcodes in the rack layout do not match those in the MLWH: {0}")]
    BarcodesMismatch(String),

    /// Two tubes or samples claim the same coordinate
    #[error("More than one tube or sample at coordinate {coordinate}: {barcode}")]
    DuplicateCoordinate { barcode: String, coordinate: String },

    /// Warehouse rows mix tubes with and without tube barcodes
    #[error("Unable to determine the labware type: {0}")]
    IndeterminableLabware(String),

    /// Sample state is neither Extract nor Lysate
    #[error("Unable to determine the sample type: {0}")]
    IndeterminableSampleType(String),

    /// No purpose configured for the labware/sample combination
    #[error("Unable to determine the purpose: {0}")]
    IndeterminablePurpose(String),

    /// UUID lookup matched nothing
    #[error("No {entity} found with name '{name}'")]
    EntityNotFound { entity: String, name: String },

    /// UUID lookup matched more than one entity
    #[error("{count} {entity} found with name '{name}', expected exactly one")]
    AmbiguousEntity {
        entity: String,
        name: String,
        count: usize,
    },

    /// Transport or decoding failure talking to the downstream LIMS
    #[error("LIMS error: {0}")]
    Lims(String),

    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV content
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Stable name of the error kind, as reported to HTTP callers
    pub fn kind_name(&self) -> &'static str {
        match self {
            Error::BarcodeNotFound(_) => "BarcodeNotFoundError",
            Error::CsvNotFound(_) => "CsvNotFoundError",
            Error::TubesCount(_) => "TubesCountError",
            Error::BarcodesMismatch(_) => "BarcodesMismatchError",
            Error::DuplicateCoordinate { .. } => "DuplicateCoordinateError",
            Error::IndeterminableLabware(_) => "IndeterminableLabwareError",
            Error::IndeterminableSampleType(_) => "IndeterminableSampleTypeError",
            Error::IndeterminablePurpose(_) => "IndeterminablePurposeError",
            Error::EntityNotFound { .. } => "EntityNotFoundError",
            Error::AmbiguousEntity { .. } => "AmbiguousEntityError",
            Error::Lims(_) => "LimsError",
            Error::Database(_) => "DatabaseError",
            Error::Io(_) => "IoError",
            Error::Csv(_) => "CsvError",
            Error::Config(_) => "ConfigError",
            Error::InvalidInput(_) => "InvalidInputError",
        }
    }

    /// True when the labware itself failed validation against its rack layout
    pub fn is_validation_failure(&self) -> bool {
        matches!(
            self,
            Error::CsvNotFound(_)
                | Error::TubesCount(_)
                | Error::BarcodesMismatch(_)
                | Error::DuplicateCoordinate { .. }
        )
    }

    /// True for the kinds raised while classifying warehouse data
    pub fn is_classification_failure(&self) -> bool {
        matches!(
            self,
            Error::IndeterminableLabware(_)
                | Error::IndeterminableSampleType(_)
                | Error::IndeterminablePurpose(_)
        )
    }
}
