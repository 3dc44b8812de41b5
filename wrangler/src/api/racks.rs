//! Tube rack layout endpoint
//!
//! GET /tube_rack/:barcode

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::{error, info, warn};
use wrangler_common::labware::TubeRackDir;
use wrangler_common::Error;

use crate::{error::ApiError, AppState};

/// GET /tube_rack/:barcode
///
/// Returns the rack's tubes and coordinates from its layout CSV, or
/// 204 No Content when the CSV is missing or empty. Barcodes that are not
/// plain file names get 400.
pub async fn get_tube_rack(State(state): State<AppState>, Path(barcode): Path<String>) -> Response {
    info!("Looking for tube rack with barcode '{}'", barcode);

    let racks = TubeRackDir::new(&state.config.tube_racks.dir);
    match racks.read_layout(&barcode) {
        Ok(layout) => Json(layout).into_response(),
        Err(Error::CsvNotFound(_)) => {
            warn!(barcode = %barcode, "No tube rack CSV");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e @ Error::InvalidInput(_)) => {
            warn!(barcode = %barcode, error = %e, "Rejected tube rack barcode");
            ApiError::BadRequest(e).into_response()
        }
        Err(e) => {
            error!(barcode = %barcode, kind = e.kind_name(), error = %e, "Failed to read tube rack CSV");
            ApiError::Internal(e).into_response()
        }
    }
}

/// Build tube rack routes
pub fn rack_routes() -> Router<AppState> {
    Router::new().route("/tube_rack/:barcode", get(get_tube_rack))
}
