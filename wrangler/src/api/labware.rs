//! Labware wrangling endpoint
//!
//! POST /wrangle/:barcode

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use tracing::{error, info, warn};

use crate::{error::ApiError, AppState};

/// POST /wrangle/:barcode
///
/// Reconciles the labware and registers it with the LIMS. On success the
/// LIMS status and body are passed through unchanged. A rack that fails
/// validation also gets a "validation failed" status record in the LIMS.
pub async fn wrangle(State(state): State<AppState>, Path(barcode): Path<String>) -> Response {
    info!(barcode = %barcode, "Wrangling labware");
    let wrangler = state.wrangler();

    match wrangler.wrangle_labware(&barcode).await {
        Ok(response) => {
            let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);
            (status, Json(response.body)).into_response()
        }
        Err(e) => {
            if e.is_validation_failure() {
                warn!(barcode = %barcode, kind = e.kind_name(), error = %e, "Labware failed validation");
                wrangler.notify_validation_failure(&barcode, &e).await;
            } else {
                error!(barcode = %barcode, kind = e.kind_name(), error = %e, "Failed to wrangle labware");
            }
            ApiError::from(e).into_response()
        }
    }
}

/// Build labware routes
pub fn labware_routes() -> Router<AppState> {
    Router::new().route("/wrangle/:barcode", post(wrangle))
}
