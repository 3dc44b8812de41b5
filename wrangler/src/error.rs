//! HTTP error responses
//!
//! Bodies are `{"error": "<message>"}`, the shape existing callers of the
//! wrangle endpoint already parse.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use wrangler_common::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Labware unknown to the warehouse (400)
    #[error("{}", .0.kind_name())]
    BarcodeNotFound(#[source] Error),

    /// Labware failed validation or classification (500, message included)
    #[error("{}: {}", .0.kind_name(), .0)]
    Labware(#[source] Error),

    /// Malformed request parameter (400, message included)
    #[error("{}: {}", .0.kind_name(), .0)]
    BadRequest(#[source] Error),

    /// Anything else (500, kind only)
    #[error("Server error: {}", .0.kind_name())]
    Internal(#[source] Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BarcodeNotFound(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Labware(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::BarcodeNotFound(_) => ApiError::BarcodeNotFound(err),
            err if err.is_validation_failure() || err.is_classification_failure() => {
                ApiError::Labware(err)
            }
            err => ApiError::Internal(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
