//! wrangler library - labware reconciliation service
//!
//! Exposes the orchestrator, the extraction job and the HTTP router for
//! the binary and for integration tests.

use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use wrangler_common::config::WranglerConfig;
use wrangler_common::db::Warehouse;

pub mod api;
pub mod error;
pub mod jobs;
pub mod lims;
pub mod wrangle;

pub use crate::error::{ApiError, ApiResult};
pub use crate::wrangle::{LabwareRequest, LabwareWrangler};

/// Application state shared across HTTP handlers and the job scheduler
#[derive(Clone)]
pub struct AppState {
    /// Warehouse (MLWH) rows
    pub warehouse: Arc<dyn Warehouse>,
    /// Downstream LIMS
    pub lims: Arc<dyn lims::Lims>,
    pub config: Arc<WranglerConfig>,
}

impl AppState {
    pub fn new(
        warehouse: Arc<dyn Warehouse>,
        lims: Arc<dyn lims::Lims>,
        config: Arc<WranglerConfig>,
    ) -> Self {
        Self {
            warehouse,
            lims,
            config,
        }
    }

    /// Orchestrator borrowing this state's collaborators
    pub fn wrangler(&self) -> LabwareWrangler<'_> {
        LabwareWrangler::new(self.warehouse.as_ref(), self.lims.as_ref(), &self.config)
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::labware_routes())
        .merge(api::rack_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
