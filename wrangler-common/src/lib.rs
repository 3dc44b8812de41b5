//! # Wrangler Common Library
//!
//! Shared code for the labware wrangler service:
//! - Error kinds raised while reconciling labware
//! - Configuration loading
//! - Rack layout CSV parsing
//! - Labware / sample type classification and control sample detection
//! - Tube reconciliation and downstream request body construction
//! - Warehouse (MLWH) access

pub mod config;
pub mod db;
pub mod error;
pub mod labware;

pub use error::{Error, Result};
