//! HTTP API handlers for wrangler

pub mod health;
pub mod labware;
pub mod racks;

pub use health::health_routes;
pub use labware::labware_routes;
pub use racks::rack_routes;
