//! Geospatial filtering for the Third Eye radar.
//!
//! # Modules
//!
//! - [`distance`] -- The [`DistanceMetric`] contract and a standalone
//!   [`Haversine`] implementation.
//! - [`proximity`] -- The pure proximity engine that projects an entity set
//!   onto a center and radius.

pub mod distance;
pub mod proximity;

pub use distance::{DistanceMetric, EARTH_RADIUS_METERS, Haversine, haversine_meters};
pub use proximity::compute;
