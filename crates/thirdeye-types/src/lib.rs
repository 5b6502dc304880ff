//! Shared type definitions for the Third Eye proximity radar.
//!
//! This crate is the single source of truth for the values that flow between
//! the radar crates. Types defined here also flow to `TypeScript` via `ts-rs`
//! for the web front end that draws the map.
//!
//! # Modules
//!
//! - [`geo`] -- Validated [`Coordinate`] value type
//! - [`ids`] -- Entity identifiers and rendering-surface handles
//! - [`enums`] -- Radar status and selection policy
//! - [`structs`] -- Entities, fixes, proximity results, icon specs

pub mod enums;
pub mod geo;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{RadarStatus, StaleSelectionPolicy};
pub use geo::{Coordinate, CoordinateError};
pub use ids::{EntityId, MarkerHandle, OverlayHandle};
pub use structs::{
    Fix, IconSpec, ProximityEntry, ProximityResult, SelectedEntity, TrackedEntity,
};
