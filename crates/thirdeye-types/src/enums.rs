//! Enumeration types shared across the radar crates.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Whether the proximity radar is currently searching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum RadarStatus {
    /// No search radius; the engine does not run.
    #[default]
    Off,
    /// A search radius is active and the engine recomputes on every trigger.
    Active,
}

impl core::fmt::Display for RadarStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Off => f.write_str("off"),
            Self::Active => f.write_str("active"),
        }
    }
}

/// What happens to a selected entity that has left the proximity result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum StaleSelectionPolicy {
    /// Drop the selection as soon as the entity is no longer in range.
    #[default]
    Clear,
    /// Keep showing the last-known data until the user dismisses it.
    Keep,
}
