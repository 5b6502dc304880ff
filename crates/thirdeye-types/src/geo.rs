//! Geographic coordinate value type.
//!
//! A [`Coordinate`] can only be built through [`Coordinate::new`], which
//! rejects non-finite or out-of-range values. Deserialization routes through
//! the same check, so every `Coordinate` in the system is valid.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Minimum valid latitude in degrees.
pub const MIN_LATITUDE: f64 = -90.0;
/// Maximum valid latitude in degrees.
pub const MAX_LATITUDE: f64 = 90.0;
/// Minimum valid longitude in degrees.
pub const MIN_LONGITUDE: f64 = -180.0;
/// Maximum valid longitude in degrees.
pub const MAX_LONGITUDE: f64 = 180.0;

/// Errors produced when building a coordinate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoordinateError {
    /// Latitude or longitude is outside its valid range or not finite.
    #[error("coordinate out of range: ({latitude}, {longitude})")]
    OutOfRange {
        /// The rejected latitude.
        latitude: f64,
        /// The rejected longitude.
        longitude: f64,
    },
}

/// A (latitude, longitude) pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(try_from = "RawCoordinate")]
#[ts(export, export_to = "bindings/")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    /// The intersection of the equator and the prime meridian.
    pub const ORIGIN: Self = Self {
        latitude: 0.0,
        longitude: 0.0,
    };

    /// Build a coordinate, validating both components.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError::OutOfRange`] if either value is not finite
    /// or lies outside `[-90, 90]` / `[-180, 180]`.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        let lat_ok = latitude.is_finite() && (MIN_LATITUDE..=MAX_LATITUDE).contains(&latitude);
        let lon_ok =
            longitude.is_finite() && (MIN_LONGITUDE..=MAX_LONGITUDE).contains(&longitude);
        if lat_ok && lon_ok {
            Ok(Self {
                latitude,
                longitude,
            })
        } else {
            Err(CoordinateError::OutOfRange {
                latitude,
                longitude,
            })
        }
    }

    /// Latitude in degrees.
    pub const fn latitude(self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    pub const fn longitude(self) -> f64 {
        self.longitude
    }

    /// Return a coordinate shifted by the given deltas in degrees.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError::OutOfRange`] if the shifted position leaves
    /// the valid range.
    pub fn offset(self, d_latitude: f64, d_longitude: f64) -> Result<Self, CoordinateError> {
        Self::new(self.latitude + d_latitude, self.longitude + d_longitude)
    }
}

impl core::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({:.5}, {:.5})", self.latitude, self.longitude)
    }
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = CoordinateError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude)
    }
}

/// Unvalidated wire shape of a [`Coordinate`].
#[derive(Debug, Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn accepts_range_extremes() {
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(-90.0, -180.0).is_ok());
        assert!(Coordinate::new(51.505, -0.09).is_ok());
    }

    #[test]
    fn rejects_out_of_range_and_non_finite() {
        assert!(Coordinate::new(90.5, 0.0).is_err());
        assert!(Coordinate::new(0.0, -180.1).is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn deserialization_validates() {
        let ok: Result<Coordinate, _> =
            serde_json::from_str(r#"{"latitude": 10.0, "longitude": 20.0}"#);
        assert!(ok.is_ok());

        let bad: Result<Coordinate, _> =
            serde_json::from_str(r#"{"latitude": 100.0, "longitude": 20.0}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn offset_stays_validated() {
        let base = Coordinate::new(89.999, 0.0).unwrap();
        assert!(base.offset(0.01, 0.0).is_err());
        assert!(base.offset(-0.01, 0.0).is_ok());
    }
}
