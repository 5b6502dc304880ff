//! Distance between two coordinates.
//!
//! The radar never hard-codes a metric. Anything that implements
//! [`DistanceMetric`] can be handed to the proximity engine: the rendering
//! surface's own metric, the standalone [`Haversine`] metric below, or a plain
//! closure in tests.

use thirdeye_types::Coordinate;

/// Mean earth radius in meters, matching the spherical CRS used by common
/// web map libraries.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A way of measuring the distance in meters between two coordinates.
pub trait DistanceMetric {
    /// Distance from `a` to `b` in meters.
    fn distance_between(&self, a: Coordinate, b: Coordinate) -> f64;
}

impl<F> DistanceMetric for F
where
    F: Fn(Coordinate, Coordinate) -> f64,
{
    fn distance_between(&self, a: Coordinate, b: Coordinate) -> f64 {
        self(a, b)
    }
}

/// Great-circle distance on a sphere using the haversine formula.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Haversine {
    radius_meters: f64,
}

impl Haversine {
    /// Haversine on a sphere of the given radius.
    pub const fn with_radius(radius_meters: f64) -> Self {
        Self { radius_meters }
    }

    /// Sphere radius used by this metric.
    pub const fn radius_meters(self) -> f64 {
        self.radius_meters
    }
}

impl Default for Haversine {
    fn default() -> Self {
        Self::with_radius(EARTH_RADIUS_METERS)
    }
}

impl DistanceMetric for Haversine {
    fn distance_between(&self, a: Coordinate, b: Coordinate) -> f64 {
        haversine_meters(self.radius_meters, a, b)
    }
}

/// Haversine distance in meters on a sphere of `radius_meters`.
pub fn haversine_meters(radius_meters: f64, a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude().to_radians();
    let lat2 = b.latitude().to_radians();
    let sin_d_lat = ((b.latitude() - a.latitude()).to_radians() / 2.0).sin();
    let sin_d_lon = ((b.longitude() - a.longitude()).to_radians() / 2.0).sin();

    let h = sin_d_lat.mul_add(sin_d_lat, lat1.cos() * lat2.cos() * sin_d_lon * sin_d_lon);
    // Rounding can push h a hair past 1 for antipodal points.
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    radius_meters * c
}
