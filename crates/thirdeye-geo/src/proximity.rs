//! Proximity engine: which entities are inside the search radius.
//!
//! [`compute`] is a pure projection. It evaluates the metric once per
//! entity, keeps those at or inside the radius, and returns them in
//! canonical order (ascending whole-meter distance, then identifier). It
//! holds no state between calls; turning successive results into
//! incremental surface edits is the reconciler's job.

use thirdeye_types::{Coordinate, ProximityEntry, ProximityResult, TrackedEntity};
use tracing::debug;

use crate::distance::DistanceMetric;

/// Compute the entities within `radius_meters` of `center`.
///
/// The boundary is inclusive: an entity exactly `radius_meters` away is in
/// range. Distances the metric reports as non-finite or negative are treated
/// as unmeasurable and the entity is left out.
pub fn compute<M>(
    center: Coordinate,
    radius_meters: u32,
    entities: &[TrackedEntity],
    metric: &M,
) -> ProximityResult
where
    M: DistanceMetric + ?Sized,
{
    let radius = f64::from(radius_meters);

    let entries = entities
        .iter()
        .filter_map(|entity| {
            let d = metric.distance_between(center, entity.coordinate);
            if !d.is_finite() || d < 0.0 {
                debug!(entity = %entity.id, distance = d, "Unmeasurable distance, skipping");
                return None;
            }
            (d <= radius).then(|| ProximityEntry {
                entity: entity.clone(),
                distance_meters: round_meters(d, radius_meters),
            })
        })
        .collect();

    ProximityResult::new(entries)
}

/// Round a distance already known to lie in `[0, radius]` to whole meters.
fn round_meters(d: f64, radius_meters: u32) -> u32 {
    // d is finite, non-negative and at most radius_meters, so the rounded
    // value always fits.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let rounded = d.round() as u32;
    rounded.min(radius_meters)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;
    use std::collections::BTreeMap;

    use thirdeye_types::EntityId;

    use super::*;
    use crate::distance::Haversine;

    fn coord(latitude: f64, longitude: f64) -> Coordinate {
        Coordinate::new(latitude, longitude).unwrap()
    }

    fn entity(id: &str, coordinate: Coordinate) -> TrackedEntity {
        TrackedEntity::new(id, id.to_uppercase(), coordinate, format!("avatar://{id}"))
    }

    /// Metric that looks distances up by the entity's longitude, so tests can
    /// pin exact values without caring about geodesy.
    fn table_metric(table: BTreeMap<u32, f64>) -> impl Fn(Coordinate, Coordinate) -> f64 {
        move |_center, target| {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let key = target.longitude().round() as u32;
            table.get(&key).copied().unwrap_or(f64::INFINITY)
        }
    }

    fn ids(result: &ProximityResult) -> Vec<String> {
        result.ids().map(ToString::to_string).collect()
    }

    #[test]
    fn ties_break_by_identifier() {
        let metric = table_metric(BTreeMap::from([(1, 100.0), (2, 100.0), (3, 50.0)]));
        let entities = vec![
            entity("b", coord(0.0, 1.0)),
            entity("a", coord(0.0, 2.0)),
            entity("c", coord(0.0, 3.0)),
        ];

        let result = compute(coord(0.0, 0.0), 200, &entities, &metric);

        assert_eq!(ids(&result), ["c", "a", "b"]);
        let distances: Vec<u32> = result.iter().map(|e| e.distance_meters).collect();
        assert_eq!(distances, [50, 100, 100]);
    }

    #[test]
    fn order_uses_whole_meters() {
        let metric = table_metric(BTreeMap::from([(1, 99.6), (2, 100.4)]));
        let entities = vec![entity("b", coord(0.0, 1.0)), entity("a", coord(0.0, 2.0))];

        let result = compute(coord(0.0, 0.0), 200, &entities, &metric);

        assert_eq!(ids(&result), ["a", "b"]);
    }

    #[test]
    fn boundary_is_inclusive() {
        let metric = table_metric(BTreeMap::from([(1, 100.0), (2, 100.000_001)]));
        let entities = vec![entity("edge", coord(0.0, 1.0)), entity("out", coord(0.0, 2.0))];

        let result = compute(coord(0.0, 0.0), 100, &entities, &metric);

        assert_eq!(ids(&result), ["edge"]);
        assert_eq!(result.entries().first().map(|e| e.distance_meters), Some(100));
    }

    #[test]
    fn larger_radius_is_a_superset() {
        let center = coord(51.505, -0.09);
        let entities: Vec<TrackedEntity> = (0..20_u32)
            .map(|i| {
                let step = f64::from(i) * 0.0007;
                entity(&format!("e{i:02}"), coord(51.505 + step, -0.09 - step / 2.0))
            })
            .collect();
        let metric = Haversine::default();

        let radii = [50, 100, 250, 500, 1000, 2500, 5000];
        for pair in radii.windows(2) {
            let [small, large] = pair else { continue };
            let inner = compute(center, *small, &entities, &metric);
            let outer = compute(center, *large, &entities, &metric);
            for id in inner.ids() {
                assert!(outer.contains(id), "{id} in r={small} but not r={large}");
            }
            assert!(inner.len() <= outer.len());
        }
    }

    #[test]
    fn equator_scenario() {
        let entities = vec![
            entity("1", coord(0.0, 0.005)),
            entity("2", coord(0.0, 0.02)),
        ];
        let result = compute(coord(0.0, 0.0), 1000, &entities, &Haversine::default());

        assert_eq!(ids(&result), ["1"]);
        let d = result.get(&EntityId::from("1")).map(|e| e.distance_meters);
        assert_eq!(d, Some(556));
    }

    #[test]
    fn one_metric_call_per_entity() {
        let calls = Cell::new(0_u32);
        let metric = |_a: Coordinate, _b: Coordinate| {
            calls.set(calls.get().saturating_add(1));
            10.0
        };
        let entities: Vec<TrackedEntity> = (0..7_u32)
            .map(|i| entity(&i.to_string(), coord(0.0, 0.0)))
            .collect();

        let result = compute(coord(0.0, 0.0), 50, &entities, &metric);

        assert_eq!(result.len(), 7);
        assert_eq!(calls.get(), 7);
    }

    #[test]
    fn unmeasurable_distances_are_excluded() {
        let metric = table_metric(BTreeMap::from([(1, f64::NAN), (2, -3.0), (3, 5.0)]));
        let entities = vec![
            entity("nan", coord(0.0, 1.0)),
            entity("neg", coord(0.0, 2.0)),
            entity("ok", coord(0.0, 3.0)),
        ];

        let result = compute(coord(0.0, 0.0), 100, &entities, &metric);

        assert_eq!(ids(&result), ["ok"]);
    }

    #[test]
    fn empty_input_gives_empty_result() {
        let result = compute(coord(0.0, 0.0), 5000, &[], &Haversine::default());
        assert!(result.is_empty());
    }
}
