//! Keeps the rendering surface in step with the proximity result.
//!
//! The reconciler owns the registry that maps each in-range entity to the
//! marker drawn for it, plus the self marker and the radius overlay. A pass
//! compares the registry with the fresh result and issues the smallest set
//! of surface operations that makes them agree:
//!
//! 1. Entities that entered the result get a marker with a click handler.
//! 2. Entities that left it lose their marker.
//! 3. Entities that stayed but moved have their marker repositioned.
//! 4. The self marker sits at the radar center.
//! 5. The overlay exists only while the radar is active.
//!
//! The registry, not the `previous` result, decides what already exists.
//! That keeps a repeated pass free of surface mutations and lets a pass that
//! was deferred on an unready surface catch up later.

use std::collections::{BTreeMap, BTreeSet};

use thirdeye_types::{Coordinate, EntityId, IconSpec, MarkerHandle, OverlayHandle, ProximityResult};
use tokio::sync::mpsc;
use tracing::debug;

use crate::radar::RadarState;
use crate::surface::{ClickHandler, RenderingSurface};

/// Published when the user clicks an entity marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionEvent {
    /// The clicked entity.
    pub entity_id: EntityId,
}

/// Membership changes between two results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerDiff {
    /// In `next` but not `previous`.
    pub entered: Vec<EntityId>,
    /// In `previous` but not `next`.
    pub exited: Vec<EntityId>,
    /// In both, at a different coordinate.
    pub moved: Vec<EntityId>,
}

impl MarkerDiff {
    /// Compare two results.
    pub fn between(previous: &ProximityResult, next: &ProximityResult) -> Self {
        let before: BTreeMap<&EntityId, Coordinate> = previous
            .iter()
            .map(|e| (&e.entity.id, e.entity.coordinate))
            .collect();
        let after: BTreeMap<&EntityId, Coordinate> = next
            .iter()
            .map(|e| (&e.entity.id, e.entity.coordinate))
            .collect();

        let mut diff = Self::default();
        for (id, coordinate) in &after {
            match before.get(id) {
                None => diff.entered.push((*id).clone()),
                Some(old) if old != coordinate => diff.moved.push((*id).clone()),
                Some(_) => {}
            }
        }
        diff.exited = before
            .keys()
            .filter(|id| !after.contains_key(*id))
            .map(|id| (*id).clone())
            .collect();
        diff
    }

    /// Whether nothing changed.
    pub fn is_empty(&self) -> bool {
        self.entered.is_empty() && self.exited.is_empty() && self.moved.is_empty()
    }
}

/// Surface operations performed by one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Entity markers created.
    pub created: usize,
    /// Entity markers removed.
    pub removed: usize,
    /// Entity markers moved.
    pub moved: usize,
    /// Whether the self marker was placed or replaced.
    pub self_marker_replaced: bool,
    /// Whether the overlay was drawn, replaced, or removed.
    pub overlay_changed: bool,
}

impl ReconcileStats {
    /// Whether the pass touched the surface at all.
    pub const fn is_noop(&self) -> bool {
        self.created == 0
            && self.removed == 0
            && self.moved == 0
            && !self.self_marker_replaced
            && !self.overlay_changed
    }
}

/// Result of a reconcile pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The surface was updated.
    Applied(ReconcileStats),
    /// The surface was not ready; the pass will be redone next time.
    Deferred,
}

impl ReconcileOutcome {
    /// Whether the pass ran against the surface.
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

#[derive(Debug, Clone, Copy)]
struct PlacedEntity {
    handle: MarkerHandle,
    coordinate: Coordinate,
}

#[derive(Debug, Clone, Copy)]
struct SelfMarker {
    handle: MarkerHandle,
    center: Coordinate,
}

#[derive(Debug, Clone, Copy)]
struct RadiusOverlay {
    handle: OverlayHandle,
    center: Coordinate,
    radius_meters: u32,
}

/// Owns every marker and overlay the radar has drawn.
#[derive(Debug)]
pub struct MarkerReconciler {
    registry: BTreeMap<EntityId, PlacedEntity>,
    self_marker: Option<SelfMarker>,
    overlay: Option<RadiusOverlay>,
    pending: bool,
    events_tx: mpsc::UnboundedSender<SelectionEvent>,
    events_rx: mpsc::UnboundedReceiver<SelectionEvent>,
}

impl MarkerReconciler {
    /// An empty reconciler.
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            registry: BTreeMap::new(),
            self_marker: None,
            overlay: None,
            pending: false,
            events_tx,
            events_rx,
        }
    }

    /// Make the surface reflect `next` and `radar`.
    ///
    /// `previous` is the result the caller last reconciled; it is only used
    /// to report drift between that and what the registry holds.
    pub fn reconcile<S: RenderingSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        previous: &ProximityResult,
        next: &ProximityResult,
        radar: &RadarState,
    ) -> ReconcileOutcome {
        if !surface.is_ready() {
            self.pending = true;
            debug!(in_range = next.len(), "Surface not ready; reconcile deferred");
            return ReconcileOutcome::Deferred;
        }

        let catching_up = self.pending;
        let mut stats = ReconcileStats::default();

        let wanted: BTreeSet<&EntityId> = next.ids().collect();
        let stale: Vec<EntityId> = self
            .registry
            .keys()
            .filter(|id| !wanted.contains(id))
            .cloned()
            .collect();
        for id in stale {
            if let Some(placed) = self.registry.remove(&id) {
                surface.remove_marker(placed.handle);
                stats.removed = stats.removed.saturating_add(1);
            }
        }

        for entry in next {
            let entity = &entry.entity;
            if let Some(placed) = self.registry.get_mut(&entity.id) {
                if placed.coordinate != entity.coordinate {
                    surface.set_marker_position(placed.handle, entity.coordinate);
                    placed.coordinate = entity.coordinate;
                    stats.moved = stats.moved.saturating_add(1);
                }
            } else {
                let handle = surface.create_marker(
                    entity.coordinate,
                    IconSpec::for_entity(entity),
                    Some(self.click_handler(&entity.id)),
                );
                self.registry.insert(
                    entity.id.clone(),
                    PlacedEntity {
                        handle,
                        coordinate: entity.coordinate,
                    },
                );
                stats.created = stats.created.saturating_add(1);
            }
        }

        stats.self_marker_replaced = self.place_self_marker(surface, radar.center());
        stats.overlay_changed = self.place_overlay(surface, radar);
        self.pending = false;

        let diff = MarkerDiff::between(previous, next);
        if diff.entered.len() != stats.created
            || diff.exited.len() != stats.removed
            || diff.moved.len() != stats.moved
        {
            debug!(
                catching_up,
                entered = diff.entered.len(),
                exited = diff.exited.len(),
                created = stats.created,
                removed = stats.removed,
                "Registry differed from previous result"
            );
        }
        debug!(
            created = stats.created,
            removed = stats.removed,
            moved = stats.moved,
            self_marker_replaced = stats.self_marker_replaced,
            overlay_changed = stats.overlay_changed,
            "Reconcile pass applied"
        );

        ReconcileOutcome::Applied(stats)
    }

    /// Remove everything this reconciler drew. Safe to call repeatedly.
    pub fn stop<S: RenderingSurface + ?Sized>(&mut self, surface: &mut S) {
        let removed = self.registry.len();
        for placed in core::mem::take(&mut self.registry).into_values() {
            surface.remove_marker(placed.handle);
        }
        if let Some(marker) = self.self_marker.take() {
            surface.remove_marker(marker.handle);
        }
        if let Some(overlay) = self.overlay.take() {
            surface.remove_overlay(overlay.handle);
        }
        self.pending = false;
        if removed > 0 {
            debug!(removed, "Reconciler stopped");
        }
    }

    /// Drain click notifications published since the last call.
    pub fn take_selection_events(&mut self) -> Vec<SelectionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Marker drawn for an entity.
    pub fn handle_for(&self, id: &EntityId) -> Option<MarkerHandle> {
        self.registry.get(id).map(|placed| placed.handle)
    }

    /// Entities that currently have a marker, in identifier order.
    pub fn tracked_ids(&self) -> impl Iterator<Item = &EntityId> {
        self.registry.keys()
    }

    /// Number of entity markers drawn.
    pub fn marker_count(&self) -> usize {
        self.registry.len()
    }

    /// The self marker, once placed.
    pub fn self_marker(&self) -> Option<MarkerHandle> {
        self.self_marker.map(|marker| marker.handle)
    }

    /// The radius overlay, while drawn.
    pub fn overlay(&self) -> Option<OverlayHandle> {
        self.overlay.map(|overlay| overlay.handle)
    }

    /// Whether a deferred pass is waiting for the surface.
    pub const fn is_pending(&self) -> bool {
        self.pending
    }

    fn click_handler(&self, id: &EntityId) -> ClickHandler {
        let tx = self.events_tx.clone();
        let entity_id = id.clone();
        Box::new(move || {
            // The receiver lives as long as the reconciler.
            tx.send(SelectionEvent {
                entity_id: entity_id.clone(),
            })
            .ok();
        })
    }

    fn place_self_marker<S: RenderingSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        center: Coordinate,
    ) -> bool {
        if let Some(marker) = self.self_marker {
            if marker.center == center {
                return false;
            }
            surface.remove_marker(marker.handle);
        }
        let handle = surface.create_marker(center, IconSpec::SelfPosition, None);
        self.self_marker = Some(SelfMarker { handle, center });
        true
    }

    fn place_overlay<S: RenderingSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        radar: &RadarState,
    ) -> bool {
        let wanted = radar
            .is_active()
            .then_some((radar.center(), radar.radius_meters()));

        match (self.overlay, wanted) {
            (None, None) => false,
            (Some(current), Some((center, radius_meters)))
                if current.center == center && current.radius_meters == radius_meters =>
            {
                false
            }
            (current, wanted) => {
                if let Some(current) = current {
                    surface.remove_overlay(current.handle);
                }
                self.overlay = wanted.map(|(center, radius_meters)| RadiusOverlay {
                    handle: surface.create_circle_overlay(center, radius_meters),
                    center,
                    radius_meters,
                });
                true
            }
        }
    }
}

impl Default for MarkerReconciler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use thirdeye_types::{ProximityEntry, TrackedEntity};

    use super::*;
    use crate::config::RadarConfig;
    use crate::radar::{RadarActivation, RadiusRequest};
    use crate::surface::{InMemorySurface, SurfaceOp};

    fn coord(latitude: f64, longitude: f64) -> Coordinate {
        Coordinate::new(latitude, longitude).unwrap()
    }

    fn result(entries: &[(&str, f64)]) -> ProximityResult {
        ProximityResult::new(
            entries
                .iter()
                .map(|&(id, longitude)| ProximityEntry {
                    entity: TrackedEntity::new(id, id, coord(0.0, longitude), "avatar.png"),
                    distance_meters: 0,
                })
                .collect(),
        )
    }

    fn active_radar(radius: u32) -> RadarState {
        let mut radar = RadarActivation::from_config(&RadarConfig::default());
        radar.set_center(Coordinate::ORIGIN);
        radar.activate(RadiusRequest::from(radius)).unwrap();
        radar.state()
    }

    fn assert_corresponds(
        reconciler: &MarkerReconciler,
        surface: &InMemorySurface,
        next: &ProximityResult,
    ) {
        let registry: Vec<&EntityId> = reconciler.tracked_ids().collect();
        let mut expected: Vec<&EntityId> = next.ids().collect();
        expected.sort();
        assert_eq!(registry, expected);
        assert_eq!(surface.entity_marker_count(), next.len());
        for entry in next {
            let handle = reconciler.handle_for(&entry.entity.id).unwrap();
            let marker = surface.marker(handle).unwrap();
            assert_eq!(marker.coordinate, entry.entity.coordinate);
        }
    }

    #[test]
    fn diff_classifies_membership() {
        let previous = result(&[("a", 0.001), ("b", 0.002)]);
        let next = result(&[("b", 0.003), ("c", 0.001)]);
        let diff = MarkerDiff::between(&previous, &next);
        assert_eq!(diff.entered, [EntityId::from("c")]);
        assert_eq!(diff.exited, [EntityId::from("a")]);
        assert_eq!(diff.moved, [EntityId::from("b")]);
        assert!(MarkerDiff::between(&next, &next).is_empty());
    }

    #[test]
    fn registry_tracks_results_across_ticks() {
        let mut surface = InMemorySurface::new();
        let mut reconciler = MarkerReconciler::new();
        let radar = active_radar(1000);
        let ticks = [
            result(&[("a", 0.001)]),
            result(&[("a", 0.001), ("b", 0.002)]),
            result(&[("b", 0.004), ("c", 0.003)]),
            result(&[]),
            result(&[("a", 0.002), ("c", 0.003)]),
        ];

        let mut previous = ProximityResult::empty();
        for next in &ticks {
            let outcome = reconciler.reconcile(&mut surface, &previous, next, &radar);
            assert!(outcome.is_applied());
            assert_corresponds(&reconciler, &surface, next);
            previous = next.clone();
        }
        assert_eq!(surface.self_marker_count(), 1);
        assert_eq!(surface.overlay_count(), 1);
    }

    #[test]
    fn first_pass_reports_every_change() {
        let mut surface = InMemorySurface::new();
        let mut reconciler = MarkerReconciler::new();
        let next = result(&[("a", 0.001), ("b", 0.002)]);
        let outcome =
            reconciler.reconcile(&mut surface, &ProximityResult::empty(), &next, &active_radar(500));

        let ReconcileOutcome::Applied(stats) = outcome else {
            panic!("expected applied outcome");
        };
        assert_eq!(stats.created, 2);
        assert!(stats.self_marker_replaced);
        assert!(stats.overlay_changed);
    }

    #[test]
    fn repeated_pass_is_a_noop() {
        let mut surface = InMemorySurface::new();
        let mut reconciler = MarkerReconciler::new();
        let radar = active_radar(1000);
        let previous = result(&[("a", 0.001)]);
        let next = result(&[("a", 0.002), ("b", 0.003)]);

        reconciler.reconcile(&mut surface, &previous, &next, &radar);
        let ops_after_first = surface.ops().len();
        let outcome = reconciler.reconcile(&mut surface, &previous, &next, &radar);

        assert_eq!(outcome, ReconcileOutcome::Applied(ReconcileStats::default()));
        assert_eq!(surface.ops().len(), ops_after_first);
    }

    #[test]
    fn moved_entity_is_repositioned_not_recreated() {
        let mut surface = InMemorySurface::new();
        let mut reconciler = MarkerReconciler::new();
        let radar = active_radar(1000);
        let first = result(&[("a", 0.001)]);
        let second = result(&[("a", 0.002)]);

        reconciler.reconcile(&mut surface, &ProximityResult::empty(), &first, &radar);
        let handle = reconciler.handle_for(&EntityId::from("a")).unwrap();
        reconciler.reconcile(&mut surface, &first, &second, &radar);

        assert_eq!(reconciler.handle_for(&EntityId::from("a")), Some(handle));
        assert_eq!(surface.ops().last(), Some(&SurfaceOp::MoveMarker(handle)));
    }

    #[test]
    fn deferred_pass_catches_up() {
        let mut surface = InMemorySurface::not_ready();
        let mut reconciler = MarkerReconciler::new();
        let radar = active_radar(1000);
        let first = result(&[("a", 0.001), ("b", 0.002)]);

        let outcome = reconciler.reconcile(&mut surface, &ProximityResult::empty(), &first, &radar);
        assert_eq!(outcome, ReconcileOutcome::Deferred);
        assert!(reconciler.is_pending());
        assert!(surface.ops().is_empty());

        surface.set_ready(true);
        let second = result(&[("b", 0.002)]);
        let outcome = reconciler.reconcile(&mut surface, &first, &second, &radar);

        let ReconcileOutcome::Applied(stats) = outcome else {
            panic!("expected applied outcome");
        };
        assert_eq!(stats.created, 1);
        assert_eq!(stats.removed, 0);
        assert!(!reconciler.is_pending());
        assert_corresponds(&reconciler, &surface, &second);
    }

    #[test]
    fn overlay_follows_radar_state() {
        let mut surface = InMemorySurface::new();
        let mut reconciler = MarkerReconciler::new();
        let mut radar = RadarActivation::from_config(&RadarConfig::default());
        let empty = ProximityResult::empty();

        reconciler.reconcile(&mut surface, &empty, &empty, &radar.state());
        assert_eq!(surface.overlay_count(), 0);

        radar.activate(RadiusRequest::from(500)).unwrap();
        reconciler.reconcile(&mut surface, &empty, &empty, &radar.state());
        let first = reconciler.overlay().unwrap();
        assert_eq!(surface.overlays()[&first].radius_meters, 500);

        radar.change_radius(RadiusRequest::from(800)).unwrap();
        reconciler.reconcile(&mut surface, &empty, &empty, &radar.state());
        let second = reconciler.overlay().unwrap();
        assert_ne!(first, second);
        assert_eq!(surface.overlay_count(), 1);
        assert_eq!(surface.overlays()[&second].radius_meters, 800);

        radar.deactivate();
        reconciler.reconcile(&mut surface, &empty, &empty, &radar.state());
        assert_eq!(reconciler.overlay(), None);
        assert_eq!(surface.overlay_count(), 0);
    }

    #[test]
    fn self_marker_is_replaced_on_center_change() {
        let mut surface = InMemorySurface::new();
        let mut reconciler = MarkerReconciler::new();
        let mut radar = RadarActivation::from_config(&RadarConfig::default());
        let empty = ProximityResult::empty();

        reconciler.reconcile(&mut surface, &empty, &empty, &radar.state());
        let first = reconciler.self_marker().unwrap();

        radar.set_center(coord(10.0, 10.0));
        reconciler.reconcile(&mut surface, &empty, &empty, &radar.state());
        let second = reconciler.self_marker().unwrap();

        assert_ne!(first, second);
        assert_eq!(surface.self_marker_count(), 1);
        assert_eq!(surface.marker(second).unwrap().coordinate, coord(10.0, 10.0));
    }

    #[test]
    fn clicks_become_selection_events() {
        let mut surface = InMemorySurface::new();
        let mut reconciler = MarkerReconciler::new();
        let next = result(&[("a", 0.001), ("b", 0.002)]);
        reconciler.reconcile(&mut surface, &ProximityResult::empty(), &next, &active_radar(1000));

        let b = reconciler.handle_for(&EntityId::from("b")).unwrap();
        assert!(surface.click(b));
        assert!(!surface.click(reconciler.self_marker().unwrap()));

        let events = reconciler.take_selection_events();
        assert_eq!(events, [SelectionEvent { entity_id: EntityId::from("b") }]);
        assert!(reconciler.take_selection_events().is_empty());
    }

    #[test]
    fn stop_clears_everything_and_is_idempotent() {
        let mut surface = InMemorySurface::new();
        let mut reconciler = MarkerReconciler::new();
        let next = result(&[("a", 0.001)]);
        reconciler.reconcile(&mut surface, &ProximityResult::empty(), &next, &active_radar(1000));

        reconciler.stop(&mut surface);
        assert_eq!(surface.marker_count(), 0);
        assert_eq!(surface.overlay_count(), 0);
        assert_eq!(reconciler.marker_count(), 0);

        let ops = surface.ops().len();
        reconciler.stop(&mut surface);
        assert_eq!(surface.ops().len(), ops);
    }
}
