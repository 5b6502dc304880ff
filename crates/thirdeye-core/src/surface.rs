//! Rendering surface abstraction and an in-memory implementation.
//!
//! The map widget that actually draws tiles and pins is outside this crate.
//! [`RenderingSurface`] is the narrow set of capabilities the radar needs
//! from it: place, move, and remove markers, draw and remove circles, report
//! distances, and move the view.
//!
//! [`InMemorySurface`] records everything it is asked to do. Tests use its
//! operation log to check exactly which mutations a reconcile pass made, and
//! the demo binary uses it as a stand-in map.

use std::collections::BTreeMap;

use thirdeye_geo::{DistanceMetric, Haversine};
use thirdeye_types::{Coordinate, IconSpec, MarkerHandle, OverlayHandle};
use tracing::debug;

/// Invoked by the surface when the user clicks a marker.
pub type ClickHandler = Box<dyn Fn() + Send>;

/// Capabilities the radar consumes from the map widget.
///
/// Removing a handle the surface no longer knows must be a harmless no-op.
pub trait RenderingSurface: DistanceMetric {
    /// Whether the surface is initialized and can accept operations.
    fn is_ready(&self) -> bool;

    /// Place a marker and return its handle.
    fn create_marker(
        &mut self,
        coordinate: Coordinate,
        icon: IconSpec,
        on_click: Option<ClickHandler>,
    ) -> MarkerHandle;

    /// Remove a marker.
    fn remove_marker(&mut self, handle: MarkerHandle);

    /// Move an existing marker.
    fn set_marker_position(&mut self, handle: MarkerHandle, coordinate: Coordinate);

    /// Draw a circle of `radius_meters` around `center`.
    fn create_circle_overlay(&mut self, center: Coordinate, radius_meters: u32) -> OverlayHandle;

    /// Remove a circle overlay.
    fn remove_overlay(&mut self, handle: OverlayHandle);

    /// Center the view at the given zoom level.
    fn set_view(&mut self, center: Coordinate, zoom: u8);

    /// Recompute the surface's size after its container changed.
    fn invalidate_size(&mut self);
}

/// One recorded surface mutation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceOp {
    /// A marker was placed.
    CreateMarker(MarkerHandle),
    /// A marker was removed.
    RemoveMarker(MarkerHandle),
    /// A marker was moved.
    MoveMarker(MarkerHandle),
    /// A circle overlay was drawn.
    CreateOverlay(OverlayHandle),
    /// A circle overlay was removed.
    RemoveOverlay(OverlayHandle),
    /// The view was moved.
    SetView {
        /// New view center.
        center: Coordinate,
        /// New zoom level.
        zoom: u8,
    },
    /// The surface size was recomputed.
    InvalidateSize,
}

/// A marker held by the [`InMemorySurface`].
pub struct PlacedMarker {
    /// Current position.
    pub coordinate: Coordinate,
    /// How the marker is drawn.
    pub icon: IconSpec,
    on_click: Option<ClickHandler>,
}

impl core::fmt::Debug for PlacedMarker {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PlacedMarker")
            .field("coordinate", &self.coordinate)
            .field("icon", &self.icon)
            .field("clickable", &self.on_click.is_some())
            .finish()
    }
}

/// A circle overlay held by the [`InMemorySurface`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedOverlay {
    /// Circle center.
    pub center: Coordinate,
    /// Circle radius in meters.
    pub radius_meters: u32,
}

/// A rendering surface that keeps its state in memory.
#[derive(Debug)]
pub struct InMemorySurface {
    ready: bool,
    metric: Haversine,
    markers: BTreeMap<MarkerHandle, PlacedMarker>,
    overlays: BTreeMap<OverlayHandle, PlacedOverlay>,
    view: Option<(Coordinate, u8)>,
    ops: Vec<SurfaceOp>,
}

impl InMemorySurface {
    /// A ready surface using the haversine metric.
    pub fn new() -> Self {
        Self {
            ready: true,
            metric: Haversine::default(),
            markers: BTreeMap::new(),
            overlays: BTreeMap::new(),
            view: None,
            ops: Vec::new(),
        }
    }

    /// A surface that is not yet initialized.
    pub fn not_ready() -> Self {
        let mut surface = Self::new();
        surface.ready = false;
        surface
    }

    /// Mark the surface as initialized or torn down.
    pub const fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    /// All markers currently placed.
    pub const fn markers(&self) -> &BTreeMap<MarkerHandle, PlacedMarker> {
        &self.markers
    }

    /// Look up one marker.
    pub fn marker(&self, handle: MarkerHandle) -> Option<&PlacedMarker> {
        self.markers.get(&handle)
    }

    /// Number of markers placed, including the self marker.
    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Number of entity (avatar) markers placed.
    pub fn entity_marker_count(&self) -> usize {
        self.markers
            .values()
            .filter(|m| matches!(m.icon, IconSpec::Avatar { .. }))
            .count()
    }

    /// Number of self-position markers placed.
    pub fn self_marker_count(&self) -> usize {
        self.markers
            .values()
            .filter(|m| m.icon == IconSpec::SelfPosition)
            .count()
    }

    /// All circle overlays currently drawn.
    pub const fn overlays(&self) -> &BTreeMap<OverlayHandle, PlacedOverlay> {
        &self.overlays
    }

    /// Number of circle overlays drawn.
    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    /// The current view, once set.
    pub const fn view(&self) -> Option<(Coordinate, u8)> {
        self.view
    }

    /// Every mutation performed so far, oldest first.
    pub fn ops(&self) -> &[SurfaceOp] {
        &self.ops
    }

    /// Number of `invalidate_size` calls so far.
    pub fn invalidation_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, SurfaceOp::InvalidateSize))
            .count()
    }

    /// Simulate a user click on a marker. Returns whether a handler ran.
    pub fn click(&self, handle: MarkerHandle) -> bool {
        match self.markers.get(&handle).and_then(|m| m.on_click.as_ref()) {
            Some(handler) => {
                handler();
                true
            }
            None => false,
        }
    }
}

impl Default for InMemorySurface {
    fn default() -> Self {
        Self::new()
    }
}

impl DistanceMetric for InMemorySurface {
    fn distance_between(&self, a: Coordinate, b: Coordinate) -> f64 {
        self.metric.distance_between(a, b)
    }
}

impl RenderingSurface for InMemorySurface {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn create_marker(
        &mut self,
        coordinate: Coordinate,
        icon: IconSpec,
        on_click: Option<ClickHandler>,
    ) -> MarkerHandle {
        let handle = MarkerHandle::new();
        self.markers.insert(
            handle,
            PlacedMarker {
                coordinate,
                icon,
                on_click,
            },
        );
        self.ops.push(SurfaceOp::CreateMarker(handle));
        handle
    }

    fn remove_marker(&mut self, handle: MarkerHandle) {
        if self.markers.remove(&handle).is_some() {
            self.ops.push(SurfaceOp::RemoveMarker(handle));
        } else {
            debug!(%handle, "Ignoring removal of unknown marker");
        }
    }

    fn set_marker_position(&mut self, handle: MarkerHandle, coordinate: Coordinate) {
        if let Some(marker) = self.markers.get_mut(&handle) {
            marker.coordinate = coordinate;
            self.ops.push(SurfaceOp::MoveMarker(handle));
        }
    }

    fn create_circle_overlay(&mut self, center: Coordinate, radius_meters: u32) -> OverlayHandle {
        let handle = OverlayHandle::new();
        self.overlays.insert(
            handle,
            PlacedOverlay {
                center,
                radius_meters,
            },
        );
        self.ops.push(SurfaceOp::CreateOverlay(handle));
        handle
    }

    fn remove_overlay(&mut self, handle: OverlayHandle) {
        if self.overlays.remove(&handle).is_some() {
            self.ops.push(SurfaceOp::RemoveOverlay(handle));
        } else {
            debug!(%handle, "Ignoring removal of unknown overlay");
        }
    }

    fn set_view(&mut self, center: Coordinate, zoom: u8) {
        self.view = Some((center, zoom));
        self.ops.push(SurfaceOp::SetView { center, zoom });
    }

    fn invalidate_size(&mut self) {
        self.ops.push(SurfaceOp::InvalidateSize);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn coord(latitude: f64, longitude: f64) -> Coordinate {
        Coordinate::new(latitude, longitude).unwrap()
    }

    #[test]
    fn markers_round_trip_through_the_log() {
        let mut surface = InMemorySurface::new();
        let handle = surface.create_marker(coord(1.0, 1.0), IconSpec::SelfPosition, None);
        surface.set_marker_position(handle, coord(2.0, 2.0));
        surface.remove_marker(handle);

        assert_eq!(
            surface.ops(),
            [
                SurfaceOp::CreateMarker(handle),
                SurfaceOp::MoveMarker(handle),
                SurfaceOp::RemoveMarker(handle),
            ]
        );
        assert_eq!(surface.marker_count(), 0);
    }

    #[test]
    fn unknown_removals_are_ignored() {
        let mut surface = InMemorySurface::new();
        surface.remove_marker(MarkerHandle::new());
        surface.remove_overlay(OverlayHandle::new());
        assert!(surface.ops().is_empty());
    }

    #[test]
    fn clicks_invoke_the_handler() {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&hits);
        let mut surface = InMemorySurface::new();
        let icon = IconSpec::Avatar {
            avatar_ref: String::from("a.png"),
            label: String::from("Alice"),
        };
        let handle = surface.create_marker(
            coord(0.0, 0.0),
            icon,
            Some(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
        );

        assert!(surface.click(handle));
        assert!(!surface.click(MarkerHandle::new()));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(surface.entity_marker_count(), 1);
        assert_eq!(surface.self_marker_count(), 0);
    }

    #[test]
    fn distance_uses_haversine() {
        let surface = InMemorySurface::new();
        let d = surface.distance_between(coord(0.0, 0.0), coord(0.0, 0.005));
        assert!((d - 555.97).abs() < 0.5);
    }
}
