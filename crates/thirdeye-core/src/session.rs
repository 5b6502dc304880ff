//! The radar session: one owner for every piece of radar state.
//!
//! [`RadarSession`] holds the configuration, the rendering surface, the
//! location tracker, the activation state machine, the marker reconciler,
//! the selection, and the supplied entity set. Every trigger (a new fix, a
//! radius change, a new entity set) is a `&mut self` method that runs the
//! proximity engine and the reconciler to completion before it returns, so
//! two recomputations can never overlap and surface operations never
//! interleave.
//!
//! The session reconciles at the configured default center until the first
//! fix arrives.

use std::collections::BTreeSet;

use thirdeye_types::{
    Coordinate, EntityId, Fix, ProximityResult, SelectedEntity, TrackedEntity,
};
use tracing::{debug, info};

use crate::config::RadarConfig;
use crate::radar::{RadarActivation, RadarError, RadarState, RadiusAccepted, RadiusRequest};
use crate::reconciler::{MarkerReconciler, ReconcileOutcome};
use crate::selection::{SelectionState, SelectionUpdate};
use crate::sensor::{LocationSensor, SensorError};
use crate::surface::RenderingSurface;
use crate::tracker::LocationTracker;

/// Summary of one recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecomputeReport {
    /// Number of entities in range.
    pub in_range: usize,
    /// What the reconciler did to the surface.
    pub outcome: ReconcileOutcome,
    /// What happened to the selection.
    pub selection: SelectionUpdate,
}

/// Owns and drives one radar view.
#[derive(Debug)]
pub struct RadarSession<S: RenderingSurface> {
    config: RadarConfig,
    surface: S,
    tracker: LocationTracker,
    radar: RadarActivation,
    reconciler: MarkerReconciler,
    selection: SelectionState,
    entities: Vec<TrackedEntity>,
    result: ProximityResult,
    pending_view: Option<(Coordinate, u8)>,
    resize_pending: bool,
}

impl<S: RenderingSurface> RadarSession<S> {
    /// Create a session drawing onto `surface`. Nothing is drawn until
    /// [`start`](Self::start).
    pub fn new(config: RadarConfig, surface: S) -> Self {
        Self {
            tracker: LocationTracker::from_config(&config),
            radar: RadarActivation::from_config(&config),
            reconciler: MarkerReconciler::new(),
            selection: SelectionState::new(),
            entities: Vec::new(),
            result: ProximityResult::empty(),
            pending_view: None,
            resize_pending: false,
            config,
            surface,
        }
    }

    /// Show the default view, place the self marker, and start locating the
    /// device with `sensor`.
    ///
    /// Returns whether background fix acquisition was started.
    pub fn start<L>(&mut self, sensor: L) -> bool
    where
        L: LocationSensor + 'static,
    {
        self.show(self.radar.state().center(), self.config.map.idle_zoom);
        self.recompute();
        self.tracker.start(sensor)
    }

    /// Stop location tracking and remove everything the radar drew. Safe to
    /// call repeatedly.
    pub fn stop(&mut self) {
        self.tracker.stop();
        self.reconciler.stop(&mut self.surface);
        self.pending_view = None;
        self.resize_pending = false;
    }

    /// Record a fix, move the radar and the view to it, and recompute.
    pub fn handle_fix(&mut self, fix: Fix) -> RecomputeReport {
        self.tracker.record_fix(fix);
        self.relocate(fix.coordinate)
    }

    /// Apply any fixes that have arrived since the last call.
    ///
    /// Returns the recompute report if a fix was applied.
    pub fn poll_location(&mut self) -> Option<RecomputeReport> {
        let fix = self.tracker.poll()?;
        Some(self.relocate(fix.coordinate))
    }

    /// Wait for the next fix outcome and apply it.
    ///
    /// Returns `None` once no further outcomes can arrive. A failed fix is
    /// passed through; the radar keeps its current center.
    pub async fn next_location_event(&mut self) -> Option<Result<RecomputeReport, SensorError>> {
        let outcome = self.tracker.next_outcome().await?;
        Some(outcome.map(|fix| self.relocate(fix.coordinate)))
    }

    /// Turn the radar on with a radius given as user text.
    pub fn activate(&mut self, input: &str) -> Result<RadiusAccepted, RadarError> {
        let accepted = self.radar.activate(RadiusRequest::parse(input)?)?;
        self.recompute();
        Ok(accepted)
    }

    /// Change the radius of the active radar.
    pub fn change_radius(&mut self, input: &str) -> Result<RadiusAccepted, RadarError> {
        let accepted = self.radar.change_radius(RadiusRequest::parse(input)?)?;
        self.recompute();
        Ok(accepted)
    }

    /// Turn the radar off, dropping the selection and every entity marker.
    ///
    /// Returns `false` if the radar was already off.
    pub fn deactivate(&mut self) -> bool {
        if !self.radar.deactivate() {
            return false;
        }
        let dropped = self.reconciler.take_selection_events().len();
        if dropped > 0 {
            debug!(dropped, "Discarded clicks queued before deactivation");
        }
        self.selection.clear();
        self.recompute();
        true
    }

    /// Replace the entity set and recompute.
    ///
    /// # Errors
    ///
    /// Returns [`RadarError::DuplicateEntity`] if two entities share an
    /// identifier; the previous set is kept.
    pub fn set_entities(
        &mut self,
        entities: Vec<TrackedEntity>,
    ) -> Result<RecomputeReport, RadarError> {
        if let Some(duplicate) = first_duplicate(&entities) {
            return Err(RadarError::DuplicateEntity(duplicate));
        }
        debug!(count = entities.len(), "Entity set replaced");
        self.entities = entities;
        Ok(self.recompute())
    }

    /// Turn marker clicks into a selection.
    ///
    /// Only entities in the current result can be selected; clicks on
    /// markers that have since been removed are dropped. Returns the
    /// selection after all pending clicks.
    pub fn process_marker_clicks(&mut self) -> Option<&SelectedEntity> {
        for event in self.reconciler.take_selection_events() {
            let Some(entry) = self.result.get(&event.entity_id) else {
                debug!(entity_id = %event.entity_id, "Clicked entity no longer in range");
                continue;
            };
            self.selection.select(entry.entity.clone(), entry.distance_meters);
        }
        self.selection.current()
    }

    /// Close the detail popover. Returns whether anything was selected.
    pub fn dismiss_selection(&mut self) -> bool {
        self.selection.clear()
    }

    /// The surface container changed size.
    ///
    /// Applied at once on a ready surface, otherwise after the next
    /// reconcile that reaches the surface.
    pub fn handle_resize(&mut self) {
        if self.surface.is_ready() {
            self.surface.invalidate_size();
        } else {
            debug!("Surface not ready; resize deferred");
            self.resize_pending = true;
        }
    }

    /// Run the proximity engine and bring surface and selection in line.
    pub fn recompute(&mut self) -> RecomputeReport {
        let state = self.radar.state();
        let next = if state.is_active() {
            thirdeye_geo::compute(
                state.center(),
                state.radius_meters(),
                &self.entities,
                &self.surface,
            )
        } else {
            ProximityResult::empty()
        };

        let outcome = self
            .reconciler
            .reconcile(&mut self.surface, &self.result, &next, &state);
        if outcome.is_applied() {
            self.flush_deferred();
        }

        self.result = next;
        let selection = self
            .selection
            .reconcile_with(&self.result, self.config.selection.stale_policy);

        RecomputeReport {
            in_range: self.result.len(),
            outcome,
            selection,
        }
    }

    /// Current radar snapshot.
    pub const fn radar(&self) -> RadarState {
        self.radar.state()
    }

    /// Entities in range as of the last recompute.
    pub const fn result(&self) -> &ProximityResult {
        &self.result
    }

    /// The selected entity.
    pub const fn selection(&self) -> Option<&SelectedEntity> {
        self.selection.current()
    }

    /// The supplied entity set.
    pub fn entities(&self) -> &[TrackedEntity] {
        &self.entities
    }

    /// The location tracker.
    pub const fn tracker(&self) -> &LocationTracker {
        &self.tracker
    }

    /// Mutable access to the tracker, e.g. to subscribe listeners.
    pub const fn tracker_mut(&mut self) -> &mut LocationTracker {
        &mut self.tracker
    }

    /// The marker reconciler.
    pub const fn reconciler(&self) -> &MarkerReconciler {
        &self.reconciler
    }

    /// The rendering surface.
    pub const fn surface(&self) -> &S {
        &self.surface
    }

    /// Mutable access to the surface.
    pub const fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// The configuration this session was built from.
    pub const fn config(&self) -> &RadarConfig {
        &self.config
    }

    fn relocate(&mut self, center: Coordinate) -> RecomputeReport {
        self.radar.set_center(center);
        self.show(center, self.config.map.located_zoom);
        let report = self.recompute();
        info!(
            location = %center,
            in_range = report.in_range,
            "Radar recentered on device location"
        );
        report
    }

    fn show(&mut self, center: Coordinate, zoom: u8) {
        if self.surface.is_ready() {
            self.surface.set_view(center, zoom);
        } else {
            self.pending_view = Some((center, zoom));
        }
    }

    fn flush_deferred(&mut self) {
        if let Some((center, zoom)) = self.pending_view.take() {
            self.surface.set_view(center, zoom);
        }
        if core::mem::take(&mut self.resize_pending) {
            self.surface.invalidate_size();
        }
    }
}

fn first_duplicate(entities: &[TrackedEntity]) -> Option<EntityId> {
    let mut seen = BTreeSet::new();
    entities
        .iter()
        .find(|e| !seen.insert(&e.id))
        .map(|e| e.id.clone())
}
