//! The entity shown in the detail popover.
//!
//! At most one entity is selected. After every recompute the session runs
//! [`SelectionState::reconcile_with`] so the popover never shows a distance
//! older than the latest result.

use thirdeye_types::{ProximityResult, SelectedEntity, StaleSelectionPolicy, TrackedEntity};
use tracing::debug;

/// What a reconcile pass did to the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionUpdate {
    /// Nothing was selected.
    Unchanged,
    /// The selected entity is still in range; its data was refreshed.
    Refreshed,
    /// The selected entity left the result and the selection was dropped.
    Cleared,
    /// The selected entity left the result; last-known data was kept.
    KeptStale,
}

/// Current selection, if any.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    current: Option<SelectedEntity>,
}

impl SelectionState {
    /// An empty selection.
    pub const fn new() -> Self {
        Self { current: None }
    }

    /// Select an entity, replacing any previous selection.
    pub fn select(&mut self, entity: TrackedEntity, distance_meters: u32) {
        debug!(entity_id = %entity.id, distance_meters, "Entity selected");
        self.current = Some(SelectedEntity {
            entity,
            distance_meters,
        });
    }

    /// Drop the selection. Returns whether anything was selected.
    pub fn clear(&mut self) -> bool {
        self.current.take().is_some()
    }

    /// The selected entity.
    pub const fn current(&self) -> Option<&SelectedEntity> {
        self.current.as_ref()
    }

    /// Bring the selection in line with a fresh result.
    pub fn reconcile_with(
        &mut self,
        result: &ProximityResult,
        policy: StaleSelectionPolicy,
    ) -> SelectionUpdate {
        let Some(selected) = self.current.as_mut() else {
            return SelectionUpdate::Unchanged;
        };

        if let Some(entry) = result.get(&selected.entity.id) {
            selected.entity = entry.entity.clone();
            selected.distance_meters = entry.distance_meters;
            return SelectionUpdate::Refreshed;
        }

        match policy {
            StaleSelectionPolicy::Clear => {
                debug!(entity_id = %selected.entity.id, "Selected entity left range; clearing");
                self.current = None;
                SelectionUpdate::Cleared
            }
            StaleSelectionPolicy::Keep => SelectionUpdate::KeptStale,
        }
    }
}
