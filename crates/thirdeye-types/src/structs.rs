//! Core value structs: entities, fixes, proximity results, and icon specs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;

use crate::geo::Coordinate;
use crate::ids::EntityId;

/// A point of interest the radar can find (another user in the app).
///
/// Entities are supplied by the caller. The radar only ever reads their
/// identity and coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TrackedEntity {
    /// Unique, stable identifier.
    pub id: EntityId,
    /// Name shown under the marker and in the detail popover.
    pub display_name: String,
    /// Where the entity currently is.
    pub coordinate: Coordinate,
    /// Opaque reference to the avatar image resource.
    pub avatar_ref: String,
}

impl TrackedEntity {
    /// Build an entity from its parts.
    pub fn new(
        id: impl Into<EntityId>,
        display_name: impl Into<String>,
        coordinate: Coordinate,
        avatar_ref: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            coordinate,
            avatar_ref: avatar_ref.into(),
        }
    }
}

/// A single device location report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Fix {
    /// The reported position.
    pub coordinate: Coordinate,
    /// When the sensor produced the position.
    pub acquired_at: DateTime<Utc>,
}

impl Fix {
    /// Stamp a coordinate with the current time.
    pub fn now(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            acquired_at: Utc::now(),
        }
    }
}

/// One entity inside the search radius, with its distance from the center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ProximityEntry {
    /// The entity in range.
    pub entity: TrackedEntity,
    /// Distance from the radar center, rounded to the nearest meter.
    pub distance_meters: u32,
}

/// The ordered set of entities currently inside the search radius.
///
/// Entries are always sorted ascending by `distance_meters`, ties broken by
/// entity identifier. The ordering is enforced on construction, including
/// deserialization. Ordering uses the whole-meter distance, so entities that
/// round to the same meter are ordered by identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, TS)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct ProximityResult {
    entries: Vec<ProximityEntry>,
}

impl ProximityResult {
    /// Build a result, sorting entries into canonical order.
    pub fn new(mut entries: Vec<ProximityEntry>) -> Self {
        entries.sort_by(|a, b| {
            a.distance_meters
                .cmp(&b.distance_meters)
                .then_with(|| a.entity.id.cmp(&b.entity.id))
        });
        Self { entries }
    }

    /// An empty result (radar off or nothing in range).
    pub const fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// All entries in canonical order.
    pub fn entries(&self) -> &[ProximityEntry] {
        &self.entries
    }

    /// Iterate over entries in canonical order.
    pub fn iter(&self) -> core::slice::Iter<'_, ProximityEntry> {
        self.entries.iter()
    }

    /// Number of entities in range.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is in range.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the entry for one entity.
    pub fn get(&self, id: &EntityId) -> Option<&ProximityEntry> {
        self.entries.iter().find(|entry| entry.entity.id == *id)
    }

    /// Whether the entity is in range.
    pub fn contains(&self, id: &EntityId) -> bool {
        self.get(id).is_some()
    }

    /// Identifiers in canonical order.
    pub fn ids(&self) -> impl Iterator<Item = &EntityId> {
        self.entries.iter().map(|entry| &entry.entity.id)
    }
}

impl<'de> Deserialize<'de> for ProximityResult {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Vec::<ProximityEntry>::deserialize(deserializer).map(Self::new)
    }
}

impl<'a> IntoIterator for &'a ProximityResult {
    type Item = &'a ProximityEntry;
    type IntoIter = core::slice::Iter<'a, ProximityEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// The entity currently shown in the detail popover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SelectedEntity {
    /// The selected entity as last seen.
    pub entity: TrackedEntity,
    /// Distance from the radar center when last refreshed.
    pub distance_meters: u32,
}

/// How a marker should be drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum IconSpec {
    /// The pulsing "you are here" pin, drawn above entity markers.
    SelfPosition,
    /// An entity avatar with its name underneath.
    Avatar {
        /// Avatar image reference.
        avatar_ref: String,
        /// Caption under the avatar.
        label: String,
    },
}

impl IconSpec {
    /// Avatar icon for an entity.
    pub fn for_entity(entity: &TrackedEntity) -> Self {
        Self::Avatar {
            avatar_ref: entity.avatar_ref.clone(),
            label: entity.display_name.clone(),
        }
    }
}
