//! Identifier types.
//!
//! Entity identifiers are supplied by whatever data source feeds the radar,
//! so [`EntityId`] wraps an arbitrary string. Rendering-surface handles are
//! minted by the surface itself and use UUID v7 (time-ordered) wrappers.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_handle {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new handle using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

define_handle! {
    /// Handle to a point marker placed on the rendering surface.
    MarkerHandle
}

define_handle! {
    /// Handle to a circle overlay placed on the rendering surface.
    OverlayHandle
}

/// Stable identifier of a tracked entity.
///
/// Ordering is lexicographic on the underlying string, which gives the
/// proximity engine its deterministic tie-break.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct EntityId(String);

impl EntityId {
    /// Wrap a caller-supplied identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for EntityId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_unique() {
        let a = MarkerHandle::new();
        let b = MarkerHandle::new();
        assert_ne!(a, b);
        assert_ne!(a.into_inner(), Uuid::nil());
    }

    #[test]
    fn entity_ids_order_lexicographically() {
        let mut ids = vec![EntityId::from("b"), EntityId::from("c"), EntityId::from("a")];
        ids.sort();
        let names: Vec<&str> = ids.iter().map(EntityId::as_str).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn entity_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&EntityId::from(7_u64)).ok();
        assert_eq!(json.as_deref(), Some("\"7\""));
    }
}
