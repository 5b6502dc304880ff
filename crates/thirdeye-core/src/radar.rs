//! Radar activation state machine.
//!
//! The radar is either `Off` or `Active`. While active it carries a search
//! radius, always inside `[min, max]`. Radius requests arrive as user text
//! and go through [`RadiusRequest::parse`] before they reach the state
//! machine, so a request that cannot be understood never changes state.
//!
//! ```text
//!   Off --activate(r)--> Active --change_radius(r)--> Active
//!    ^                     |
//!    +----deactivate()-----+
//! ```

use std::str::FromStr;

use serde::Serialize;
use thirdeye_types::{Coordinate, EntityId, RadarStatus};
use tracing::info;

use crate::config::RadarConfig;

/// Errors raised by radar state changes. State is preserved on every error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RadarError {
    /// The radius input is not a whole number of meters.
    #[error("invalid radius {input:?}: {reason}")]
    InvalidRadius {
        /// The rejected input, as given.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The requested action is not allowed in the current state.
    #[error("cannot {action} while radar is {status}")]
    InvalidTransition {
        /// State the radar was in.
        status: RadarStatus,
        /// The rejected action.
        action: &'static str,
    },

    /// The supplied entity set contains the same identifier twice.
    #[error("duplicate entity id: {0}")]
    DuplicateEntity(EntityId),
}

/// A parsed radius request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadiusRequest {
    /// No value given; keep the current radius.
    Keep,
    /// A whole number of meters, not yet clamped.
    Meters(i64),
}

impl RadiusRequest {
    /// Parse user input.
    ///
    /// Blank input means [`RadiusRequest::Keep`]. Integers that overflow
    /// `i64` saturate, since they clamp to a bound anyway.
    ///
    /// # Errors
    ///
    /// Returns [`RadarError::InvalidRadius`] for anything that is not an
    /// optionally signed run of ASCII digits.
    pub fn parse(input: &str) -> Result<Self, RadarError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(Self::Keep);
        }

        let (negative, digits) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, trimmed.get(1..).unwrap_or_default()),
            Some(b'+') => (false, trimmed.get(1..).unwrap_or_default()),
            _ => (false, trimmed),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RadarError::InvalidRadius {
                input: input.to_owned(),
                reason: String::from("expected a whole number of meters"),
            });
        }

        let meters = trimmed.parse::<i64>().unwrap_or(if negative {
            i64::MIN
        } else {
            i64::MAX
        });
        Ok(Self::Meters(meters))
    }
}

impl FromStr for RadiusRequest {
    type Err = RadarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<u32> for RadiusRequest {
    fn from(meters: u32) -> Self {
        Self::Meters(i64::from(meters))
    }
}

/// Inclusive bounds for the search radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadiusLimits {
    /// Smallest allowed radius in meters.
    pub min_meters: u32,
    /// Largest allowed radius in meters.
    pub max_meters: u32,
}

impl RadiusLimits {
    /// Clamp a requested value into the bounds.
    pub fn clamp(self, requested: i64) -> u32 {
        let bounded = requested.clamp(i64::from(self.min_meters), i64::from(self.max_meters));
        u32::try_from(bounded).unwrap_or(self.max_meters)
    }
}

impl Default for RadiusLimits {
    fn default() -> Self {
        let radius = RadarConfig::default().radius;
        Self {
            min_meters: radius.min_meters,
            max_meters: radius.max_meters,
        }
    }
}

/// The radius a request resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RadiusAccepted {
    /// The radius now in effect.
    pub radius_meters: u32,
    /// The raw value asked for, or `None` when the current radius was kept.
    pub requested: Option<i64>,
    /// Whether the requested value was moved to a bound.
    pub clamped: bool,
}

/// Snapshot of the radar, read by the engine and the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RadarState {
    status: RadarStatus,
    radius_meters: u32,
    center: Coordinate,
}

impl RadarState {
    /// Whether the radar is off or searching.
    pub const fn status(&self) -> RadarStatus {
        self.status
    }

    /// Shorthand for `status() == Active`.
    pub const fn is_active(&self) -> bool {
        matches!(self.status, RadarStatus::Active)
    }

    /// The current radius. Kept while off so reactivation can reuse it.
    pub const fn radius_meters(&self) -> u32 {
        self.radius_meters
    }

    /// The current center.
    pub const fn center(&self) -> Coordinate {
        self.center
    }
}

/// The radar activation state machine.
#[derive(Debug, Clone)]
pub struct RadarActivation {
    state: RadarState,
    limits: RadiusLimits,
}

impl RadarActivation {
    /// A radar that starts `Off` at `center` with `default_radius` offered.
    pub fn new(center: Coordinate, limits: RadiusLimits, default_radius: u32) -> Self {
        Self {
            state: RadarState {
                status: RadarStatus::Off,
                radius_meters: limits.clamp(i64::from(default_radius)),
                center,
            },
            limits,
        }
    }

    /// Build from configuration.
    pub fn from_config(config: &RadarConfig) -> Self {
        Self::new(
            config.map.default_center,
            RadiusLimits {
                min_meters: config.radius.min_meters,
                max_meters: config.radius.max_meters,
            },
            config.radius.default_meters,
        )
    }

    /// Current snapshot.
    pub const fn state(&self) -> RadarState {
        self.state
    }

    /// The radius bounds in force.
    pub const fn limits(&self) -> RadiusLimits {
        self.limits
    }

    /// Turn the radar on.
    ///
    /// # Errors
    ///
    /// Returns [`RadarError::InvalidTransition`] if already active.
    pub fn activate(&mut self, request: RadiusRequest) -> Result<RadiusAccepted, RadarError> {
        if self.state.is_active() {
            return Err(self.reject("activate"));
        }
        let accepted = self.resolve(request);
        self.state.status = RadarStatus::Active;
        self.state.radius_meters = accepted.radius_meters;
        info!(
            radius_meters = accepted.radius_meters,
            clamped = accepted.clamped,
            "Radar activated"
        );
        Ok(accepted)
    }

    /// Change the radius of an active radar.
    ///
    /// # Errors
    ///
    /// Returns [`RadarError::InvalidTransition`] if the radar is off.
    pub fn change_radius(&mut self, request: RadiusRequest) -> Result<RadiusAccepted, RadarError> {
        if !self.state.is_active() {
            return Err(self.reject("change radius"));
        }
        let accepted = self.resolve(request);
        let previous = self.state.radius_meters;
        self.state.radius_meters = accepted.radius_meters;
        info!(
            from = previous,
            to = accepted.radius_meters,
            clamped = accepted.clamped,
            "Radar radius changed"
        );
        Ok(accepted)
    }

    /// Turn the radar off. Returns `false` if it was already off.
    pub fn deactivate(&mut self) -> bool {
        if !self.state.is_active() {
            return false;
        }
        self.state.status = RadarStatus::Off;
        info!("Radar deactivated");
        true
    }

    /// Move the radar center.
    pub const fn set_center(&mut self, center: Coordinate) {
        self.state.center = center;
    }

    fn resolve(&self, request: RadiusRequest) -> RadiusAccepted {
        match request {
            RadiusRequest::Keep => RadiusAccepted {
                radius_meters: self.state.radius_meters,
                requested: None,
                clamped: false,
            },
            RadiusRequest::Meters(requested) => {
                let radius_meters = self.limits.clamp(requested);
                let clamped = i64::from(radius_meters) != requested;
                if clamped {
                    info!(
                        requested,
                        radius_meters,
                        min = self.limits.min_meters,
                        max = self.limits.max_meters,
                        "Radius request clamped"
                    );
                }
                RadiusAccepted {
                    radius_meters,
                    requested: Some(requested),
                    clamped,
                }
            }
        }
    }

    const fn reject(&self, action: &'static str) -> RadarError {
        RadarError::InvalidTransition {
            status: self.state.status,
            action,
        }
    }
}
