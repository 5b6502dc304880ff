//! Device location sensor trait and stub implementations.
//!
//! The real sensor lives outside this crate (a browser geolocation API, a
//! platform location service). The [`LocationSensor`] trait abstracts it so
//! the tracker can be driven by anything that produces coordinates:
//!
//! - [`FixedSensor`] always reports one position, optionally after a delay.
//! - [`UnavailableSensor`] models a device with no location capability.
//! - [`ScriptedSensor`] replays a queue of outcomes, including fixes that
//!   never resolve, for tests and demos.

use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;

use thirdeye_types::Coordinate;

use crate::config::SensorConfig;

/// Errors a location sensor can report. None of them are fatal: the tracker
/// falls back to its default center.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SensorError {
    /// The device has no location capability.
    #[error("location sensor unavailable")]
    Unavailable,

    /// No fix arrived within the allowed time.
    #[error("location fix timed out after {timeout_ms}ms")]
    Timeout {
        /// The timeout that elapsed.
        timeout_ms: u64,
    },

    /// The user or platform denied location access.
    #[error("location access denied")]
    Denied,

    /// Any other sensor failure.
    #[error("location sensor failed: {message}")]
    Failed {
        /// Description of the failure.
        message: String,
    },
}

/// Options passed with every fix request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixOptions {
    /// Prefer accuracy over speed and power.
    pub high_accuracy: bool,
    /// Give up after this long.
    pub timeout: Duration,
}

impl FixOptions {
    /// The timeout in whole milliseconds, saturating.
    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

impl Default for FixOptions {
    fn default() -> Self {
        Self::from(&SensorConfig::default())
    }
}

impl From<&SensorConfig> for FixOptions {
    fn from(config: &SensorConfig) -> Self {
        Self {
            high_accuracy: config.high_accuracy,
            timeout: config.timeout(),
        }
    }
}

/// A source of device position fixes.
pub trait LocationSensor: Send {
    /// Request the current position once.
    ///
    /// Implementations should honor `options.timeout`, but callers must not
    /// rely on it: the tracker applies its own deadline as well.
    fn request_current_position(
        &mut self,
        options: FixOptions,
    ) -> impl Future<Output = Result<Coordinate, SensorError>> + Send;
}

/// A sensor that always reports the same position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedSensor {
    coordinate: Coordinate,
    delay: Duration,
}

impl FixedSensor {
    /// Report `coordinate` immediately.
    pub const fn new(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            delay: Duration::ZERO,
        }
    }

    /// Report after a simulated acquisition delay.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl LocationSensor for FixedSensor {
    async fn request_current_position(
        &mut self,
        _options: FixOptions,
    ) -> Result<Coordinate, SensorError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.coordinate)
    }
}

/// A sensor for devices without location support.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnavailableSensor;

impl LocationSensor for UnavailableSensor {
    async fn request_current_position(
        &mut self,
        _options: FixOptions,
    ) -> Result<Coordinate, SensorError> {
        Err(SensorError::Unavailable)
    }
}

/// One scripted sensor response.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedFix {
    /// Report this position.
    Position(Coordinate),
    /// Fail with this error.
    Error(SensorError),
    /// Never respond.
    Hang,
}

/// A sensor that replays a fixed sequence of responses.
///
/// Once the script is exhausted every request fails with
/// [`SensorError::Unavailable`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptedSensor {
    script: VecDeque<ScriptedFix>,
}

impl ScriptedSensor {
    /// Build a sensor from an ordered list of responses.
    pub fn new(script: impl IntoIterator<Item = ScriptedFix>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }

    /// Number of responses not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl LocationSensor for ScriptedSensor {
    async fn request_current_position(
        &mut self,
        _options: FixOptions,
    ) -> Result<Coordinate, SensorError> {
        match self.script.pop_front() {
            Some(ScriptedFix::Position(coordinate)) => Ok(coordinate),
            Some(ScriptedFix::Error(err)) => Err(err),
            Some(ScriptedFix::Hang) => std::future::pending().await,
            None => Err(SensorError::Unavailable),
        }
    }
}
