//! Device location tracking.
//!
//! The [`LocationTracker`] is the single owner of the current device
//! location. Before any fix arrives it reports a configured default center,
//! so the radar is always usable.
//!
//! Fix acquisition is the only asynchronous step in the radar. [`start`]
//! spawns it on the tokio runtime and hands results back through a channel;
//! the owner picks them up with [`poll`] or [`next_outcome`] whenever it is
//! ready, so marker reconciliation never waits on the sensor. Failures and
//! timeouts are logged and otherwise ignored.
//!
//! [`start`]: LocationTracker::start
//! [`poll`]: LocationTracker::poll
//! [`next_outcome`]: LocationTracker::next_outcome

use std::time::Duration;

use thirdeye_types::{Coordinate, Fix};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::RadarConfig;
use crate::sensor::{FixOptions, LocationSensor, SensorError};

/// Receives every fix the tracker records.
pub trait FixListener: Send {
    /// Called after a fix has been stored as the current location.
    fn on_fix(&mut self, fix: &Fix);
}

/// Owner of the current device location.
pub struct LocationTracker {
    /// Reported until the first fix arrives.
    default_center: Coordinate,
    /// Most recent successful fix.
    last_fix: Option<Fix>,
    /// Options passed to every sensor request.
    options: FixOptions,
    /// Period for repeated acquisition, if enabled.
    reacquire_interval: Option<Duration>,
    /// Registered fix listeners.
    listeners: Vec<Box<dyn FixListener>>,
    /// Outcomes from the acquisition task.
    outcomes: Option<mpsc::UnboundedReceiver<Result<Fix, SensorError>>>,
    /// The acquisition task, while running.
    task: Option<JoinHandle<()>>,
}

impl core::fmt::Debug for LocationTracker {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LocationTracker")
            .field("default_center", &self.default_center)
            .field("last_fix", &self.last_fix)
            .field("options", &self.options)
            .field("reacquire_interval", &self.reacquire_interval)
            .field("listeners", &self.listeners.len())
            .field("running", &self.is_running())
            .finish()
    }
}

impl LocationTracker {
    /// Create a tracker that reports `default_center` until a fix arrives.
    pub const fn new(default_center: Coordinate, options: FixOptions) -> Self {
        Self {
            default_center,
            last_fix: None,
            options,
            reacquire_interval: None,
            listeners: Vec::new(),
            outcomes: None,
            task: None,
        }
    }

    /// Create a tracker from the map and sensor sections of the config.
    pub fn from_config(config: &RadarConfig) -> Self {
        let mut tracker = Self::new(config.map.default_center, FixOptions::from(&config.sensor));
        tracker.reacquire_interval = config.sensor.reacquire_interval();
        tracker
    }

    /// Request a new fix every `interval` after the first attempt.
    #[must_use]
    pub fn with_reacquire_interval(mut self, interval: Duration) -> Self {
        self.reacquire_interval = Some(interval);
        self
    }

    /// The last known location, or the default center before any fix.
    pub fn current(&self) -> Coordinate {
        self.last_fix
            .map_or(self.default_center, |fix| fix.coordinate)
    }

    /// The most recent fix, if any.
    pub const fn last_fix(&self) -> Option<&Fix> {
        self.last_fix.as_ref()
    }

    /// Whether an acquisition task is running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Register a listener for fix events.
    pub fn subscribe(&mut self, listener: Box<dyn FixListener>) {
        self.listeners.push(listener);
    }

    /// Store a fix as the current location and notify listeners.
    pub fn record_fix(&mut self, fix: Fix) {
        info!(
            location = %fix.coordinate,
            acquired_at = %fix.acquired_at,
            "Location fix recorded"
        );
        self.last_fix = Some(fix);
        for listener in &mut self.listeners {
            listener.on_fix(&fix);
        }
    }

    /// Start acquiring fixes from `sensor` in the background.
    ///
    /// One best-effort fix is requested; if a re-acquisition interval is
    /// configured the request repeats on that period until [`stop`] is
    /// called. Calling `start` while already running does nothing. Returns
    /// whether a task was started; outside a tokio runtime nothing can be
    /// spawned and the tracker stays at its current location.
    ///
    /// [`stop`]: LocationTracker::stop
    pub fn start<S>(&mut self, sensor: S) -> bool
    where
        S: LocationSensor + 'static,
    {
        if self.is_running() {
            debug!("Location tracker already running");
            return false;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime available, location fix not requested");
            return false;
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let options = self.options;
        let interval = self.reacquire_interval;
        let task = runtime.spawn(run_acquisition(sensor, options, interval, tx));

        self.outcomes = Some(rx);
        self.task = Some(task);
        info!(
            high_accuracy = options.high_accuracy,
            timeout_ms = options.timeout_ms(),
            reacquire = interval.is_some(),
            "Location tracker started"
        );
        true
    }

    /// Record every outcome that has already arrived, without waiting.
    ///
    /// Returns the newest fix recorded by this call, if any.
    pub fn poll(&mut self) -> Option<Fix> {
        let mut newest = None;
        while let Some(outcome) = self.outcomes.as_mut().and_then(|rx| rx.try_recv().ok()) {
            if let Some(fix) = self.absorb(outcome) {
                newest = Some(fix);
            }
        }
        newest
    }

    /// Wait for the next acquisition outcome and record it.
    ///
    /// Returns `None` once the tracker is stopped or the acquisition task
    /// has finished and every outcome has been consumed.
    pub async fn next_outcome(&mut self) -> Option<Result<Fix, SensorError>> {
        let outcome = self.outcomes.as_mut()?.recv().await?;
        self.absorb(outcome.clone());
        Some(outcome)
    }

    /// Stop acquisition and drop any undelivered outcomes. Safe to call
    /// repeatedly.
    pub fn stop(&mut self) {
        let was_running = self.task.is_some();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.outcomes = None;
        if was_running {
            info!("Location tracker stopped");
        }
    }

    fn absorb(&mut self, outcome: Result<Fix, SensorError>) -> Option<Fix> {
        match outcome {
            Ok(fix) => {
                self.record_fix(fix);
                Some(fix)
            }
            Err(err) => {
                warn!(
                    %err,
                    fallback = %self.current(),
                    "Location fix failed, keeping last known location"
                );
                None
            }
        }
    }
}

impl Drop for LocationTracker {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Request one fix from `sensor`, enforcing `options.timeout`.
///
/// # Errors
///
/// Returns the sensor's own error, or [`SensorError::Timeout`] if no answer
/// arrives in time.
pub async fn acquire_fix<S>(sensor: &mut S, options: FixOptions) -> Result<Fix, SensorError>
where
    S: LocationSensor,
{
    let coordinate = tokio::time::timeout(options.timeout, sensor.request_current_position(options))
        .await
        .map_err(|_elapsed| SensorError::Timeout {
            timeout_ms: options.timeout_ms(),
        })??;
    Ok(Fix::now(coordinate))
}

async fn run_acquisition<S>(
    mut sensor: S,
    options: FixOptions,
    interval: Option<Duration>,
    tx: mpsc::UnboundedSender<Result<Fix, SensorError>>,
) where
    S: LocationSensor,
{
    loop {
        let outcome = acquire_fix(&mut sensor, options).await;
        if tx.send(outcome).is_err() {
            // Receiver dropped: the tracker was stopped.
            break;
        }
        let Some(period) = interval else { break };
        tokio::time::sleep(period).await;
    }
}
