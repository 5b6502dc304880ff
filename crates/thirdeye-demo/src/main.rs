//! Demo binary for the Third Eye proximity radar.
//!
//! Drives a [`RadarSession`] over an in-memory map with a simulated device
//! and a handful of mock users wandering around it, logging what the radar
//! sees on every tick.
//!
//! # Run Sequence
//!
//! 1. Load configuration from `thirdeye-config.yaml` (defaults if absent)
//! 2. Initialize structured logging (tracing)
//! 3. Start the session and wait for the simulated device fix
//! 4. Spawn mock users around the device and activate the radar
//! 5. Move users every tick, clicking the nearest marker each time
//! 6. Narrow the radius halfway through
//! 7. Deactivate and tear down

mod error;
mod fix_logger;
mod spawner;

use std::path::Path;
use std::time::Duration;

use rand::Rng;
use thirdeye_core::config::RadarConfig;
use thirdeye_core::sensor::FixedSensor;
use thirdeye_core::session::{RadarSession, RecomputeReport};
use thirdeye_core::surface::InMemorySurface;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::DemoError;
use crate::fix_logger::FixLogger;
use crate::spawner::DemoConfig;

const CONFIG_PATH: &str = "thirdeye-config.yaml";

/// Application entry point for the demo.
///
/// # Errors
///
/// Returns an error if configuration is invalid or a radar operation is
/// rejected.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = load_config()?;
    let demo = DemoConfig::load(Path::new(CONFIG_PATH))?;

    // 2. Initialize structured logging. RUST_LOG wins over the config.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!(
        min_meters = config.radius.min_meters,
        max_meters = config.radius.max_meters,
        default_meters = config.radius.default_meters,
        default_center = %config.map.default_center,
        stale_policy = ?config.selection.stale_policy,
        "thirdeye-demo starting"
    );

    // 3. Start the session against a simulated device near the default
    //    center.
    let mut rng = rand::rng();
    let device = config.map.default_center.offset(
        rng.random_range(-0.001..=0.001),
        rng.random_range(-0.001..=0.001),
    )?;
    let default_radius = config.radius.default_meters;
    let mut session = RadarSession::new(config, InMemorySurface::new());
    session.tracker_mut().subscribe(Box::new(FixLogger::new()));
    session.start(FixedSensor::new(device).with_delay(Duration::from_millis(300)));

    match session.next_location_event().await {
        Some(Ok(report)) => info!(in_range = report.in_range, "Located device"),
        Some(Err(err)) => warn!(%err, "Continuing at default center"),
        None => warn!("Location tracker produced no outcome"),
    }

    // 4. Spawn mock users and turn the radar on.
    let mut entities = spawner::spawn_entities(&demo, session.radar().center(), &mut rng)?;
    session.set_entities(entities.clone()).map_err(DemoError::from)?;
    let accepted = session
        .activate(&default_radius.to_string())
        .map_err(DemoError::from)?;
    info!(
        radius_meters = accepted.radius_meters,
        in_range = session.result().len(),
        "Radar on"
    );

    // 5-6. Tick loop.
    let step = demo.jitter_degrees / 5.0;
    let midpoint = demo.ticks.checked_div(2).unwrap_or_default();
    let mut ticker = tokio::time::interval(Duration::from_millis(demo.tick_interval_ms));
    for tick in 1..=demo.ticks {
        ticker.tick().await;

        spawner::drift(&mut entities, step, &mut rng);
        let report = session.set_entities(entities.clone()).map_err(DemoError::from)?;
        log_tick(tick, &session, report);

        click_nearest(&mut session);

        if tick == midpoint {
            let narrower = session.radar().radius_meters().checked_div(2).unwrap_or_default();
            let accepted = session
                .change_radius(&narrower.to_string())
                .map_err(DemoError::from)?;
            info!(
                radius_meters = accepted.radius_meters,
                clamped = accepted.clamped,
                "Radius narrowed"
            );
        }
    }

    // 7. Tear down.
    session.deactivate();
    session.stop();
    info!(
        surface_ops = session.surface().ops().len(),
        "thirdeye-demo finished"
    );

    Ok(())
}

fn log_tick(tick: u32, session: &RadarSession<InMemorySurface>, report: RecomputeReport) {
    let nearest = session
        .result()
        .entries()
        .first()
        .map(|entry| (entry.entity.display_name.as_str(), entry.distance_meters));
    info!(
        tick,
        in_range = report.in_range,
        markers = session.reconciler().marker_count(),
        nearest = ?nearest,
        outcome = ?report.outcome,
        "Radar tick"
    );
    debug!(
        result = %serde_json::to_string(session.result()).unwrap_or_default(),
        "Proximity result"
    );
}

/// Simulate the user tapping the closest marker.
fn click_nearest(session: &mut RadarSession<InMemorySurface>) {
    let handle = session
        .result()
        .entries()
        .first()
        .and_then(|entry| session.reconciler().handle_for(&entry.entity.id));
    if let Some(handle) = handle {
        session.surface().click(handle);
    }
    if let Some(selected) = session.process_marker_clicks() {
        info!(
            entity = %selected.entity.display_name,
            distance_meters = selected.distance_meters,
            "Selected"
        );
    }
}

/// Load configuration from `thirdeye-config.yaml`.
///
/// Falls back to defaults if the file does not exist.
fn load_config() -> Result<RadarConfig, DemoError> {
    let config_path = Path::new(CONFIG_PATH);
    if config_path.exists() {
        Ok(RadarConfig::from_file(config_path)?)
    } else {
        Ok(RadarConfig::default())
    }
}
