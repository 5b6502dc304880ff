//! Mock entity spawner for the demo.
//!
//! Seeds the radar with nearby users scattered randomly around the device,
//! then nudges each of them a little on every tick so markers enter, move,
//! and leave the radius.

use std::path::Path;

use rand::Rng;
use serde::Deserialize;
use thirdeye_types::{Coordinate, TrackedEntity};
use tracing::info;

use crate::error::DemoError;

// -----------------------------------------------------------------------
// Configuration
// -----------------------------------------------------------------------

/// The `demo` section of `thirdeye-config.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DemoConfig {
    /// Number of mock users to create.
    #[serde(default = "default_entity_count")]
    pub entity_count: u32,

    /// Largest initial offset from the device, in degrees per axis.
    #[serde(default = "default_jitter_degrees")]
    pub jitter_degrees: f64,

    /// Number of movement ticks to simulate.
    #[serde(default = "default_ticks")]
    pub ticks: u32,

    /// Delay between ticks in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl DemoConfig {
    /// Read the `demo` section from a config file. Missing file or section
    /// yields defaults.
    pub fn load(path: &Path) -> Result<Self, DemoError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| DemoError::Spawner {
            message: format!("failed to read config file: {e}"),
        })?;
        Self::parse(&contents)
    }

    /// Extract the `demo` section from a full config document.
    pub fn parse(yaml: &str) -> Result<Self, DemoError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: serde_yml::Value = serde_yml::from_str(yaml).map_err(|e| DemoError::Spawner {
            message: format!("failed to parse config YAML: {e}"),
        })?;
        let Some(section) = raw.get("demo") else {
            return Ok(Self::default());
        };
        let config: Self =
            serde_yml::from_value(section.clone()).map_err(|e| DemoError::Spawner {
                message: format!("failed to parse demo config: {e}"),
            })?;
        if !config.jitter_degrees.is_finite() || config.jitter_degrees <= 0.0 {
            return Err(DemoError::Spawner {
                message: format!("jitter_degrees must be positive, got {}", config.jitter_degrees),
            });
        }
        if config.tick_interval_ms == 0 {
            return Err(DemoError::Spawner {
                message: "tick_interval_ms must be greater than zero".to_owned(),
            });
        }
        Ok(config)
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            entity_count: default_entity_count(),
            jitter_degrees: default_jitter_degrees(),
            ticks: default_ticks(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

const fn default_entity_count() -> u32 {
    8
}

const fn default_jitter_degrees() -> f64 {
    0.005
}

const fn default_ticks() -> u32 {
    10
}

const fn default_tick_interval_ms() -> u64 {
    500
}

// -----------------------------------------------------------------------
// Name pool
// -----------------------------------------------------------------------

const NAME_POOL: &[&str] = &[
    "Ava", "Bilal", "Chen", "Dara", "Eun", "Farah", "Goran", "Hana", "Ines", "Jonas",
    "Kofi", "Lena", "Mateo", "Nia", "Oskar", "Priya", "Quinn", "Rafa", "Sina", "Tomas",
];

// -----------------------------------------------------------------------
// Spawning
// -----------------------------------------------------------------------

/// Scatter `config.entity_count` users around `center`.
pub fn spawn_entities<R: Rng>(
    config: &DemoConfig,
    center: Coordinate,
    rng: &mut R,
) -> Result<Vec<TrackedEntity>, DemoError> {
    let spread = config.jitter_degrees;
    let mut entities = Vec::new();
    for id in 0..u64::from(config.entity_count) {
        let name = pick_name(id)?;
        let coordinate = center.offset(
            rng.random_range(-spread..=spread),
            rng.random_range(-spread..=spread),
        )?;
        entities.push(TrackedEntity::new(
            id,
            name,
            coordinate,
            format!("avatars/{}.png", name.to_lowercase()),
        ));
    }
    info!(count = entities.len(), spread_degrees = spread, "Mock entities spawned");
    Ok(entities)
}

/// Move every entity by a small random step. Steps that would leave the
/// valid coordinate range are skipped for that entity.
pub fn drift<R: Rng>(entities: &mut [TrackedEntity], step_degrees: f64, rng: &mut R) {
    for entity in entities {
        let moved = entity.coordinate.offset(
            rng.random_range(-step_degrees..=step_degrees),
            rng.random_range(-step_degrees..=step_degrees),
        );
        if let Ok(coordinate) = moved {
            entity.coordinate = coordinate;
        }
    }
}

fn pick_name(id: u64) -> Result<&'static str, DemoError> {
    let len = u64::try_from(NAME_POOL.len()).map_err(|_conversion_err| DemoError::Spawner {
        message: String::from("name pool too large"),
    })?;
    let idx = id.checked_rem(len).and_then(|i| usize::try_from(i).ok());
    idx.and_then(|i| NAME_POOL.get(i).copied())
        .ok_or_else(|| DemoError::Spawner {
            message: format!("no name for entity {id}"),
        })
}
