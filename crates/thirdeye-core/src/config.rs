//! Configuration loading and typed config structures for the radar.
//!
//! The configuration lives in a YAML file (`thirdeye-config.yaml` by
//! convention). Every section is optional; missing values fall back to the
//! defaults below, which match the behavior of the shipped web app. The
//! loader parses the file and then validates cross-field constraints such as
//! `min_meters <= default_meters <= max_meters`.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thirdeye_types::{Coordinate, StaleSelectionPolicy};

/// Smallest search radius a user may request, in meters.
pub const MIN_RADIUS_METERS: u32 = 50;
/// Largest search radius a user may request, in meters.
pub const MAX_RADIUS_METERS: u32 = 5000;
/// Highest zoom level accepted for map views.
pub const MAX_ZOOM: u8 = 22;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The file parsed but its values are inconsistent.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level radar configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RadarConfig {
    /// Search radius bounds and default.
    #[serde(default)]
    pub radius: RadiusConfig,

    /// Map view defaults.
    #[serde(default)]
    pub map: MapConfig,

    /// Device location sensor options.
    #[serde(default)]
    pub sensor: SensorConfig,

    /// Selection behavior.
    #[serde(default)]
    pub selection: SelectionConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RadarConfig {
    /// Load and validate configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if the values are inconsistent.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if the values are inconsistent.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let r = &self.radius;
        if r.min_meters == 0 {
            return Err(invalid("radius.min_meters must be at least 1"));
        }
        if r.min_meters > r.max_meters {
            return Err(invalid(format!(
                "radius.min_meters ({}) exceeds radius.max_meters ({})",
                r.min_meters, r.max_meters
            )));
        }
        if !(r.min_meters..=r.max_meters).contains(&r.default_meters) {
            return Err(invalid(format!(
                "radius.default_meters ({}) is outside [{}, {}]",
                r.default_meters, r.min_meters, r.max_meters
            )));
        }
        if self.map.idle_zoom > MAX_ZOOM || self.map.located_zoom > MAX_ZOOM {
            return Err(invalid(format!("map zoom levels must be at most {MAX_ZOOM}")));
        }
        if self.sensor.timeout_ms == 0 {
            return Err(invalid("sensor.timeout_ms must be at least 1"));
        }
        if self.sensor.reacquire_interval_ms == Some(0) {
            return Err(invalid("sensor.reacquire_interval_ms must be at least 1 when set"));
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.into(),
    }
}

/// Search radius bounds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RadiusConfig {
    /// Lower clamp bound in meters.
    #[serde(default = "default_min_meters")]
    pub min_meters: u32,

    /// Upper clamp bound in meters.
    #[serde(default = "default_max_meters")]
    pub max_meters: u32,

    /// Radius offered before the user picks one.
    #[serde(default = "default_radius_meters")]
    pub default_meters: u32,
}

impl Default for RadiusConfig {
    fn default() -> Self {
        Self {
            min_meters: default_min_meters(),
            max_meters: default_max_meters(),
            default_meters: default_radius_meters(),
        }
    }
}

/// Map view defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MapConfig {
    /// Center used before any device fix arrives.
    #[serde(default = "default_center")]
    pub default_center: Coordinate,

    /// Zoom level while no fix is available.
    #[serde(default = "default_idle_zoom")]
    pub idle_zoom: u8,

    /// Zoom level once the device has been located.
    #[serde(default = "default_located_zoom")]
    pub located_zoom: u8,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            default_center: default_center(),
            idle_zoom: default_idle_zoom(),
            located_zoom: default_located_zoom(),
        }
    }
}

/// Device location sensor options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SensorConfig {
    /// Ask the sensor for its most accurate (and slowest) mode.
    #[serde(default = "default_true")]
    pub high_accuracy: bool,

    /// How long to wait for a fix before giving up.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// If set, request a fresh fix this often after the first attempt.
    #[serde(default)]
    pub reacquire_interval_ms: Option<u64>,
}

impl SensorConfig {
    /// The fix timeout as a [`Duration`].
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The re-acquisition period, if any.
    pub fn reacquire_interval(&self) -> Option<Duration> {
        self.reacquire_interval_ms.map(Duration::from_millis)
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            high_accuracy: default_true(),
            timeout_ms: default_timeout_ms(),
            reacquire_interval_ms: None,
        }
    }
}

/// Selection behavior.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SelectionConfig {
    /// What to do with a selection whose entity left the radius.
    #[serde(default)]
    pub stale_policy: StaleSelectionPolicy,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

const fn default_min_meters() -> u32 {
    MIN_RADIUS_METERS
}

const fn default_max_meters() -> u32 {
    MAX_RADIUS_METERS
}

const fn default_radius_meters() -> u32 {
    1000
}

fn default_center() -> Coordinate {
    Coordinate::new(51.505, -0.09).unwrap_or(Coordinate::ORIGIN)
}

const fn default_idle_zoom() -> u8 {
    13
}

const fn default_located_zoom() -> u8 {
    16
}

const fn default_timeout_ms() -> u64 {
    10_000
}

fn default_log_level() -> String {
    String::from("info")
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = RadarConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.radius.min_meters, 50);
        assert_eq!(config.radius.max_meters, 5000);
        assert_eq!(config.radius.default_meters, 1000);
        assert_eq!(config.map.idle_zoom, 13);
        assert_eq!(config.map.located_zoom, 16);
        assert_eq!(config.sensor.timeout(), Duration::from_secs(10));
        assert!(config.sensor.high_accuracy);
        assert_eq!(config.selection.stale_policy, StaleSelectionPolicy::Clear);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r"
radius:
  min_meters: 100
  max_meters: 2000
  default_meters: 500

map:
  default_center:
    latitude: 40.4168
    longitude: -3.7038
  idle_zoom: 12
  located_zoom: 17

sensor:
  high_accuracy: false
  timeout_ms: 3000
  reacquire_interval_ms: 15000

selection:
  stale_policy: keep

logging:
  level: debug

demo:
  entity_count: 4
";

        let config = RadarConfig::parse(yaml);
        assert!(config.is_ok(), "{config:?}");
        let config = config.ok().unwrap_or_default();

        assert_eq!(config.radius.default_meters, 500);
        assert_eq!(config.map.located_zoom, 17);
        assert!(!config.sensor.high_accuracy);
        assert_eq!(config.sensor.reacquire_interval(), Some(Duration::from_secs(15)));
        assert_eq!(config.selection.stale_policy, StaleSelectionPolicy::Keep);
        assert_eq!(config.logging.level, "debug");
        assert!((config.map.default_center.latitude() - 40.4168).abs() < 1e-9);
    }

    #[test]
    fn parse_minimal_yaml() {
        let config = RadarConfig::parse("radius:\n  default_meters: 250\n");
        assert!(config.is_ok());
        let config = config.ok().unwrap_or_default();

        assert_eq!(config.radius.default_meters, 250);
        assert_eq!(config.radius.max_meters, 5000);
        assert_eq!(config.map.idle_zoom, 13);
    }

    #[test]
    fn parse_empty_yaml() {
        assert!(RadarConfig::parse("").is_ok());
    }

    #[test]
    fn rejects_inverted_bounds() {
        let result = RadarConfig::parse("radius:\n  min_meters: 900\n  max_meters: 100\n");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn rejects_default_outside_bounds() {
        let result = RadarConfig::parse("radius:\n  default_meters: 10\n");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn rejects_out_of_range_center() {
        let yaml = "map:\n  default_center:\n    latitude: 123.0\n    longitude: 0.0\n";
        assert!(matches!(RadarConfig::parse(yaml), Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn rejects_zero_timeout() {
        let result = RadarConfig::parse("sensor:\n  timeout_ms: 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("thirdeye-config.yaml");
        if path.exists() {
            let config = RadarConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
