//! Error types for the demo binary.
//!
//! [`DemoError`] wraps every failure mode during startup and the simulated
//! run so `main` can propagate with `?`.

/// Top-level error for the demo binary.
#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: thirdeye_core::config::ConfigError,
    },

    /// A radar operation was rejected.
    #[error("radar error: {source}")]
    Radar {
        /// The underlying radar error.
        #[from]
        source: thirdeye_core::radar::RadarError,
    },

    /// A generated coordinate was out of range.
    #[error("coordinate error: {source}")]
    Coordinate {
        /// The underlying coordinate error.
        #[from]
        source: thirdeye_types::CoordinateError,
    },

    /// Mock entity generation failed.
    #[error("spawner error: {message}")]
    Spawner {
        /// Description of the spawner failure.
        message: String,
    },
}
