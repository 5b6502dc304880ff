//! Fix listener that logs every recorded location.

use thirdeye_core::tracker::FixListener;
use thirdeye_types::Fix;
use tracing::info;

/// Logs each fix as a JSON payload, the shape the web app receives.
#[derive(Debug, Default)]
pub struct FixLogger {
    fixes_seen: u64,
}

impl FixLogger {
    /// Create a new logger.
    pub const fn new() -> Self {
        Self { fixes_seen: 0 }
    }
}

impl FixListener for FixLogger {
    fn on_fix(&mut self, fix: &Fix) {
        self.fixes_seen = self.fixes_seen.saturating_add(1);
        let payload = serde_json::to_string(fix).unwrap_or_default();
        info!(fixes_seen = self.fixes_seen, %payload, "Device located");
    }
}
