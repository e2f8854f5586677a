//! Operational alerts for judge-side failures.

use tracing::error;

/// Receives messages about infrastructure trouble: failed sandboxes and
/// `CheckFailed` verdicts.
pub trait AlertSink: Send + Sync {
    fn alert(&self, message: &str);
}

/// Logs alerts at `error` level under the `alerts` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAlerts;

impl AlertSink for TracingAlerts {
    fn alert(&self, message: &str) {
        error!(target: "alerts", "{message}");
    }
}
