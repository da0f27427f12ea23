use std::time::Duration;

/// Pairing controller tuning.
#[derive(Debug, Clone)]
pub struct PairingConfig {
    /// How long an inbound request waits for an accept/reject decision
    /// before it is implicitly rejected.
    pub decision_window: Duration,
    /// How long a completed attempt stays visible before success is
    /// announced and the session released.
    pub completion_display_delay: Duration,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            decision_window: Duration::from_secs(15),
            completion_display_delay: Duration::from_millis(1500),
        }
    }
}
