use std::time::Duration;

use crate::core::config::ReconcilerSettings;

/// Exponential delay between submit attempts: `base * 2^(attempt - 1)`,
/// capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SubmitBackoff {
    base: Duration,
    max: Duration,
}

impl SubmitBackoff {
    pub(crate) fn new(base: Duration, max: Duration) -> Self {
        Self { base, max: max.max(base) }
    }

    pub(crate) fn from_settings(settings: &ReconcilerSettings) -> Self {
        Self::new(
            Duration::from_secs(settings.backoff_base_seconds),
            Duration::from_secs(settings.backoff_max_seconds),
        )
    }

    /// Delay after the `attempt`-th consecutive failure (1-based).
    pub(crate) fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = 2_u32.checked_pow(exponent).unwrap_or(u32::MAX);
        self.base.checked_mul(factor).unwrap_or(self.max).min(self.max)
    }
}
