//! Exponential backoff with jitter for the channel supervisor.

use std::time::Duration;

use hotsave_core::ReconnectSettings;

#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Delay before the first reconnect attempt.
    pub initial_delay: Duration,
    /// Ceiling applied before jitter.
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    /// 0 = unlimited.
    pub max_attempts: u32,
    pub jitter: bool,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from(&ReconnectSettings::default())
    }
}

impl From<&ReconnectSettings> for ReconnectPolicy {
    fn from(settings: &ReconnectSettings) -> Self {
        Self {
            initial_delay: Duration::from_millis(settings.initial_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            backoff_multiplier: settings.backoff_multiplier,
            max_attempts: settings.max_attempts,
            jitter: settings.jitter,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before attempt `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let base = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let capped = base.min(self.max_delay.as_secs_f64());

        let delay = if self.jitter {
            // Up to 25% extra.
            capped * (1.0 + rand_jitter() * 0.25)
        } else {
            capped
        };
        Duration::from_secs_f64(delay)
    }

    pub fn should_retry(&self, attempt: u32) -> bool {
        self.max_attempts == 0 || attempt < self.max_attempts
    }
}

/// Pseudo-random fraction in `[0, 1)` seeded from the clock.
fn rand_jitter() -> f64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    f64::from(nanos % 1000) / 1000.0
}
