use std::time::Duration;

pub const BACKOFF_FACTOR: f64 = 1.5;

/// Reconnect schedule after an unexpected close.
///
/// Attempt `n` (1-based) waits `base_delay * factor^(n-1)`, capped at
/// `max_delay`. With the defaults that is 2s, 3s, 4.5s.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    /// Attempts before giving up. 0 disables automatic reconnects.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(2000),
            max_delay: Duration::from_secs(30),
            factor: BACKOFF_FACTOR,
        }
    }
}

impl ReconnectPolicy {
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let nanos = self.base_delay.as_nanos() as f64 * self.factor.powi(exponent);
        let cap = self.max_delay.as_nanos() as f64;

        Duration::from_nanos(nanos.min(cap).round() as u64)
    }

    pub fn is_enabled(&self) -> bool {
        self.max_attempts > 0
    }

    pub fn is_exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }
}
