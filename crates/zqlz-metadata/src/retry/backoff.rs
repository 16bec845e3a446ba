//! Exponential backoff for retried metadata loads

use rand::Rng;
use std::time::Duration;

/// Delay schedule that doubles (by default) after every failed attempt, up to
/// a cap, optionally spread by ±25% jitter so concurrent retries drift apart.
///
/// ```
/// use zqlz_metadata::retry::BackoffStrategy;
/// use std::time::Duration;
///
/// let backoff = BackoffStrategy::new(100, 1_000);
/// assert_eq!(backoff.calculate_delay(0), Duration::from_millis(100));
/// assert_eq!(backoff.calculate_delay(2), Duration::from_millis(400));
/// assert_eq!(backoff.calculate_delay(9), Duration::from_millis(1_000));
/// ```
#[derive(Debug, Clone)]
pub struct BackoffStrategy {
    initial_ms: u64,
    max_ms: u64,
    multiplier: f64,
    jitter: bool,
}

impl BackoffStrategy {
    /// Create a strategy with the given first delay and cap, in milliseconds.
    pub fn new(initial_ms: u64, max_ms: u64) -> Self {
        let initial_ms = initial_ms.max(1);
        Self {
            initial_ms,
            max_ms: max_ms.max(initial_ms),
            multiplier: 2.0,
            jitter: false,
        }
    }

    /// Growth factor between attempts, at least 1.0
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before retry number `attempt` (0 = first retry)
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let delay_ms = (self.initial_ms as f64) * self.multiplier.powi(exponent);
        let capped_ms = delay_ms.min(self.max_ms as f64) as u64;

        if !self.jitter {
            return Duration::from_millis(capped_ms);
        }

        let spread = capped_ms / 4;
        let offset = rand::thread_rng().gen_range(0..=spread * 2);
        Duration::from_millis(capped_ms.saturating_sub(spread).saturating_add(offset))
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn has_jitter(&self) -> bool {
        self.jitter
    }
}

impl Default for BackoffStrategy {
    /// 100ms first delay, 5 second cap, doubling
    fn default() -> Self {
        Self::new(100, 5_000)
    }
}
