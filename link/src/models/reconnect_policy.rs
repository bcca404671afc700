use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How the delay between reconnection attempts evolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    /// Same delay before every attempt.
    #[default]
    Fixed,
    /// Delay doubles with each attempt, capped at the policy's `max_delay`.
    Exponential,
}

/// Bounded reconnection policy.
///
/// `max_attempts` counts automatic retries after a failure; the attempt
/// counter itself is owned by the connection manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff: BackoffStrategy,
    pub max_delay: Duration,
}

impl ReconnectPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            backoff: BackoffStrategy::Fixed,
            max_delay: delay,
        }
    }

    pub fn exponential(max_attempts: u32, delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            backoff: BackoffStrategy::Exponential,
            max_delay,
        }
    }

    /// Delay to wait before retry number `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self.backoff {
            BackoffStrategy::Fixed => self.delay,
            BackoffStrategy::Exponential => {
                let exponent = attempt.saturating_sub(1).min(31);
                let base_ms = u64::try_from(self.delay.as_millis()).unwrap_or(u64::MAX);
                let cap_ms = u64::try_from(self.max_delay.as_millis()).unwrap_or(u64::MAX);
                let ms = base_ms.saturating_mul(2u64.saturating_pow(exponent));
                Duration::from_millis(ms.min(cap_ms.max(base_ms)))
            },
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(5, Duration::from_millis(3000))
    }
}
