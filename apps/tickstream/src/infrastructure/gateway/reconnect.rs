//! Reconnection Policy
//!
//! Linear backoff for gateway reconnection: the n-th attempt waits
//! `base_delay * n`, capped at `max_delay`. The attempt counter resets on a
//! successful connection, and once `max_attempts` is exhausted the
//! connection is terminally failed with no further automatic retries.

use std::time::Duration;

/// Configuration for reconnection behavior.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay unit; attempt n waits `base_delay * n`.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Maximum number of reconnection attempts (0 = unlimited).
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_attempts: 5,
        }
    }
}

impl ReconnectConfig {
    /// Create a new configuration with custom values.
    #[must_use]
    pub const fn new(base_delay: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_delay,
            max_attempts,
        }
    }

    /// Create configuration from `WebSocketSettings`.
    #[must_use]
    pub const fn from_websocket_settings(settings: &crate::WebSocketSettings) -> Self {
        Self {
            base_delay: settings.reconnect_delay_base,
            max_delay: settings.reconnect_delay_max,
            max_attempts: settings.max_reconnect_attempts,
        }
    }
}

/// Reconnection policy with linear backoff.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use tickstream::infrastructure::gateway::reconnect::{ReconnectConfig, ReconnectPolicy};
///
/// let mut policy = ReconnectPolicy::new(ReconnectConfig::default());
///
/// let first = policy.next_delay();
/// assert_eq!(first, Some(Duration::from_secs(1)));
///
/// // After a successful connection the counter starts over.
/// policy.reset();
/// assert_eq!(policy.attempt_count(), 0);
/// ```
#[derive(Debug)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    attempt_count: u32,
}

impl ReconnectPolicy {
    /// Create a new reconnection policy.
    #[must_use]
    pub const fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            attempt_count: 0,
        }
    }

    /// Get the delay before the next attempt, or `None` when attempts are
    /// exhausted.
    #[must_use]
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.config.max_attempts > 0 && self.attempt_count >= self.config.max_attempts {
            return None;
        }

        self.attempt_count += 1;

        let delay = self
            .config
            .base_delay
            .saturating_mul(self.attempt_count)
            .min(self.config.max_delay);

        Some(delay)
    }

    /// Reset the policy after a successful connection.
    pub const fn reset(&mut self) {
        self.attempt_count = 0;
    }

    /// Get the current attempt count.
    #[must_use]
    pub const fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    /// Check if another attempt is allowed.
    #[must_use]
    pub const fn should_retry(&self) -> bool {
        self.config.max_attempts == 0 || self.attempt_count < self.config.max_attempts
    }
}
