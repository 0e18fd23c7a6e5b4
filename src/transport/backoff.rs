//! Reconnect backoff policy for the persistent channel.
//!
//! Delays double from the base delay up to a cap:
//!
//! | attempt | 0 | 1 | 2 | 3 | 4 |
//! |---------|---|---|---|---|---|
//! | delay (default) | 1s | 2s | 4s | 8s | 10s |
//!
//! Once `attempt` reaches `max_attempts` the policy is exhausted and no
//! further reconnects are scheduled until it is reset.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Default number of reconnects before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default delay before the first reconnect.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Default upper bound on any single delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(10_000);

// ============================================================================
// ReconnectPolicy
// ============================================================================

/// Exponential backoff state for reconnecting to the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Reconnects scheduled since the last successful open.
    attempt: u32,
    /// Reconnects allowed before giving up.
    max_attempts: u32,
    /// Delay for attempt 0.
    base_delay: Duration,
    /// Cap applied to every delay.
    max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY)
    }
}

impl ReconnectPolicy {
    /// Creates a policy with `attempt = 0`.
    #[inline]
    #[must_use]
    pub const fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            attempt: 0,
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// Returns the delay used for the given attempt number.
    ///
    /// `min(base × 2^attempt, max_delay)`, saturating on overflow.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Consumes one attempt and returns its delay.
    ///
    /// Returns `None` once the policy is exhausted; `attempt` is left
    /// unchanged in that case.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }

        let delay = self.delay(self.attempt);
        self.attempt += 1;
        Some(delay)
    }

    /// Resets to `attempt = 0`.
    #[inline]
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Returns the number of reconnects scheduled since the last reset.
    #[inline]
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Returns the reconnect limit.
    #[inline]
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns `true` if no further reconnects may be scheduled.
    #[inline]
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }

    /// Sets the reconnect limit.
    #[inline]
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the delay for the first reconnect.
    #[inline]
    #[must_use]
    pub const fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Sets the cap applied to every delay.
    #[inline]
    #[must_use]
    pub const fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
