//! Cancellable one-shot timers.
//!
//! [`schedule`] runs a callback after a delay on the tokio runtime and hands
//! back a [`TimerToken`]. The token is the only way to stop the timer:
//! calling [`TimerToken::cancel`] guarantees the callback will not start.
//! Dropping the token leaves the timer armed, so a callback may safely take
//! and drop its own token when it fires.
//!
//! [`deadline`] bounds a fallible future, turning expiry into
//! [`Error::Timeout`].

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::trace;

use crate::error::{Error, Result};

// ============================================================================
// TimerToken
// ============================================================================

/// Handle to a scheduled timer.
pub struct TimerToken {
    /// Task sleeping until the deadline.
    handle: JoinHandle<()>,
    /// Delay the timer was armed with.
    delay: Duration,
}

impl TimerToken {
    /// Cancels the timer.
    ///
    /// No-op if the callback has already run.
    pub fn cancel(self) {
        self.handle.abort();
        trace!(delay_ms = self.delay.as_millis() as u64, "Timer cancelled");
    }

    /// Returns the delay this timer was armed with.
    #[inline]
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Returns `true` once the callback ran or the timer was aborted.
    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl fmt::Debug for TimerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerToken")
            .field("delay", &self.delay)
            .field("finished", &self.is_finished())
            .finish()
    }
}

// ============================================================================
// Scheduling
// ============================================================================

/// Runs `callback` once after `delay`.
///
/// Must be called from within a tokio runtime.
pub fn schedule<F>(delay: Duration, callback: F) -> TimerToken
where
    F: FnOnce() + Send + 'static,
{
    let handle = tokio::spawn(async move {
        sleep(delay).await;
        callback();
    });

    trace!(delay_ms = delay.as_millis() as u64, "Timer scheduled");

    TimerToken { handle, delay }
}

// ============================================================================
// Deadlines
// ============================================================================

/// Awaits `future` for at most `limit`.
///
/// # Errors
///
/// Returns [`Error::Timeout`] naming `operation` if the deadline passes,
/// otherwise whatever `future` returned.
pub async fn deadline<T, F>(operation: &str, limit: Duration, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => Err(Error::timeout(operation, limit.as_millis() as u64)),
    }
}

// ============================================================================
// Tests
// ============================================================================
