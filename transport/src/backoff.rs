//! Reconnection delay policy.

use std::time::Duration;

/// Delay between a failed connection attempt and the next one.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(5000);

/// Upper bound used by [`Backoff::Exponential`] unless configured otherwise.
pub const DEFAULT_MAX_RECONNECT_INTERVAL: Duration = Duration::from_secs(60);

/// How long to wait before reconnecting.
///
/// `Constant` is the default: every retry waits the same interval, with no cap
/// on the number of retries. `Exponential` doubles the wait after every
/// consecutive failure, up to `max`, and starts over once a connection succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Constant {
        interval: Duration,
    },
    Exponential {
        base: Duration,
        max: Duration,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::Constant {
            interval: DEFAULT_RECONNECT_INTERVAL,
        }
    }
}

impl Backoff {
    pub fn constant(interval: Duration) -> Self {
        Backoff::Constant { interval }
    }

    pub fn exponential(base: Duration, max: Duration) -> Self {
        Backoff::Exponential { base, max }
    }

    /// Delay before the next attempt, given how many consecutive failures have
    /// happened so far (1 for the first failure).
    pub fn delay(&self, consecutive_failures: u32) -> Duration {
        match *self {
            Backoff::Constant { interval } => interval,
            Backoff::Exponential { base, max } => {
                let exponent = consecutive_failures.saturating_sub(1);
                base.saturating_mul(2u32.saturating_pow(exponent)).min(max)
            }
        }
    }
}
