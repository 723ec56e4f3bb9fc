//! Bounded polling shared by waits and assertions.
//!
//! A check is re-run until it reports [`Attempt::Ready`] or the timeout
//! elapses. Errors returned by the check short-circuit immediately, so
//! callers turn transient session errors (see
//! [`ProbeError::is_transient`](crate::ProbeError::is_transient)) into
//! "not yet" observations themselves.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};

use crate::result::ProbeResult;

/// Default timeout for auto-waiting primitives (sub-second)
pub const DEFAULT_TIMEOUT_MS: u64 = 500;

/// Timeout for steps that follow a network-dependent UI update
pub const NETWORK_TIMEOUT_MS: u64 = 20_000;

/// Default polling interval
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Outcome of a single check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<T, O> {
    /// Condition holds
    Ready(T),
    /// Condition does not hold yet; carries what was observed
    Pending(O),
}

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total timeout duration
    pub timeout: Duration,
    /// Interval between retry attempts
    pub poll_interval: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with timeout
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }

    /// Long bound for network-dependent steps
    #[must_use]
    pub const fn network() -> Self {
        Self::new(Duration::from_millis(NETWORK_TIMEOUT_MS))
    }

    /// Set the timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Timeout in whole milliseconds, for diagnostics
    #[must_use]
    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Result of polling to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Polled<T, O> {
    /// Condition held
    Ready {
        /// Value produced by the successful check
        value: T,
        /// Number of checks run
        attempts: usize,
        /// Time spent
        elapsed: Duration,
    },
    /// Timeout elapsed first
    Exhausted {
        /// Last observation before giving up
        last: O,
        /// Number of checks run
        attempts: usize,
        /// Time spent
        elapsed: Duration,
    },
}

/// Run `check` until it is ready or `config.timeout` elapses.
///
/// The check always runs at least once. Errors returned by the check abort
/// the loop and are propagated unchanged.
pub async fn poll_until<T, O, F, Fut>(config: RetryConfig, mut check: F) -> ProbeResult<Polled<T, O>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeResult<Attempt<T, O>>>,
{
    let start = Instant::now();
    let mut attempts = 0;

    loop {
        attempts += 1;

        let last = match check().await? {
            Attempt::Ready(value) => {
                return Ok(Polled::Ready {
                    value,
                    attempts,
                    elapsed: start.elapsed(),
                });
            }
            Attempt::Pending(observed) => observed,
        };

        let elapsed = start.elapsed();
        if elapsed >= config.timeout {
            return Ok(Polled::Exhausted {
                last,
                attempts,
                elapsed,
            });
        }

        let remaining = config.timeout - elapsed;
        tokio::time::sleep(config.poll_interval.min(remaining)).await;
    }
}
