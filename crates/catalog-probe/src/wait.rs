//! Wait mechanisms for synchronization.
//!
//! The page renders asynchronously relative to the commands a scenario
//! issues. [`wait_for`] gates the next step on a readiness condition, polling
//! the session until it holds or the timeout elapses.

use std::fmt;
use std::time::Duration;

use crate::assertion::retry::{poll_until, Attempt, Polled, RetryConfig};
use crate::locator::{Locator, Resolution};
use crate::result::{ProbeError, ProbeResult};
use crate::session::{ElementState, PageSession};

/// Readiness condition over a single element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitCondition {
    /// Element is present in the DOM
    Attached,
    /// Element is present and rendered
    Visible,
    /// Element's form value equals the given string
    ValueEquals(String),
    /// Element is checked
    Checked,
}

impl WaitCondition {
    /// Whether the element state satisfies the condition
    #[must_use]
    pub fn is_met(&self, state: &ElementState) -> bool {
        match self {
            Self::Attached => true,
            Self::Visible => state.visible,
            Self::ValueEquals(expected) => state.value.as_deref() == Some(expected.as_str()),
            Self::Checked => state.checked == Some(true),
        }
    }

    /// Short description of the relevant part of an element's state
    #[must_use]
    pub fn describe(&self, state: &ElementState) -> String {
        match self {
            Self::Attached => "attached".to_string(),
            Self::Visible => {
                if state.visible {
                    "visible".to_string()
                } else {
                    "hidden".to_string()
                }
            }
            Self::ValueEquals(_) => format!("value={:?}", state.value),
            Self::Checked => format!("checked={:?}", state.checked),
        }
    }
}

impl fmt::Display for WaitCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attached => f.write_str("attached"),
            Self::Visible => f.write_str("visible"),
            Self::ValueEquals(v) => write!(f, "value {v:?}"),
            Self::Checked => f.write_str("checked"),
        }
    }
}

/// Result of a wait operation
#[derive(Debug, Clone)]
pub struct WaitResult {
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of polls
    pub attempts: usize,
    /// Description of what was waited for
    pub waited_for: String,
}

/// Block until `condition` holds for the element behind `locator`.
///
/// # Errors
///
/// `Timeout` when the condition does not hold within `config.timeout`,
/// `AmbiguousMatch` as soon as the locator matches several elements.
/// Transient page errors count as "not yet" and are retried.
pub async fn wait_for(
    session: &dyn PageSession,
    locator: &Locator,
    condition: &WaitCondition,
    config: RetryConfig,
) -> ProbeResult<WaitResult> {
    tracing::debug!(%locator, %condition, timeout_ms = config.timeout_ms(), "waiting");

    let polled = poll_until(config, move || async move {
        let resolution = match locator.resolve(session).await {
            Ok(resolution) => resolution,
            Err(e) if e.is_transient() => {
                tracing::debug!(%locator, error = %e, "page unavailable, retrying");
                return Ok(Attempt::Pending(e.to_string()));
            }
            Err(e) => return Err(e),
        };
        match resolution {
            Resolution::Found(el) if condition.is_met(&el.state) => Ok(Attempt::Ready(())),
            Resolution::Found(el) => Ok(Attempt::Pending(condition.describe(&el.state))),
            Resolution::Missing => Ok(Attempt::Pending(Resolution::Missing.to_string())),
            Resolution::Ambiguous { count } => Err(ProbeError::AmbiguousMatch {
                descriptor: locator.to_string(),
                count,
            }),
        }
    })
    .await?;

    match polled {
        Polled::Ready {
            attempts, elapsed, ..
        } => Ok(WaitResult {
            elapsed,
            attempts,
            waited_for: format!("{locator} to be {condition}"),
        }),
        Polled::Exhausted { last, .. } => {
            tracing::warn!(%locator, %condition, observed = %last, "wait timed out");
            Err(ProbeError::Timeout {
                descriptor: locator.to_string(),
                condition: condition.to_string(),
                observed: last,
                ms: config.timeout_ms(),
            })
        }
    }
}
