//! Interaction primitives: navigate, click, fill, submit.
//!
//! Element interactions auto-wait for their target to become actionable
//! (resolved, visible, enabled) before dispatching, then return without a
//! value. Ambiguity fails immediately; a missing or inert target fails once
//! the timeout elapses.

use crate::assertion::retry::{poll_until, Attempt, Polled, RetryConfig};
use crate::locator::{Locator, Resolution};
use crate::result::{ProbeError, ProbeResult};
use crate::session::PageSession;

/// Key pressed by [`submit`]
pub const SUBMIT_KEY: &str = "Enter";

/// Why an element is not actionable yet
#[derive(Debug, Clone, PartialEq, Eq)]
enum Blocker {
    Missing,
    Hidden,
    Disabled,
    Unsettled(String),
}

/// Navigate the page to `url`
pub async fn navigate(session: &dyn PageSession, url: &str) -> ProbeResult<()> {
    tracing::info!(url, "navigate");
    session.goto(url).await
}

/// Click the element behind `locator`
pub async fn click(session: &dyn PageSession, locator: &Locator, config: RetryConfig) -> ProbeResult<()> {
    let index = actionable(session, locator, config).await?;
    tracing::debug!(%locator, index, "click");
    session.click(&locator.without_ordinal(), index).await
}

/// Replace the value of the input behind `locator`
pub async fn fill(
    session: &dyn PageSession,
    locator: &Locator,
    text: &str,
    config: RetryConfig,
) -> ProbeResult<()> {
    let index = actionable(session, locator, config).await?;
    tracing::debug!(%locator, index, text, "fill");
    session.fill(&locator.without_ordinal(), index, text).await
}

/// Confirm the input behind `locator` with the keyboard
pub async fn submit(session: &dyn PageSession, locator: &Locator, config: RetryConfig) -> ProbeResult<()> {
    let index = actionable(session, locator, config).await?;
    tracing::debug!(%locator, index, key = SUBMIT_KEY, "submit");
    session.press(&locator.without_ordinal(), index, SUBMIT_KEY).await
}

/// Wait until the locator resolves to one visible, enabled element and
/// return its candidate index.
async fn actionable(session: &dyn PageSession, locator: &Locator, config: RetryConfig) -> ProbeResult<usize> {
    let polled = poll_until(config, move || async move {
        let resolution = match locator.resolve(session).await {
            Ok(resolution) => resolution,
            Err(e) if e.is_transient() => {
                return Ok(Attempt::Pending(Blocker::Unsettled(e.to_string())));
            }
            Err(e) => return Err(e),
        };
        match resolution {
            Resolution::Found(el) if el.state.is_actionable() => Ok(Attempt::Ready(el.index)),
            Resolution::Found(el) if !el.state.visible => Ok(Attempt::Pending(Blocker::Hidden)),
            Resolution::Found(_) => Ok(Attempt::Pending(Blocker::Disabled)),
            Resolution::Missing => Ok(Attempt::Pending(Blocker::Missing)),
            Resolution::Ambiguous { count } => Err(ProbeError::AmbiguousMatch {
                descriptor: locator.to_string(),
                count,
            }),
        }
    })
    .await?;

    match polled {
        Polled::Ready { value, .. } => Ok(value),
        Polled::Exhausted { last, .. } => {
            tracing::warn!(%locator, blocker = ?last, "target never became actionable");
            Err(match last {
                Blocker::Missing => ProbeError::ElementNotFound {
                    descriptor: locator.to_string(),
                    waited_ms: config.timeout_ms(),
                },
                Blocker::Hidden => ProbeError::NotInteractable {
                    descriptor: locator.to_string(),
                    reason: "element is hidden".to_string(),
                },
                Blocker::Disabled => ProbeError::NotInteractable {
                    descriptor: locator.to_string(),
                    reason: "element is disabled".to_string(),
                },
                Blocker::Unsettled(message) => ProbeError::NotInteractable {
                    descriptor: locator.to_string(),
                    reason: format!("page never settled: {message}"),
                },
            })
        }
    }
}
