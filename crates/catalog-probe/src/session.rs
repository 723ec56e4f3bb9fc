//! The seam between the scenario engine and whatever drives the page.
//!
//! The engine never holds UI state of its own. Every primitive asks the
//! session for a fresh view of the candidates behind a [`Locator`] and acts
//! on them by index, so the page stays the single source of truth.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::locator::Locator;
use crate::result::ProbeResult;

/// Observable state of one candidate element
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ElementState {
    /// Rendered and not hidden
    pub visible: bool,
    /// Not disabled
    pub enabled: bool,
    /// Form value (`<select>`, `<input>`), if the element has one
    pub value: Option<String>,
    /// Checked state, if the element is checkable
    pub checked: Option<bool>,
    /// Whitespace-normalized text content
    pub text: String,
}

impl ElementState {
    /// A visible, enabled element with the given text
    #[must_use]
    pub fn visible(text: impl Into<String>) -> Self {
        Self {
            visible: true,
            enabled: true,
            value: None,
            checked: None,
            text: text.into(),
        }
    }

    /// Set the form value
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Set the checked state
    #[must_use]
    pub const fn with_checked(mut self, checked: bool) -> Self {
        self.checked = Some(checked);
        self
    }

    /// Mark hidden
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Mark disabled
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Whether click/fill may target this element
    #[must_use]
    pub const fn is_actionable(&self) -> bool {
        self.visible && self.enabled
    }
}

/// A live page supplied by the browser automation collaborator.
///
/// `query` returns every candidate for the locator's selector chain,
/// ignoring the locator's own ordinal; ordinals and strictness are applied
/// by [`Locator::resolve`]. Action methods take the candidate index from
/// that same listing.
#[async_trait]
pub trait PageSession: Send + Sync {
    /// Navigate the page and wait for the load event
    async fn goto(&self, url: &str) -> ProbeResult<()>;

    /// Current candidates for a descriptor, in document order
    async fn query(&self, locator: &Locator) -> ProbeResult<Vec<ElementState>>;

    /// Click the `index`-th candidate
    async fn click(&self, locator: &Locator, index: usize) -> ProbeResult<()>;

    /// Replace the value of the `index`-th candidate with `text`
    async fn fill(&self, locator: &Locator, index: usize, text: &str) -> ProbeResult<()>;

    /// Press a key (e.g. `"Enter"`) with the `index`-th candidate focused
    async fn press(&self, locator: &Locator, index: usize, key: &str) -> ProbeResult<()>;

    /// Current page URL
    async fn current_url(&self) -> ProbeResult<String>;

    /// PNG screenshot, if the session can produce one
    async fn screenshot(&self) -> ProbeResult<Option<Vec<u8>>> {
        Ok(None)
    }
}

/// Supplies one isolated session per scenario run
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Session type handed to scenarios
    type Session: PageSession + 'static;

    /// Open a fresh session (no shared history or cookies)
    async fn open(&self) -> ProbeResult<Self::Session>;

    /// Tear a session down after its run
    async fn close(&self, session: Self::Session) -> ProbeResult<()> {
        drop(session);
        Ok(())
    }
}
