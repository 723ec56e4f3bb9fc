//! Locator abstraction for element selection.
//!
//! A [`Locator`] is a declarative descriptor. It never holds an element
//! reference: every use re-resolves it against the live page through a
//! [`PageSession`], so a locator can be built before the element exists.
//!
//! # Strategies
//!
//! - **Role + accessible name**: preferred, mirrors how users perceive the page
//! - **Exact text**: for cases where several elements share a role/name
//! - **Label**: form controls and icon buttons labelled via `aria-label`/`<label>`
//! - **Test ID**: `data-testid` hooks exposed by the application
//!
//! Any strategy may be narrowed with an ordinal (`nth`) and scoped inside a
//! parent locator.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::result::ProbeResult;
use crate::session::{ElementState, PageSession};

/// ARIA roles used by the scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Search landmark (`role="search"`, `<search>`)
    Search,
    /// Hyperlink (`<a href>`)
    Link,
    /// Button
    Button,
    /// Select box (`<select>`)
    Combobox,
    /// Checkbox input
    Checkbox,
    /// Heading (`<h1>`–`<h6>`)
    Heading,
    /// List container
    List,
    /// List item (`<li>`)
    Listitem,
    /// Text input
    Textbox,
}

impl Role {
    /// ARIA role name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Link => "link",
            Self::Button => "button",
            Self::Combobox => "combobox",
            Self::Checkbox => "checkbox",
            Self::Heading => "heading",
            Self::List => "list",
            Self::Listitem => "listitem",
            Self::Textbox => "textbox",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selector strategy for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum Selector {
    /// Semantic role, optionally filtered by accessible name
    Role {
        /// ARIA role
        role: Role,
        /// Accessible name filter
        name: Option<String>,
        /// Require the whole name to match
        exact: bool,
    },
    /// Visible text content
    Text {
        /// Text to match
        text: String,
        /// Require the whole text to match
        exact: bool,
    },
    /// Associated label or `aria-label`
    Label {
        /// Label text
        text: String,
        /// Require the whole label to match
        exact: bool,
    },
    /// Test ID selector (data-testid attribute)
    TestId {
        /// Test identifier
        id: String,
    },
}

impl Selector {
    /// Whether an element with these facts satisfies the selector.
    ///
    /// `role`, `name`, `own_text`, `label` and `test_id` are the computed
    /// accessibility facts of a single element.
    #[must_use]
    pub fn matches(&self, facts: &ElementFacts<'_>) -> bool {
        match self {
            Self::Role { role, name, exact } => {
                facts.role == Some(*role)
                    && name
                        .as_deref()
                        .map_or(true, |n| text_matches(n, facts.name, *exact))
            }
            Self::Text { text, exact } => text_matches(text, facts.text, *exact),
            Self::Label { text, exact } => facts
                .label
                .is_some_and(|label| text_matches(text, label, *exact)),
            Self::TestId { id } => facts.test_id == Some(id.as_str()),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = |exact: bool| if exact { "s" } else { "i" };
        match self {
            Self::Role { role, name, exact } => match name {
                Some(n) => write!(f, "role={role}[name={n:?}{}]", suffix(*exact)),
                None => write!(f, "role={role}"),
            },
            Self::Text { text, exact } => write!(f, "text={text:?}{}", suffix(*exact)),
            Self::Label { text, exact } => write!(f, "label={text:?}{}", suffix(*exact)),
            Self::TestId { id } => write!(f, "test-id={id:?}"),
        }
    }
}

/// Accessibility facts of one element, as seen by a session
#[derive(Debug, Clone, Copy, Default)]
pub struct ElementFacts<'a> {
    /// Computed ARIA role
    pub role: Option<Role>,
    /// Computed accessible name
    pub name: &'a str,
    /// Visible text content
    pub text: &'a str,
    /// Associated label, if any
    pub label: Option<&'a str>,
    /// `data-testid` value, if any
    pub test_id: Option<&'a str>,
}

/// Collapse runs of whitespace and trim
#[must_use]
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text matching shared by every session implementation.
///
/// Exact: equality after whitespace normalization.
/// Otherwise: case-insensitive substring after normalization.
#[must_use]
pub fn text_matches(pattern: &str, candidate: &str, exact: bool) -> bool {
    let pattern = normalize_whitespace(pattern);
    let candidate = normalize_whitespace(candidate);
    if exact {
        candidate == pattern
    } else {
        candidate.to_lowercase().contains(&pattern.to_lowercase())
    }
}

/// A locator for finding elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    /// The selector for finding elements
    selector: Selector,
    /// Ordinal into the match set
    nth: Option<usize>,
    /// Scope: only descendants of this locator's matches are considered
    parent: Option<Box<Locator>>,
}

impl Locator {
    /// Create a locator from a selector
    #[must_use]
    pub const fn from_selector(selector: Selector) -> Self {
        Self {
            selector,
            nth: None,
            parent: None,
        }
    }

    /// Locate by role and accessible name (substring, case-insensitive)
    #[must_use]
    pub fn role(role: Role, name: impl Into<String>) -> Self {
        Self::from_selector(Selector::Role {
            role,
            name: Some(name.into()),
            exact: false,
        })
    }

    /// Locate every element with a role, regardless of name
    #[must_use]
    pub const fn any_role(role: Role) -> Self {
        Self::from_selector(Selector::Role {
            role,
            name: None,
            exact: false,
        })
    }

    /// Locate by visible text (substring, case-insensitive)
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::from_selector(Selector::Text {
            text: text.into(),
            exact: false,
        })
    }

    /// Locate by exact visible text
    #[must_use]
    pub fn exact_text(text: impl Into<String>) -> Self {
        Self::from_selector(Selector::Text {
            text: text.into(),
            exact: true,
        })
    }

    /// Locate by label text
    #[must_use]
    pub fn label(text: impl Into<String>) -> Self {
        Self::from_selector(Selector::Label {
            text: text.into(),
            exact: false,
        })
    }

    /// Locate by `data-testid`
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::from_selector(Selector::TestId { id: id.into() })
    }

    /// Require full-string matching for name/text/label
    #[must_use]
    pub fn exact(mut self) -> Self {
        match &mut self.selector {
            Selector::Role { exact, .. }
            | Selector::Text { exact, .. }
            | Selector::Label { exact, .. } => *exact = true,
            Selector::TestId { .. } => {}
        }
        self
    }

    /// Pick the `index`-th (zero-based) element of the match set
    #[must_use]
    pub const fn nth(mut self, index: usize) -> Self {
        self.nth = Some(index);
        self
    }

    /// Pick the first element of the match set
    #[must_use]
    pub const fn first(self) -> Self {
        self.nth(0)
    }

    /// Scope `child` to descendants of this locator's matches
    #[must_use]
    pub fn locate(&self, child: Self) -> Self {
        Self {
            parent: Some(Box::new(self.clone())),
            ..child
        }
    }

    /// Get the selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Get the ordinal, if any
    #[must_use]
    pub const fn ordinal(&self) -> Option<usize> {
        self.nth
    }

    /// Get the parent scope, if any
    #[must_use]
    pub fn parent(&self) -> Option<&Self> {
        self.parent.as_deref()
    }

    /// The same descriptor without its ordinal, i.e. the full match set
    #[must_use]
    pub fn without_ordinal(&self) -> Self {
        Self {
            nth: None,
            ..self.clone()
        }
    }

    /// JSON payload consumed by the in-page resolver
    pub fn to_query_json(&self) -> ProbeResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Resolve against the current page content.
    ///
    /// Strict: without an ordinal, more than one candidate is ambiguous.
    pub async fn resolve(&self, session: &dyn PageSession) -> ProbeResult<Resolution> {
        let candidates = session.query(self).await?;
        let resolution = Resolution::from_candidates(candidates, self.nth);
        tracing::trace!(locator = %self, outcome = %resolution, "resolved");
        Ok(resolution)
    }

    /// Number of elements currently matching, ordinal applied
    pub async fn count(&self, session: &dyn PageSession) -> ProbeResult<usize> {
        let candidates = session.query(self).await?;
        Ok(match self.nth {
            Some(n) => usize::from(n < candidates.len()),
            None => candidates.len(),
        })
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(parent) = &self.parent {
            write!(f, "{parent} >> ")?;
        }
        write!(f, "{}", self.selector)?;
        if let Some(n) = self.nth {
            write!(f, " >> nth={n}")?;
        }
        Ok(())
    }
}

/// A uniquely resolved element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedElement {
    /// Index into the session's candidate list, used to act on the element
    pub index: usize,
    /// State at resolution time
    pub state: ElementState,
}

/// Outcome of resolving a locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Exactly one element selected
    Found(ResolvedElement),
    /// No element matched (or ordinal out of range)
    Missing,
    /// Several elements matched and no ordinal was given
    Ambiguous {
        /// Number of candidates
        count: usize,
    },
}

impl Resolution {
    /// Apply strictness and the ordinal to a candidate list
    #[must_use]
    pub fn from_candidates(mut candidates: Vec<ElementState>, nth: Option<usize>) -> Self {
        match nth {
            Some(index) if index < candidates.len() => Self::Found(ResolvedElement {
                index,
                state: candidates.swap_remove(index),
            }),
            Some(_) => Self::Missing,
            None => match candidates.len() {
                0 => Self::Missing,
                1 => Self::Found(ResolvedElement {
                    index: 0,
                    state: candidates.swap_remove(0),
                }),
                count => Self::Ambiguous { count },
            },
        }
    }

    /// The resolved element, if exactly one
    #[must_use]
    pub const fn element(&self) -> Option<&ResolvedElement> {
        match self {
            Self::Found(el) => Some(el),
            _ => None,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Found(el) => write!(f, "found #{}", el.index),
            Self::Missing => f.write_str("no element matched"),
            Self::Ambiguous { count } => write!(f, "{count} elements matched"),
        }
    }
}
