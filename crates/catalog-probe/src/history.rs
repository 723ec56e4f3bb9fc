//! Search history semantics.
//!
//! The site records each distinct search action once, newest first; doing
//! the same thing again moves the existing entry to the front instead of
//! adding a second one. [`HistoryLog`] encodes that rule and
//! [`entry_text`] the display format the scenarios assert on.

use serde::{Deserialize, Serialize};

/// Display text for a history entry: keyword and category label joined by
/// `separator`, or whichever of the two is present.
#[must_use]
pub fn entry_text(keyword: Option<&str>, category: Option<&str>, separator: &str) -> String {
    match (keyword, category) {
        (Some(k), Some(c)) => format!("{k}{separator}{c}"),
        (Some(k), None) => k.to_string(),
        (None, Some(c)) => c.to_string(),
        (None, None) => String::new(),
    }
}

/// One recorded search action
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryEntry<F> {
    /// Keyword, if the action included one
    pub keyword: Option<String>,
    /// Leaf category label, if a category filter was active
    pub category: Option<String>,
    /// Filter payload needed to re-apply the entry
    pub filter: F,
}

impl<F> HistoryEntry<F> {
    /// Display text using `separator`
    #[must_use]
    pub fn display_text(&self, separator: &str) -> String {
        entry_text(self.keyword.as_deref(), self.category.as_deref(), separator)
    }
}

/// Newest-first, deduplicating record of search actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryLog<T> {
    entries: Vec<T>,
}

impl<T> Default for HistoryLog<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: PartialEq> HistoryLog<T> {
    /// Create an empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an action; returns `true` when it was new
    pub fn record(&mut self, entry: T) -> bool {
        let existing = self.entries.iter().position(|e| *e == entry);
        if let Some(pos) = existing {
            self.entries.remove(pos);
        }
        self.entries.insert(0, entry);
        existing.is_none()
    }

    /// Entries, newest first
    #[must_use]
    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    /// Newest entry
    #[must_use]
    pub fn newest(&self) -> Option<&T> {
        self.entries.first()
    }

    /// Entry at recency rank `rank` (0 = newest)
    #[must_use]
    pub fn get(&self, rank: usize) -> Option<&T> {
        self.entries.get(rank)
    }

    /// Number of distinct recorded actions
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget everything (session reset)
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
