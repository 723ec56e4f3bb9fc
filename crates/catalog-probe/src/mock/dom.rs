//! Flat accessibility tree with the same matching rules as the in-page
//! resolver.
//!
//! Nodes are pushed in document order (a parent before its children, a
//! subtree before its next sibling), so index order is document order.

use crate::locator::{normalize_whitespace, ElementFacts, Locator, Role, Selector};
use crate::session::ElementState;

/// What clicking (or confirming) an element does to the storefront
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Action {
    OpenSearch,
    OpenCategoryMenu,
    /// Select the category at this label path
    Category(Vec<String>),
    ClearFilters,
    /// Re-apply the history entry at this recency rank
    History(usize),
    FocusKeyword,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Element {
    pub role: Option<Role>,
    pub name: String,
    pub text: String,
    pub label: Option<String>,
    pub test_id: Option<String>,
    pub hidden: bool,
    pub value: Option<String>,
    pub checked: Option<bool>,
    pub editable: bool,
    pub action: Option<Action>,
}

impl Element {
    /// Generic container without semantics
    pub fn container() -> Self {
        Self::default()
    }

    pub fn with_role(role: Role, name: impl Into<String>) -> Self {
        Self {
            role: Some(role),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Link whose accessible name is its text
    pub fn link(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            text: text.clone(),
            ..Self::with_role(Role::Link, text)
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn test_id(mut self, id: impl Into<String>) -> Self {
        self.test_id = Some(id.into());
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub const fn checked(mut self, checked: bool) -> Self {
        self.checked = Some(checked);
        self
    }

    pub const fn hidden_if(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub const fn editable(mut self) -> Self {
        self.editable = true;
        self
    }

    pub fn on_click(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }
}

#[derive(Debug)]
struct Node {
    element: Element,
    parent: Option<usize>,
}

#[derive(Debug, Default)]
pub(crate) struct Dom {
    nodes: Vec<Node>,
}

impl Dom {
    /// Append `element` under `parent`, returning its index
    pub fn push(&mut self, parent: Option<usize>, element: Element) -> usize {
        self.nodes.push(Node { element, parent });
        self.nodes.len() - 1
    }

    pub fn element(&self, index: usize) -> &Element {
        &self.nodes[index].element
    }

    /// Whether `node` sits strictly below `ancestor`
    fn is_descendant(&self, node: usize, ancestor: usize) -> bool {
        let mut current = self.nodes[node].parent;
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.nodes[p].parent;
        }
        false
    }

    /// Rendered: neither the node nor any ancestor is hidden
    pub fn is_visible(&self, index: usize) -> bool {
        let mut current = Some(index);
        while let Some(i) = current {
            if self.nodes[i].element.hidden {
                return false;
            }
            current = self.nodes[i].parent;
        }
        true
    }

    /// Own text followed by every descendant's, normalized
    fn full_text(&self, index: usize) -> String {
        let parts = std::iter::once(self.nodes[index].element.text.as_str()).chain(
            (index + 1..self.nodes.len())
                .filter(|&j| self.is_descendant(j, index))
                .map(|j| self.nodes[j].element.text.as_str()),
        );
        normalize_whitespace(&parts.collect::<Vec<_>>().join(" "))
    }

    fn matches(&self, selector: &Selector, index: usize) -> bool {
        let element = &self.nodes[index].element;
        let text = self.full_text(index);
        selector.matches(&ElementFacts {
            role: element.role,
            name: &element.name,
            text: &text,
            label: element.label.as_deref(),
            test_id: element.test_id.as_deref(),
        })
    }

    /// Candidates for a locator chain, in document order, ignoring the
    /// locator's own ordinal.
    pub fn select(&self, locator: &Locator) -> Vec<usize> {
        let scope = locator.parent().map(|parent| {
            let all = self.select(parent);
            match parent.ordinal() {
                Some(n) => all.get(n).copied().into_iter().collect(),
                None => all,
            }
        });

        let matched: Vec<usize> = (0..self.nodes.len())
            .filter(|&i| self.matches(locator.selector(), i))
            .collect();

        // Text matching keeps only the innermost matching elements.
        let innermost: Vec<usize> = if matches!(locator.selector(), Selector::Text { .. }) {
            matched
                .iter()
                .copied()
                .filter(|&i| !matched.iter().any(|&j| self.is_descendant(j, i)))
                .collect()
        } else {
            matched
        };

        match scope {
            Some(scope) => innermost
                .into_iter()
                .filter(|&i| scope.iter().any(|&s| self.is_descendant(i, s)))
                .collect(),
            None => innermost,
        }
    }

    pub fn state(&self, index: usize) -> ElementState {
        let element = &self.nodes[index].element;
        ElementState {
            visible: self.is_visible(index),
            enabled: true,
            value: element.value.clone(),
            checked: element.checked,
            text: self.full_text(index),
        }
    }
}
