//! Site profile: the target application's labels, taxonomy paths and codes.
//!
//! The storefront UI is an external, versioned contract. Everything the
//! scenarios know about it lives here so a relabelled site means editing a
//! YAML file, not the scenario code.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::assertion::retry::{RetryConfig, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS, NETWORK_TIMEOUT_MS};
use crate::history;
use crate::locator::{Locator, Role};
use crate::result::{ProbeError, ProbeResult};

/// Deepest tier a filter-asserted path may reach
pub const MAX_TIER: usize = 3;

/// How a category link is picked out of the menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkMatch {
    /// Role `link` + accessible name
    #[default]
    Role,
    /// Exact visible text, for labels that are substrings of their siblings'
    ExactText,
}

/// One level of the category taxonomy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryNode {
    /// Display label (locale-specific)
    pub label: String,
    /// Option code reported by this tier's selection control
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Link selection strategy
    #[serde(default, skip_serializing_if = "is_default_link")]
    pub link: LinkMatch,
}

fn is_default_link(link: &LinkMatch) -> bool {
    *link == LinkMatch::Role
}

impl CategoryNode {
    /// Create a node selected by role + name
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            code: None,
            link: LinkMatch::Role,
        }
    }

    /// Set the selection-control code
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Select the link by exact text instead of role + name
    #[must_use]
    pub const fn by_exact_text(mut self) -> Self {
        self.link = LinkMatch::ExactText;
        self
    }

    /// Locator for this node's link in the category menu
    #[must_use]
    pub fn link_locator(&self) -> Locator {
        match self.link {
            LinkMatch::Role => Locator::role(Role::Link, &self.label),
            LinkMatch::ExactText => Locator::exact_text(&self.label),
        }
    }
}

/// A top-down walk through the taxonomy, tier 1 first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryPath(Vec<CategoryNode>);

/// Expected value of one selection control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlExpectation {
    /// Control ordinal on the page (0 is the root "all" control)
    pub control: usize,
    /// Expected option code
    pub code: String,
}

impl CategoryPath {
    /// Create a path from nodes
    #[must_use]
    pub fn new(nodes: Vec<CategoryNode>) -> Self {
        Self(nodes)
    }

    /// Nodes in tier order
    #[must_use]
    pub fn nodes(&self) -> &[CategoryNode] {
        &self.0
    }

    /// Nodes paired with their 1-based tier
    pub fn tiers(&self) -> impl Iterator<Item = (usize, &CategoryNode)> {
        self.0.iter().enumerate().map(|(i, node)| (i + 1, node))
    }

    /// Number of tiers
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Deepest node
    #[must_use]
    pub fn leaf(&self) -> Option<&CategoryNode> {
        self.0.last()
    }

    /// Whether walking `other` passes through every tier of this path.
    ///
    /// Equal label sequences count as a prefix.
    #[must_use]
    pub fn is_label_prefix_of(&self, other: &Self) -> bool {
        self.depth() <= other.depth()
            && self
                .0
                .iter()
                .zip(other.nodes())
                .all(|(a, b)| a.label == b.label)
    }

    /// Leaf label, or an empty string for an empty path
    #[must_use]
    pub fn leaf_label(&self) -> &str {
        self.leaf().map_or("", |n| n.label.as_str())
    }

    /// Selection-control expectations for every non-leaf tier.
    ///
    /// Control `i` reports tier `i`'s code; control 0 is never asserted.
    pub fn control_expectations(&self) -> ProbeResult<Vec<ControlExpectation>> {
        let Some((_, parents)) = self.0.split_last() else {
            return Err(ProbeError::config("category path is empty"));
        };
        parents
            .iter()
            .enumerate()
            .map(|(i, node)| {
                node.code
                    .clone()
                    .map(|code| ControlExpectation { control: i + 1, code })
                    .ok_or_else(|| {
                        ProbeError::config(format!(
                            "tier {} ({}) has no selection-control code",
                            i + 1,
                            node.label
                        ))
                    })
            })
            .collect()
    }
}

/// Labels of the fixed UI affordances
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiLabels {
    /// Accessible name of the search landmark
    pub search_box: String,
    /// Link that opens the category menu
    pub category_entry: String,
    /// Label of the control that dismisses applied filters
    pub clear_filters: String,
    /// Label of the keyword input
    pub keyword_field: String,
    /// `data-testid` of the search history list
    pub history_test_id: String,
    /// Appended to the keyword in the results heading
    pub results_heading_suffix: String,
    /// Joins keyword and category label in a history entry
    pub history_separator: String,
}

/// Timeout policy (milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    /// Default bound for interactions and assertions
    pub default_ms: u64,
    /// Bound for steps following a network-dependent update
    pub network_ms: u64,
    /// Polling interval
    pub poll_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            default_ms: DEFAULT_TIMEOUT_MS,
            network_ms: NETWORK_TIMEOUT_MS,
            poll_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl Timeouts {
    /// Retry policy for ordinary steps
    #[must_use]
    pub const fn short(&self) -> RetryConfig {
        RetryConfig::new(Duration::from_millis(self.default_ms))
            .with_poll_interval(Duration::from_millis(self.poll_ms))
    }

    /// Retry policy for network-dependent steps
    #[must_use]
    pub const fn network(&self) -> RetryConfig {
        RetryConfig::new(Duration::from_millis(self.network_ms))
            .with_poll_interval(Duration::from_millis(self.poll_ms))
    }
}

/// Everything the scenarios need to know about the target site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteProfile {
    /// Root page URL
    pub base_url: String,
    /// Fixed affordance labels
    pub labels: UiLabels,
    /// Path exercised by the drill-down and asserted on
    pub target: CategoryPath,
    /// Path recorded first in the history scenario
    pub decoy: CategoryPath,
    /// Keyword searched in the history scenario
    pub keyword: String,
    /// Timeout policy
    #[serde(default)]
    pub timeouts: Timeouts,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self::mercari_jp()
    }
}

impl SiteProfile {
    /// Profile for jp.mercari.com.
    ///
    /// Tier 1 「本・雑誌・漫画」 replaced the retired 「本・音楽・ゲーム」.
    /// Tier 2 「本」 is also a substring of its parent's name, so it is
    /// selected by exact text.
    #[must_use]
    pub fn mercari_jp() -> Self {
        Self {
            base_url: "https://jp.mercari.com/".to_string(),
            labels: UiLabels {
                search_box: "検索".to_string(),
                category_entry: "カテゴリーからさがす".to_string(),
                clear_filters: "close".to_string(),
                keyword_field: "検索キーワードを入力".to_string(),
                history_test_id: "search-history".to_string(),
                results_heading_suffix: " の検索結果".to_string(),
                history_separator: ", ".to_string(),
            },
            target: CategoryPath::new(vec![
                CategoryNode::new("本・雑誌・漫画").with_code("5"),
                CategoryNode::new("本").with_code("72").by_exact_text(),
                CategoryNode::new("コンピュータ・IT"),
            ]),
            decoy: CategoryPath::new(vec![
                CategoryNode::new("ファッション"),
                CategoryNode::new("レディース"),
                CategoryNode::new("スカート"),
                CategoryNode::new("ロングスカート"),
                CategoryNode::new("フレアスカート"),
            ]),
            keyword: "javascript".to_string(),
            timeouts: Timeouts::default(),
        }
    }

    /// Parse a profile from YAML and validate it
    pub fn from_yaml_str(yaml: &str) -> ProbeResult<Self> {
        let profile: Self = serde_yaml_ng::from_str(yaml)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Load a profile from a YAML file
    pub fn from_path(path: &Path) -> ProbeResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loading site profile");
        Self::from_yaml_str(&yaml)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> ProbeResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Heading shown after a keyword search
    #[must_use]
    pub fn results_heading(&self, keyword: &str) -> String {
        format!("{keyword}{}", self.labels.results_heading_suffix)
    }

    /// Expected history text for a recorded action
    #[must_use]
    pub fn history_text(&self, keyword: Option<&str>, category: Option<&str>) -> String {
        history::entry_text(keyword, category, &self.labels.history_separator)
    }

    /// Check the profile for contradictions before any browser is launched
    pub fn validate(&self) -> ProbeResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ProbeError::config(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        let labels = [
            ("search_box", &self.labels.search_box),
            ("category_entry", &self.labels.category_entry),
            ("clear_filters", &self.labels.clear_filters),
            ("keyword_field", &self.labels.keyword_field),
            ("history_test_id", &self.labels.history_test_id),
        ];
        if let Some((name, _)) = labels.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(ProbeError::config(format!("label {name} is empty")));
        }
        if self.keyword.trim().is_empty() {
            return Err(ProbeError::config("keyword is empty"));
        }
        for (name, path) in [("target", &self.target), ("decoy", &self.decoy)] {
            if path.depth() == 0 {
                return Err(ProbeError::config(format!("{name} path is empty")));
            }
            if let Some(node) = path.nodes().iter().find(|n| n.label.trim().is_empty()) {
                return Err(ProbeError::config(format!(
                    "{name} path has an empty label next to {:?}",
                    node.code
                )));
            }
        }
        if self.target.depth() > MAX_TIER {
            return Err(ProbeError::config(format!(
                "target path has {} tiers, at most {MAX_TIER} are asserted",
                self.target.depth()
            )));
        }
        if self.target == self.decoy {
            return Err(ProbeError::config("decoy path must differ from target path"));
        }
        for (name, path, other) in [
            ("decoy", &self.decoy, &self.target),
            ("target", &self.target, &self.decoy),
        ] {
            if path.is_label_prefix_of(other) {
                return Err(ProbeError::config(format!(
                    "{name} path stops at {:?}, which is not a leaf category",
                    path.leaf_label()
                )));
            }
        }
        self.target.control_expectations()?;
        check_sibling_codes([&self.target, &self.decoy])
    }
}

/// A code identifies a node among its siblings: two different labels under
/// the same parent must not share a code, and one label must not carry two.
fn check_sibling_codes<'a>(paths: impl IntoIterator<Item = &'a CategoryPath>) -> ProbeResult<()> {
    let mut by_code: HashMap<(Vec<&str>, &str), &str> = HashMap::new();
    let mut by_label: HashMap<(Vec<&str>, &str), &str> = HashMap::new();

    for path in paths {
        let labels: Vec<&str> = path.nodes().iter().map(|n| n.label.as_str()).collect();
        for (i, node) in path.nodes().iter().enumerate() {
            let Some(code) = node.code.as_deref() else {
                continue;
            };
            let parent = labels[..i].to_vec();
            if let Some(other) = by_code.insert((parent.clone(), code), node.label.as_str()) {
                if other != node.label {
                    return Err(ProbeError::config(format!(
                        "code {code:?} used by sibling categories {other:?} and {:?}",
                        node.label
                    )));
                }
            }
            if let Some(other) = by_label.insert((parent, node.label.as_str()), code) {
                if other != code {
                    return Err(ProbeError::config(format!(
                        "category {:?} has conflicting codes {other:?} and {code:?}",
                        node.label
                    )));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;

    mod path_tests {
        use super::*;

        #[test]
        fn test_label_prefix() {
            let short = CategoryPath::new(vec![CategoryNode::new("a"), CategoryNode::new("b")]);
            let long = CategoryPath::new(vec![
                CategoryNode::new("a").with_code("1"),
                CategoryNode::new("b"),
                CategoryNode::new("c"),
            ]);
            assert!(short.is_label_prefix_of(&long));
            assert!(short.is_label_prefix_of(&short));
            assert!(!long.is_label_prefix_of(&short));
            assert!(!CategoryPath::new(vec![CategoryNode::new("x")]).is_label_prefix_of(&long));
        }

        #[test]
        fn test_default_target_expectations() {
            let profile = SiteProfile::mercari_jp();
            let expectations = profile.target.control_expectations().unwrap();
            assert_eq!(
                expectations,
                vec![
                    ControlExpectation { control: 1, code: "5".to_string() },
                    ControlExpectation { control: 2, code: "72".to_string() },
                ]
            );
            assert_eq!(profile.target.leaf_label(), "コンピュータ・IT");
        }

        #[test]
        fn test_tiers_are_one_based() {
            let profile = SiteProfile::mercari_jp();
            let tiers: Vec<usize> = profile.target.tiers().map(|(t, _)| t).collect();
            assert_eq!(tiers, vec![1, 2, 3]);
        }

        #[test]
        fn test_exact_text_node_locator() {
            let profile = SiteProfile::mercari_jp();
            let tier2 = &profile.target.nodes()[1];
            assert_eq!(tier2.link_locator(), Locator::exact_text("本"));
            let tier1 = &profile.target.nodes()[0];
            assert_eq!(tier1.link_locator(), Locator::role(Role::Link, "本・雑誌・漫画"));
        }

        #[test]
        fn test_missing_code_is_reported() {
            let path = CategoryPath::new(vec![CategoryNode::new("a"), CategoryNode::new("b")]);
            let err = path.control_expectations().unwrap_err();
            assert!(err.to_string().contains("tier 1"));
        }

        #[test]
        fn test_single_tier_has_no_controls() {
            let path = CategoryPath::new(vec![CategoryNode::new("leaf")]);
            assert!(path.control_expectations().unwrap().is_empty());
        }
    }

    mod validation_tests {
        use super::*;

        #[test]
        fn test_default_profile_is_valid() {
            SiteProfile::mercari_jp().validate().unwrap();
        }

        #[test]
        fn test_rejects_deep_target() {
            let mut profile = SiteProfile::mercari_jp();
            profile.target = CategoryPath::new(vec![
                CategoryNode::new("a").with_code("1"),
                CategoryNode::new("b").with_code("2"),
                CategoryNode::new("c").with_code("3"),
                CategoryNode::new("d"),
            ]);
            assert!(profile.validate().is_err());
        }

        #[test]
        fn test_rejects_sibling_code_clash() {
            let mut profile = SiteProfile::mercari_jp();
            profile.decoy = CategoryPath::new(vec![
                CategoryNode::new("メンズ").with_code("5"),
                CategoryNode::new("靴"),
            ]);
            let err = profile.validate().unwrap_err();
            assert!(err.to_string().contains("sibling"));
        }

        #[test]
        fn test_same_code_under_different_parents_is_fine() {
            let mut profile = SiteProfile::mercari_jp();
            profile.decoy = CategoryPath::new(vec![
                CategoryNode::new("メンズ").with_code("2"),
                CategoryNode::new("靴").with_code("72"),
                CategoryNode::new("スニーカー"),
            ]);
            profile.validate().unwrap();
        }

        #[test]
        fn test_rejects_non_http_base() {
            let mut profile = SiteProfile::mercari_jp();
            profile.base_url = "jp.mercari.com".to_string();
            assert!(profile.validate().is_err());
        }

        #[test]
        fn test_rejects_identical_paths() {
            let mut profile = SiteProfile::mercari_jp();
            profile.decoy = profile.target.clone();
            assert!(profile.validate().is_err());
        }

        #[test]
        fn test_rejects_decoy_ending_above_a_leaf() {
            let mut profile = SiteProfile::mercari_jp();
            profile.decoy = CategoryPath::new(vec![
                CategoryNode::new("本・雑誌・漫画").with_code("5"),
                CategoryNode::new("本"),
            ]);
            let err = profile.validate().unwrap_err();
            assert!(err.to_string().contains("decoy path stops at \"本\""));
        }

        #[test]
        fn test_rejects_target_ending_above_the_decoy() {
            let mut profile = SiteProfile::mercari_jp();
            profile.target = CategoryPath::new(vec![
                CategoryNode::new("ファッション").with_code("1"),
                CategoryNode::new("レディース"),
            ]);
            let err = profile.validate().unwrap_err();
            assert!(err.to_string().contains("target path stops at"));
        }

        #[test]
        fn test_sibling_leaf_decoy_is_fine() {
            let mut profile = SiteProfile::mercari_jp();
            profile.decoy = CategoryPath::new(vec![
                CategoryNode::new("本・雑誌・漫画").with_code("5"),
                CategoryNode::new("本").with_code("72"),
                CategoryNode::new("文学・小説"),
            ]);
            profile.validate().unwrap();
        }
    }

    mod yaml_tests {
        use super::*;

        #[test]
        fn test_yaml_round_trip_of_default() {
            let profile = SiteProfile::mercari_jp();
            let yaml = profile.to_yaml().unwrap();
            assert!(yaml.contains("exact_text"));
            assert_eq!(SiteProfile::from_yaml_str(&yaml).unwrap(), profile);
        }

        #[test]
        fn test_timeouts_default_when_omitted() {
            let mut profile = SiteProfile::mercari_jp();
            profile.timeouts = Timeouts::default();
            let yaml = profile.to_yaml().unwrap();
            let trimmed: String = yaml
                .lines()
                .take_while(|l| !l.starts_with("timeouts:"))
                .map(|l| format!("{l}\n"))
                .collect();
            let parsed = SiteProfile::from_yaml_str(&trimmed).unwrap();
            assert_eq!(parsed.timeouts, Timeouts::default());
        }

        #[test]
        fn test_from_path() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            file.write_all(SiteProfile::mercari_jp().to_yaml().unwrap().as_bytes())
                .unwrap();
            let profile = SiteProfile::from_path(file.path()).unwrap();
            assert_eq!(profile.keyword, "javascript");
        }

        #[test]
        fn test_invalid_yaml_is_an_error() {
            let err = SiteProfile::from_yaml_str("base_url: [").unwrap_err();
            assert!(matches!(err, ProbeError::Yaml(_)));
        }
    }

    mod timeout_tests {
        use super::*;

        #[test]
        fn test_short_and_network_policies() {
            let t = Timeouts::default();
            assert!(t.short().timeout < Duration::from_secs(1));
            assert!(t.network().timeout >= Duration::from_secs(10));
            assert_eq!(t.short().poll_interval, t.network().poll_interval);
        }
    }

    proptest! {
        #[test]
        fn prop_distinct_codes_always_validate(codes in proptest::collection::hash_set("[0-9]{1,3}", 2..3)) {
            let codes: Vec<String> = codes.into_iter().collect();
            let mut profile = SiteProfile::mercari_jp();
            profile.target = CategoryPath::new(vec![
                CategoryNode::new("t1").with_code(codes[0].clone()),
                CategoryNode::new("t2").with_code(codes[1].clone()),
                CategoryNode::new("leaf"),
            ]);
            prop_assert!(profile.validate().is_ok());
        }

        #[test]
        fn prop_shared_tier1_code_with_other_label_rejected(code in "[0-9]{1,3}") {
            let mut profile = SiteProfile::mercari_jp();
            profile.target = CategoryPath::new(vec![
                CategoryNode::new("t1").with_code(code.clone()),
                CategoryNode::new("leaf"),
            ]);
            profile.decoy = CategoryPath::new(vec![
                CategoryNode::new("other").with_code(code),
                CategoryNode::new("leaf"),
            ]);
            prop_assert!(profile.validate().is_err());
        }
    }
}
