//! The two acceptance scenarios, planned from a [`SiteProfile`].

use std::fmt;
use std::str::FromStr;

use super::{Scenario, ScenarioBuilder, ScenarioState as S, Step};
use crate::locator::{Locator, Role};
use crate::profile::{CategoryPath, SiteProfile};
use crate::result::{ProbeError, ProbeResult};
use crate::wait::WaitCondition;

/// Named scenarios the harness knows how to plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioKind {
    /// Category drill-down and filter assertion
    DrillDown,
    /// Search history recording and re-application
    History,
}

impl ScenarioKind {
    /// Every scenario, in run order
    pub const ALL: [Self; 2] = [Self::DrillDown, Self::History];

    /// Stable name used in reports and trace file names
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::DrillDown => "drill-down",
            Self::History => "history",
        }
    }

    /// Plan this scenario for `profile`
    pub fn plan(self, profile: &SiteProfile) -> ProbeResult<Scenario> {
        match self {
            Self::DrillDown => category_drill_down(profile),
            Self::History => history_verification(profile),
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScenarioKind {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ProbeError::config(format!("unknown scenario {s:?}")))
    }
}

/// Navigate to the root page, drill into `profile.target` and assert the
/// resulting filter state.
pub fn category_drill_down(profile: &SiteProfile) -> ProbeResult<Scenario> {
    profile.validate()?;
    let plan = ScenarioBuilder::new(ScenarioKind::DrillDown.name(), profile.timeouts);
    let plan = open_search(plan, profile);
    let plan = open_categories(plan, profile);
    let plan = drill(plan, &profile.target);
    let plan = wait_for_filter(plan, &profile.target, S::CategorySelected(profile.target.depth()))?;
    let plan = assert_filter_state(plan, &profile.target)?;
    plan.build()
}

/// Record the decoy and the target paths, check the history list, re-apply
/// the newest entry, then search by keyword and check the combined entry.
pub fn history_verification(profile: &SiteProfile) -> ProbeResult<Scenario> {
    profile.validate()?;
    let labels = &profile.labels;
    let leaf = profile.target.leaf_label();
    let keyword_field = Locator::label(&labels.keyword_field);

    let mut plan = ScenarioBuilder::new(ScenarioKind::History.name(), profile.timeouts);
    plan = open_search(plan, profile);
    for path in [&profile.decoy, &profile.target] {
        if plan.current_state() == S::FiltersCleared {
            plan = plan.network_step(search_box(profile), S::SearchOpened);
        }
        plan = open_categories(plan, profile);
        plan = drill(plan, path);
        plan = dismiss(plan, profile, S::CategorySelected(path.depth()));
    }

    plan = open_search(plan, profile);
    plan = assert_history(plan, profile, 2, &profile.history_text(None, Some(leaf)));

    // Round trip: the newest entry must restore the filter it recorded.
    plan = plan.step(
        Step::Click {
            target: history_items(profile).first(),
        },
        S::HistoryReapplied,
    );
    plan = wait_for_filter(plan, &profile.target, S::HistoryReapplied)?;
    plan = assert_filter_state(plan, &profile.target)?;

    plan = plan
        .step(
            Step::Fill {
                target: keyword_field.clone(),
                text: profile.keyword.clone(),
            },
            S::AssertedFilterState,
        )
        .step(
            Step::Submit {
                target: keyword_field,
            },
            S::SearchSubmitted,
        )
        .network_step(
            Step::WaitFor {
                target: Locator::role(Role::Heading, profile.results_heading(&profile.keyword)),
                condition: WaitCondition::Visible,
            },
            S::SearchSubmitted,
        );

    plan = open_search(plan, profile);
    plan = assert_history(
        plan,
        profile,
        3,
        &profile.history_text(Some(&profile.keyword), Some(leaf)),
    );
    plan.build()
}

fn search_box(profile: &SiteProfile) -> Step {
    Step::Click {
        target: Locator::role(Role::Search, &profile.labels.search_box),
    }
}

/// Entries of the search history list, newest first
fn history_items(profile: &SiteProfile) -> Locator {
    Locator::test_id(&profile.labels.history_test_id).locate(Locator::any_role(Role::Listitem))
}

/// Leaf indicator for a path
fn leaf_indicator(path: &CategoryPath) -> Locator {
    Locator::role(Role::Checkbox, path.leaf_label()).exact()
}

fn open_search(plan: ScenarioBuilder, profile: &SiteProfile) -> ScenarioBuilder {
    plan.network_step(
        Step::Navigate {
            url: profile.base_url.clone(),
        },
        S::Navigated,
    )
    .network_step(search_box(profile), S::SearchOpened)
}

fn open_categories(plan: ScenarioBuilder, profile: &SiteProfile) -> ScenarioBuilder {
    plan.step(
        Step::Click {
            target: Locator::role(Role::Link, &profile.labels.category_entry),
        },
        S::SearchOpened,
    )
}

/// Click every tier top-down; tiers after the first follow a page update
fn drill(mut plan: ScenarioBuilder, path: &CategoryPath) -> ScenarioBuilder {
    for (tier, node) in path.tiers() {
        let step = Step::Click {
            target: node.link_locator(),
        };
        plan = if tier == 1 {
            plan.step(step, S::CategorySelected(tier))
        } else {
            plan.network_step(step, S::CategorySelected(tier))
        };
    }
    plan
}

/// Wait for the filter to land: the deepest selection control reporting its
/// code, or the leaf indicator for a single-tier path.
fn wait_for_filter(
    plan: ScenarioBuilder,
    path: &CategoryPath,
    state: S,
) -> ProbeResult<ScenarioBuilder> {
    let step = match path.control_expectations()?.pop() {
        Some(deepest) => Step::WaitFor {
            target: Locator::any_role(Role::Combobox).nth(deepest.control),
            condition: WaitCondition::ValueEquals(deepest.code),
        },
        None => Step::WaitFor {
            target: leaf_indicator(path),
            condition: WaitCondition::Attached,
        },
    };
    Ok(plan.network_step(step, state))
}

fn assert_filter_state(mut plan: ScenarioBuilder, path: &CategoryPath) -> ProbeResult<ScenarioBuilder> {
    for expectation in path.control_expectations()? {
        plan = plan.step(
            Step::ExpectValue {
                target: Locator::any_role(Role::Combobox).nth(expectation.control),
                expected: expectation.code,
            },
            S::AssertedFilterState,
        );
    }
    Ok(plan.step(
        Step::ExpectChecked {
            target: leaf_indicator(path),
        },
        S::AssertedFilterState,
    ))
}

/// Wait for and click the dismiss control
fn dismiss(plan: ScenarioBuilder, profile: &SiteProfile, state: S) -> ScenarioBuilder {
    let close = Locator::label(&profile.labels.clear_filters);
    plan.network_step(
        Step::WaitFor {
            target: close.clone(),
            condition: WaitCondition::Visible,
        },
        state,
    )
    .network_step(Step::Click { target: close }, S::FiltersCleared)
}

fn assert_history(
    plan: ScenarioBuilder,
    profile: &SiteProfile,
    count: usize,
    newest: &str,
) -> ScenarioBuilder {
    plan.network_step(
        Step::ExpectCount {
            target: history_items(profile),
            expected: count,
        },
        S::AssertedHistory,
    )
    .step(
        Step::ExpectText {
            target: history_items(profile).first(),
            expected: newest.to_string(),
        },
        S::AssertedHistory,
    )
}
