//! Scenario state machine.
//!
//! A [`Scenario`] is an ordered list of [`PlannedStep`]s. Each step names the
//! [`ScenarioState`] it enters and carries its own retry bound; the builder
//! rejects plans that take an illegal transition, such as jumping from tier
//! 1 to tier 3 of a category path.
//!
//! Failures are never retried at this level. Retries live inside the wait
//! and assertion primitives only.

pub mod plans;
pub mod runner;

use std::fmt;

use crate::assertion::retry::RetryConfig;
use crate::locator::Locator;
use crate::profile::Timeouts;
use crate::result::{ProbeError, ProbeResult};
use crate::wait::WaitCondition;

pub use plans::{category_drill_down, history_verification, ScenarioKind};
pub use runner::{ScenarioReport, ScenarioRunner};

/// Where a scenario is in its walk through the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioState {
    /// Nothing has happened yet
    Start,
    /// Root page loaded
    Navigated,
    /// Search panel open
    SearchOpened,
    /// Category link of the given 1-based tier clicked
    CategorySelected(usize),
    /// Applied filters dismissed
    FiltersCleared,
    /// Filter controls and leaf indicator checked
    AssertedFilterState,
    /// A history entry was clicked and its search re-applied
    HistoryReapplied,
    /// Keyword search submitted
    SearchSubmitted,
    /// History list checked
    AssertedHistory,
    /// Scenario complete
    End,
}

impl ScenarioState {
    /// Whether a step may move the scenario from `self` to `next`.
    ///
    /// Staying in the same state is allowed (waits, repeated assertions).
    /// Navigation is reachable from anywhere but `End`.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::End, _) => false,
            (_, Self::Navigated) => true,
            (a, b) if a == b => a != Self::Start,
            (Self::CategorySelected(n), Self::CategorySelected(m)) => m == n + 1,
            (
                Self::Navigated
                | Self::FiltersCleared
                | Self::AssertedFilterState
                | Self::SearchSubmitted,
                Self::SearchOpened,
            )
            | (
                Self::SearchOpened,
                Self::CategorySelected(1)
                | Self::HistoryReapplied
                | Self::SearchSubmitted
                | Self::AssertedHistory,
            )
            | (
                Self::CategorySelected(_) | Self::HistoryReapplied,
                Self::AssertedFilterState | Self::FiltersCleared,
            )
            | (Self::AssertedFilterState, Self::FiltersCleared | Self::SearchSubmitted)
            | (Self::AssertedHistory, Self::HistoryReapplied | Self::SearchSubmitted)
            | (
                Self::AssertedFilterState
                | Self::AssertedHistory
                | Self::FiltersCleared
                | Self::SearchSubmitted,
                Self::End,
            ) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => f.write_str("Start"),
            Self::Navigated => f.write_str("Navigated"),
            Self::SearchOpened => f.write_str("SearchOpened"),
            Self::CategorySelected(tier) => write!(f, "CategorySelected({tier})"),
            Self::FiltersCleared => f.write_str("FiltersCleared"),
            Self::AssertedFilterState => f.write_str("AssertedFilterState"),
            Self::HistoryReapplied => f.write_str("HistoryReapplied"),
            Self::SearchSubmitted => f.write_str("SearchSubmitted"),
            Self::AssertedHistory => f.write_str("AssertedHistory"),
            Self::End => f.write_str("End"),
        }
    }
}

/// One primitive invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Load a page
    Navigate {
        /// Target URL
        url: String,
    },
    /// Click an element
    Click {
        /// Element to click
        target: Locator,
    },
    /// Type into an input
    Fill {
        /// Input element
        target: Locator,
        /// Replacement value
        text: String,
    },
    /// Confirm an input with Enter
    Submit {
        /// Input element
        target: Locator,
    },
    /// Block until a readiness condition holds
    WaitFor {
        /// Element to watch
        target: Locator,
        /// Condition to reach
        condition: WaitCondition,
    },
    /// Assert a control's value
    ExpectValue {
        /// Control
        target: Locator,
        /// Expected value
        expected: String,
    },
    /// Assert a checkable indicator is checked
    ExpectChecked {
        /// Indicator
        target: Locator,
    },
    /// Assert the number of matching elements
    ExpectCount {
        /// Descriptor to count
        target: Locator,
        /// Expected count
        expected: usize,
    },
    /// Assert an element's normalized text
    ExpectText {
        /// Element
        target: Locator,
        /// Expected text
        expected: String,
    },
}

impl Step {
    /// Descriptor the step acts on, if any
    #[must_use]
    pub const fn target(&self) -> Option<&Locator> {
        match self {
            Self::Navigate { .. } => None,
            Self::Click { target }
            | Self::Fill { target, .. }
            | Self::Submit { target }
            | Self::WaitFor { target, .. }
            | Self::ExpectValue { target, .. }
            | Self::ExpectChecked { target }
            | Self::ExpectCount { target, .. }
            | Self::ExpectText { target, .. } => Some(target),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Navigate { url } => write!(f, "navigate to {url}"),
            Self::Click { target } => write!(f, "click {target}"),
            Self::Fill { target, text } => write!(f, "fill {target} with {text:?}"),
            Self::Submit { target } => write!(f, "submit {target}"),
            Self::WaitFor { target, condition } => write!(f, "wait for {target} to be {condition}"),
            Self::ExpectValue { target, expected } => {
                write!(f, "expect {target} to have value {expected:?}")
            }
            Self::ExpectChecked { target } => write!(f, "expect {target} to be checked"),
            Self::ExpectCount { target, expected } => {
                write!(f, "expect {target} to have count {expected}")
            }
            Self::ExpectText { target, expected } => {
                write!(f, "expect {target} to have text {expected:?}")
            }
        }
    }
}

/// A step together with the state it enters and its retry bound
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    /// What to do
    pub step: Step,
    /// State reached once the step succeeds
    pub enters: ScenarioState,
    /// Polling bound for the step's primitive
    pub retry: RetryConfig,
}

/// A validated, ordered plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    name: String,
    steps: Vec<PlannedStep>,
}

impl Scenario {
    /// Scenario name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Steps in execution order
    #[must_use]
    pub fn steps(&self) -> &[PlannedStep] {
        &self.steps
    }

    /// Number of steps
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the plan has no steps
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({} steps)", self.name, self.steps.len())?;
        for (i, planned) in self.steps.iter().enumerate() {
            writeln!(
                f,
                "{i:>3}. [{}] {} ({}ms)",
                planned.enters,
                planned.step,
                planned.retry.timeout_ms()
            )?;
        }
        Ok(())
    }
}

/// Builds a [`Scenario`], checking every transition
#[derive(Debug, Clone)]
pub struct ScenarioBuilder {
    name: String,
    timeouts: Timeouts,
    steps: Vec<PlannedStep>,
}

impl ScenarioBuilder {
    /// Start a plan; `timeouts` supplies the short and network bounds
    #[must_use]
    pub fn new(name: impl Into<String>, timeouts: Timeouts) -> Self {
        Self {
            name: name.into(),
            timeouts,
            steps: Vec::new(),
        }
    }

    /// Append a step with the default (short) bound
    #[must_use]
    pub fn step(self, step: Step, enters: ScenarioState) -> Self {
        let retry = self.timeouts.short();
        self.push(step, enters, retry)
    }

    /// Append a step that follows a network-dependent update
    #[must_use]
    pub fn network_step(self, step: Step, enters: ScenarioState) -> Self {
        let retry = self.timeouts.network();
        self.push(step, enters, retry)
    }

    /// Append a step with an explicit bound
    #[must_use]
    pub fn push(mut self, step: Step, enters: ScenarioState, retry: RetryConfig) -> Self {
        self.steps.push(PlannedStep {
            step,
            enters,
            retry,
        });
        self
    }

    /// State the plan is in after the steps added so far
    #[must_use]
    pub fn current_state(&self) -> ScenarioState {
        self.steps.last().map_or(ScenarioState::Start, |s| s.enters)
    }

    /// Validate the walk `Start → … → End` and produce the scenario
    pub fn build(self) -> ProbeResult<Scenario> {
        if self.steps.is_empty() {
            return Err(ProbeError::invalid_scenario(format!(
                "{} has no steps",
                self.name
            )));
        }
        let mut state = ScenarioState::Start;
        for (i, planned) in self.steps.iter().enumerate() {
            if !state.can_transition_to(planned.enters) {
                return Err(ProbeError::invalid_scenario(format!(
                    "{}: step {i} ({}) moves {state} -> {}, which is not a legal transition",
                    self.name, planned.step, planned.enters
                )));
            }
            state = planned.enters;
        }
        if !state.can_transition_to(ScenarioState::End) {
            return Err(ProbeError::invalid_scenario(format!(
                "{} cannot end in state {state}",
                self.name
            )));
        }
        Ok(Scenario {
            name: self.name,
            steps: self.steps,
        })
    }
}
