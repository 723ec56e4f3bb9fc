//! Executes a [`Scenario`] against a live session.

use std::time::{Duration, Instant};
use tracing::Instrument;

use super::{PlannedStep, Scenario, ScenarioState, Step};
use crate::assertion::expect;
use crate::interaction;
use crate::result::{ProbeError, ProbeResult};
use crate::session::PageSession;
use crate::trace::{TraceArchive, TraceRecorder};
use crate::wait::wait_for;

/// Outcome of one scenario run
#[derive(Debug)]
pub struct ScenarioReport {
    /// Scenario name
    pub scenario: String,
    /// Last state reached (`End` on success)
    pub final_state: ScenarioState,
    /// Steps attempted, including the failing one
    pub steps_run: usize,
    /// Wall time of the run
    pub duration: Duration,
    /// First failure, wrapped as `StepFailed`
    pub error: Option<ProbeError>,
    /// Step trace, when recording was requested
    pub trace: Option<TraceArchive>,
    /// Screenshot taken at the failure, if the session supports it
    pub screenshot: Option<Vec<u8>>,
}

impl ScenarioReport {
    /// Whether every step succeeded
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.error.is_none()
    }

    /// Index of the failing step
    #[must_use]
    pub fn failed_step(&self) -> Option<usize> {
        self.error.as_ref().and_then(ProbeError::step_index)
    }
}

/// Drives scenarios step by step; stops at the first failure
#[derive(Debug, Clone, Copy, Default)]
pub struct ScenarioRunner {
    record: bool,
}

impl ScenarioRunner {
    /// Runner without trace recording
    #[must_use]
    pub const fn new() -> Self {
        Self { record: false }
    }

    /// Record a step trace and a failure screenshot
    #[must_use]
    pub const fn with_trace(mut self, record: bool) -> Self {
        self.record = record;
        self
    }

    /// Run `scenario` on `session`
    pub async fn run(&self, scenario: &Scenario, session: &dyn PageSession) -> ScenarioReport {
        let span = tracing::info_span!("scenario", name = scenario.name());
        self.run_steps(scenario, session).instrument(span).await
    }

    async fn run_steps(&self, scenario: &Scenario, session: &dyn PageSession) -> ScenarioReport {
        let start = Instant::now();
        let mut recorder = self.record.then(|| TraceRecorder::start(scenario.name()));
        let mut state = ScenarioState::Start;
        let mut error = None;
        let mut steps_run = 0;

        tracing::info!(steps = scenario.len(), "scenario started");

        for (index, planned) in scenario.steps().iter().enumerate() {
            steps_run += 1;
            let step_desc = planned.step.to_string();
            if let Some(rec) = recorder.as_mut() {
                rec.begin_step(index, &planned.enters.to_string(), &step_desc);
            }

            let span = tracing::debug_span!("step", index, state = %planned.enters);
            let outcome = execute(planned, session).instrument(span).await;

            match outcome {
                Ok(()) => {
                    if let Some(rec) = recorder.as_mut() {
                        rec.end_step(None);
                    }
                    state = planned.enters;
                }
                Err(source) => {
                    let failure = ProbeError::StepFailed {
                        index,
                        state: planned.enters.to_string(),
                        step: step_desc,
                        source: Box::new(source),
                    };
                    tracing::error!(error = %failure, "scenario failed");
                    if let Some(rec) = recorder.as_mut() {
                        rec.end_step(Some(&failure.to_string()));
                    }
                    error = Some(failure);
                    break;
                }
            }
        }

        let passed = error.is_none();
        if passed {
            state = ScenarioState::End;
            tracing::info!(elapsed_ms = start.elapsed().as_millis() as u64, "scenario passed");
        }

        let screenshot = if self.record && !passed {
            match session.screenshot().await {
                Ok(png) => png,
                Err(e) => {
                    tracing::warn!(error = %e, "failure screenshot unavailable");
                    None
                }
            }
        } else {
            None
        };

        ScenarioReport {
            scenario: scenario.name().to_string(),
            final_state: state,
            steps_run,
            duration: start.elapsed(),
            error,
            trace: recorder.map(|rec| rec.finish(passed)),
            screenshot,
        }
    }
}

/// Dispatch one planned step to its primitive
async fn execute(planned: &PlannedStep, session: &dyn PageSession) -> ProbeResult<()> {
    let retry = planned.retry;
    match &planned.step {
        Step::Navigate { url } => interaction::navigate(session, url).await,
        Step::Click { target } => interaction::click(session, target, retry).await,
        Step::Fill { target, text } => interaction::fill(session, target, text, retry).await,
        Step::Submit { target } => interaction::submit(session, target, retry).await,
        Step::WaitFor { target, condition } => {
            let waited = wait_for(session, target, condition, retry).await?;
            tracing::debug!(elapsed_ms = waited.elapsed.as_millis() as u64, attempts = waited.attempts, "ready");
            Ok(())
        }
        Step::ExpectValue { target, expected } => {
            expect(target)
                .with_config(retry)
                .to_have_value(session, expected)
                .await
        }
        Step::ExpectChecked { target } => expect(target).with_config(retry).to_be_checked(session).await,
        Step::ExpectCount { target, expected } => {
            expect(target)
                .with_config(retry)
                .to_have_count(session, *expected)
                .await
        }
        Step::ExpectText { target, expected } => {
            expect(target)
                .with_config(retry)
                .to_have_text(session, expected)
                .await
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mock::{MockStorefront, StorefrontOptions};
    use crate::profile::{CategoryNode, CategoryPath, SiteProfile, Timeouts};
    use crate::scenario::{category_drill_down, history_verification};
    use crate::trace::SpanStatus;

    fn fast_profile() -> SiteProfile {
        let mut profile = SiteProfile::mercari_jp();
        profile.timeouts = Timeouts {
            default_ms: 150,
            network_ms: 300,
            poll_ms: 10,
        };
        profile
    }

    mod drill_down_tests {
        use super::*;

        #[tokio::test]
        async fn test_drill_down_passes() {
            let profile = fast_profile();
            let page = MockStorefront::new(&profile);
            let scenario = category_drill_down(&profile).unwrap();
            let report = ScenarioRunner::new().run(&scenario, &page).await;
            assert!(report.passed(), "{:?}", report.error);
            assert_eq!(report.final_state, ScenarioState::End);
            assert_eq!(report.steps_run, scenario.len());
            assert!(report.trace.is_none());
        }

        #[tokio::test]
        async fn test_drill_down_survives_render_latency() {
            let profile = fast_profile();
            let page = MockStorefront::with_options(
                &profile,
                StorefrontOptions::default().with_render_latency(3),
            );
            let scenario = category_drill_down(&profile).unwrap();
            let report = ScenarioRunner::new().run(&scenario, &page).await;
            assert!(report.passed(), "{:?}", report.error);
        }

        #[tokio::test]
        async fn test_wrong_code_fails_at_filter_assertion() {
            let profile = fast_profile();
            let page = MockStorefront::new(&profile);

            let mut expected = profile.clone();
            expected.target = CategoryPath::new(vec![
                CategoryNode::new("本・雑誌・漫画").with_code("5"),
                CategoryNode::new("本").with_code("99").by_exact_text(),
                CategoryNode::new("コンピュータ・IT"),
            ]);
            let scenario = category_drill_down(&expected).unwrap();
            let report = ScenarioRunner::new().with_trace(true).run(&scenario, &page).await;

            assert!(!report.passed());
            let err = report.error.as_ref().unwrap();
            // The wait on the deepest control times out before any assertion runs.
            assert!(err.root_cause().is_timeout());
            assert_eq!(report.failed_step(), Some(6));
            assert_eq!(report.final_state, ScenarioState::CategorySelected(3));

            let trace = report.trace.unwrap();
            assert_eq!(trace.spans.len(), 7);
            assert_eq!(trace.spans[6].status, SpanStatus::Error);
            assert_eq!(trace.metadata.passed, Some(false));
            assert!(report.screenshot.is_none());
        }

        #[tokio::test]
        async fn test_relabelled_category_is_not_found() {
            let profile = fast_profile();
            let page = MockStorefront::new(&profile);

            let mut expected = profile.clone();
            expected.target = CategoryPath::new(vec![
                CategoryNode::new("本・音楽・ゲーム").with_code("5"),
                CategoryNode::new("本").with_code("72").by_exact_text(),
                CategoryNode::new("コンピュータ・IT"),
            ]);
            let scenario = category_drill_down(&expected).unwrap();
            let report = ScenarioRunner::new().run(&scenario, &page).await;

            let err = report.error.unwrap();
            assert!(err.root_cause().is_not_found());
            assert!(err.to_string().contains("CategorySelected(1)"));
            assert!(err.to_string().contains("本・音楽・ゲーム"));
        }

        #[tokio::test]
        async fn test_tier2_by_role_is_ambiguous() {
            let profile = fast_profile();
            let page = MockStorefront::new(&profile);

            let mut expected = profile.clone();
            expected.target = CategoryPath::new(vec![
                CategoryNode::new("本・雑誌・漫画").with_code("5"),
                CategoryNode::new("本").with_code("72"),
                CategoryNode::new("コンピュータ・IT"),
            ]);
            let scenario = category_drill_down(&expected).unwrap();
            let report = ScenarioRunner::new().run(&scenario, &page).await;

            let err = report.error.unwrap();
            assert!(err.root_cause().is_ambiguous());
            assert_eq!(err.step_index(), Some(4));
        }

        #[tokio::test]
        async fn test_wrong_parent_code_is_assertion_failure() {
            let profile = fast_profile();
            let page = MockStorefront::new(&profile);

            let mut expected = profile.clone();
            expected.target = CategoryPath::new(vec![
                CategoryNode::new("本・雑誌・漫画").with_code("6"),
                CategoryNode::new("本").with_code("72").by_exact_text(),
                CategoryNode::new("コンピュータ・IT"),
            ]);
            let scenario = category_drill_down(&expected).unwrap();
            let report = ScenarioRunner::new().run(&scenario, &page).await;

            let err = report.error.unwrap();
            assert!(err.root_cause().is_assertion_failure());
            assert_eq!(err.step_index(), Some(7));
            let text = err.to_string();
            assert!(text.contains("(AssertedFilterState)"));
            assert!(text.contains("expected value \"6\""));
            assert!(text.contains("observed value Some(\"5\")"));
            assert_eq!(report.final_state, ScenarioState::CategorySelected(3));
        }
    }

    mod history_tests {
        use super::*;

        #[tokio::test]
        async fn test_history_passes() {
            let profile = fast_profile();
            let page = MockStorefront::new(&profile);
            let scenario = history_verification(&profile).unwrap();
            let report = ScenarioRunner::new().with_trace(true).run(&scenario, &page).await;
            assert!(report.passed(), "{:?}", report.error);
            assert_eq!(page.history_len().await, 3);

            let trace = report.trace.unwrap();
            assert_eq!(trace.spans.len(), scenario.len());
            assert!(trace.error_spans().is_empty());
        }

        #[tokio::test]
        async fn test_history_with_render_latency() {
            let profile = fast_profile();
            let page = MockStorefront::with_options(
                &profile,
                StorefrontOptions::default().with_render_latency(2),
            );
            let report = ScenarioRunner::new()
                .run(&history_verification(&profile).unwrap(), &page)
                .await;
            assert!(report.passed(), "{:?}", report.error);
        }

        #[tokio::test]
        async fn test_stale_history_fails_count() {
            let profile = fast_profile();
            let page = MockStorefront::new(&profile);
            // A previous run leaves history behind: the count no longer matches.
            let first = ScenarioRunner::new()
                .run(&history_verification(&profile).unwrap(), &page)
                .await;
            assert!(first.passed());

            let mut other = profile.clone();
            other.keyword = "rust".to_string();
            let second = ScenarioRunner::new()
                .run(&history_verification(&other).unwrap(), &page)
                .await;
            let err = second.error.unwrap();
            assert!(err.root_cause().is_assertion_failure());
            assert!(err.to_string().contains("count 2"));
            assert!(err.to_string().contains("count 3"));
        }
    }
}
