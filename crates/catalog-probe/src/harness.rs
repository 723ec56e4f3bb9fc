//! Harness for running scenario suites.
//!
//! Each scenario gets a fresh session from the [`SessionFactory`], so runs
//! share no cookies, history or page state. Suites run sequentially or
//! concurrently on one task via `join_all`.

use futures::future::join_all;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::config::RunConfig;
use crate::profile::SiteProfile;
use crate::result::ProbeResult;
use crate::scenario::{Scenario, ScenarioKind, ScenarioReport, ScenarioRunner};
use crate::session::SessionFactory;

/// Result of running a single scenario
#[derive(Debug, Clone)]
pub struct ScenarioOutcome {
    /// Scenario name
    pub name: String,
    /// Whether the scenario passed
    pub passed: bool,
    /// Error message if failed
    pub error: Option<String>,
    /// Index of the failing step
    pub failed_step: Option<usize>,
    /// Scenario duration
    pub duration: Duration,
    /// Saved trace, if kept
    pub trace_path: Option<PathBuf>,
}

impl ScenarioOutcome {
    /// Create a passing outcome
    #[must_use]
    pub fn pass(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            error: None,
            failed_step: None,
            duration: Duration::ZERO,
            trace_path: None,
        }
    }

    /// Create a failing outcome
    #[must_use]
    pub fn fail(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            error: Some(error.into()),
            failed_step: None,
            duration: Duration::ZERO,
            trace_path: None,
        }
    }

    /// Set duration
    #[must_use]
    pub const fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    fn from_report(report: &ScenarioReport) -> Self {
        let outcome = match &report.error {
            None => Self::pass(&report.scenario),
            Some(err) => Self {
                failed_step: err.step_index(),
                ..Self::fail(&report.scenario, err.to_string())
            },
        };
        outcome.with_duration(report.duration)
    }
}

/// Results from running a suite
#[derive(Debug, Clone, Default)]
pub struct SuiteReport {
    /// Individual scenario outcomes, in request order
    pub results: Vec<ScenarioOutcome>,
    /// Total duration
    pub duration: Duration,
}

impl SuiteReport {
    /// Check if all scenarios passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    /// Count passed scenarios
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    /// Count failed scenarios
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.passed).count()
    }

    /// Get total scenario count
    #[must_use]
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Get failed scenarios
    #[must_use]
    pub fn failures(&self) -> Vec<&ScenarioOutcome> {
        self.results.iter().filter(|r| !r.passed).collect()
    }
}

/// Runs scenarios planned from one profile against sessions from one factory
#[derive(Debug)]
pub struct Harness<F> {
    factory: F,
    profile: SiteProfile,
    config: RunConfig,
}

impl<F: SessionFactory> Harness<F> {
    /// Create a harness
    #[must_use]
    pub const fn new(factory: F, profile: SiteProfile, config: RunConfig) -> Self {
        Self {
            factory,
            profile,
            config,
        }
    }

    /// Run configuration in use
    #[must_use]
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Plan and run `kinds`.
    ///
    /// Planning errors (an invalid profile) abort before any session is
    /// opened; scenario failures are reported in the [`SuiteReport`].
    pub async fn run(&self, kinds: &[ScenarioKind]) -> ProbeResult<SuiteReport> {
        let scenarios = kinds
            .iter()
            .map(|kind| kind.plan(&self.profile))
            .collect::<ProbeResult<Vec<_>>>()?;

        let start = Instant::now();
        tracing::info!(
            scenarios = scenarios.len(),
            parallel = self.config.parallel,
            "running suite"
        );

        let results = if self.config.parallel {
            join_all(scenarios.iter().map(|s| self.run_one(s))).await
        } else {
            let mut results = Vec::with_capacity(scenarios.len());
            for scenario in &scenarios {
                results.push(self.run_one(scenario).await);
            }
            results
        };

        Ok(SuiteReport {
            results,
            duration: start.elapsed(),
        })
    }

    async fn run_one(&self, scenario: &Scenario) -> ScenarioOutcome {
        let session = match self.factory.open().await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(scenario = scenario.name(), error = %e, "could not open session");
                return ScenarioOutcome::fail(scenario.name(), e.to_string());
            }
        };

        let runner = ScenarioRunner::new().with_trace(self.config.trace.records());
        let report = runner.run(scenario, &session).await;

        if let Err(e) = self.factory.close(session).await {
            tracing::warn!(scenario = scenario.name(), error = %e, "session teardown failed");
        }

        let mut outcome = ScenarioOutcome::from_report(&report);
        if self.config.trace.keeps(report.passed()) {
            match self.persist(report) {
                Ok(path) => outcome.trace_path = path,
                Err(e) => tracing::warn!(scenario = scenario.name(), error = %e, "trace not saved"),
            }
        }
        outcome
    }

    fn persist(&self, report: ScenarioReport) -> ProbeResult<Option<PathBuf>> {
        let Some(mut archive) = report.trace else {
            return Ok(None);
        };
        let dir = &self.config.output_dir;
        if let Some(png) = &report.screenshot {
            archive.attach_screenshot(dir, png)?;
        }
        archive.save_json(dir).map(Some)
    }
}
