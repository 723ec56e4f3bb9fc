//! Human-readable run output

use catalog_probe::{ScenarioOutcome, SuiteReport};
use console::{style, Style, Term};
use std::time::Duration;

/// Writes scenario results to stdout
#[derive(Debug)]
pub struct Reporter {
    term: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl Reporter {
    /// Create a new reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stdout(),
            use_color,
            quiet,
        }
    }

    /// Print a line unconditionally
    pub fn line(&self, text: &str) {
        let _ = self.term.write_line(text);
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };
        self.line(&format!("{prefix} {message}"));
    }

    /// Print one scenario's outcome; failures print even when quiet
    pub fn outcome(&self, outcome: &ScenarioOutcome) {
        if outcome.passed && self.quiet {
            return;
        }
        self.line(&outcome_line(outcome, self.use_color));
        if let Some(path) = &outcome.trace_path {
            self.info(&format!("trace: {}", path.display()));
        }
    }

    /// Print every outcome and the summary
    pub fn report(&self, report: &SuiteReport) {
        for outcome in &report.results {
            self.outcome(outcome);
        }
        if self.quiet && report.all_passed() {
            return;
        }
        self.line("");
        self.line(&summary_line(
            report.passed_count(),
            report.failed_count(),
            report.duration,
            self.use_color,
        ));
    }
}

/// `PASS drill-down (0.42s)` or `FAIL history (1.20s): <error>`
#[must_use]
pub fn outcome_line(outcome: &ScenarioOutcome, use_color: bool) -> String {
    let secs = outcome.duration.as_secs_f64();
    let prefix = match (outcome.passed, use_color) {
        (true, true) => style("✓").green().bold().to_string(),
        (false, true) => style("✗").red().bold().to_string(),
        (true, false) => "PASS".to_string(),
        (false, false) => "FAIL".to_string(),
    };
    match &outcome.error {
        Some(error) => format!("{prefix} {} ({secs:.2}s): {error}", outcome.name),
        None => format!("{prefix} {} ({secs:.2}s)", outcome.name),
    }
}

/// Final suite line
#[must_use]
pub fn summary_line(passed: usize, failed: usize, duration: Duration, use_color: bool) -> String {
    let total = passed + failed;
    let secs = duration.as_secs_f64();
    if use_color {
        let passed_style = Style::new().green().bold();
        let failed_style = Style::new().red().bold();
        let status = if failed > 0 {
            failed_style.apply_to("FAILED")
        } else {
            passed_style.apply_to("PASSED")
        };
        format!(
            "{status} {total} scenario(s) in {secs:.2}s ({} passed, {} failed)",
            passed_style.apply_to(passed),
            if failed > 0 {
                failed_style.apply_to(failed).to_string()
            } else {
                failed.to_string()
            },
        )
    } else {
        let status = if failed > 0 { "FAILED" } else { "PASSED" };
        format!("{status} {total} scenario(s) in {secs:.2}s ({passed} passed, {failed} failed)")
    }
}
