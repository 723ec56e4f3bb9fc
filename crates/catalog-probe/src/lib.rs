//! catalog-probe: acceptance scenarios for a storefront's category
//! drill-down and search history.
//!
//! Scenarios are planned from a [`SiteProfile`] into explicit state
//! machines, then driven step by step against a [`PageSession`]: a real
//! Chromium page over CDP (`browser` feature) or the in-memory
//! [`mock::MockStorefront`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌───────────────┐   ┌────────────┐
//! │ SiteProfile  │──►│ Scenario     │──►│ ScenarioRunner│──►│ PageSession│
//! │ (labels,     │   │ (planned     │   │ (wait/expect/ │   │ (CDP or    │
//! │  paths)      │   │  steps)      │   │  interact)    │   │  mock)     │
//! └──────────────┘   └──────────────┘   └───────────────┘   └────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use catalog_probe::mock::MockStorefront;
//! use catalog_probe::{category_drill_down, ScenarioRunner, SiteProfile};
//!
//! # async fn demo() -> catalog_probe::ProbeResult<()> {
//! let profile = SiteProfile::mercari_jp();
//! let page = MockStorefront::new(&profile);
//! let report = ScenarioRunner::new()
//!     .run(&category_drill_down(&profile)?, &page)
//!     .await;
//! assert!(report.passed());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod assertion;
mod browser;
mod config;
mod harness;
mod history;
mod interaction;
mod locator;
mod profile;
mod result;
mod session;
mod trace;
mod wait;

/// In-memory storefront for exercising scenarios without a browser
pub mod mock;

/// Scenario state machine, plans and runner
pub mod scenario;

pub use assertion::retry::{
    poll_until, Attempt, Polled, RetryConfig, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS,
    NETWORK_TIMEOUT_MS,
};
pub use assertion::{expect, Expect, TextMatch};
#[cfg(feature = "browser")]
pub use browser::{Browser, BrowserSessionFactory, CdpSession};
pub use browser::BrowserConfig;
pub use config::{RunConfig, TraceMode};
pub use harness::{Harness, ScenarioOutcome, SuiteReport};
pub use history::{entry_text, HistoryEntry, HistoryLog};
pub use interaction::{click, fill, navigate, submit, SUBMIT_KEY};
pub use locator::{
    normalize_whitespace, text_matches, ElementFacts, Locator, Resolution, ResolvedElement, Role,
    Selector,
};
pub use profile::{
    CategoryNode, CategoryPath, ControlExpectation, LinkMatch, SiteProfile, Timeouts, UiLabels,
    MAX_TIER,
};
pub use result::{ProbeError, ProbeResult};
pub use scenario::{
    category_drill_down, history_verification, PlannedStep, Scenario, ScenarioBuilder,
    ScenarioKind, ScenarioReport, ScenarioRunner, ScenarioState, Step,
};
pub use session::{ElementState, PageSession, SessionFactory};
pub use trace::{SpanStatus, TraceArchive, TraceMetadata, TraceRecorder, TracedSpan};
pub use wait::{wait_for, WaitCondition, WaitResult};

/// Prelude for scenario authors
pub mod prelude {
    pub use super::{
        expect, wait_for, Locator, PageSession, ProbeError, ProbeResult, Role, Scenario,
        ScenarioRunner, SiteProfile, WaitCondition,
    };
}
