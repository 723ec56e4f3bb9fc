//! Web-first assertions (Playwright's `expect()`).
//!
//! Each assertion polls the live page until it holds or its timeout
//! elapses, then fails with the descriptor, the expected value and the last
//! value it observed.
//!
//! ```ignore
//! expect(&Locator::any_role(Role::Combobox).nth(1))
//!     .to_have_value(&page, "5")
//!     .await?;
//! ```

pub mod retry;

use std::time::Duration;

use crate::locator::{normalize_whitespace, Locator, Resolution};
use crate::result::{ProbeError, ProbeResult};
use crate::session::{ElementState, PageSession};
use retry::{poll_until, Attempt, Polled, RetryConfig};

/// How text content is compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextMatch {
    /// Whitespace-normalized full match
    #[default]
    Normalized,
    /// Byte-for-byte match
    Exact,
}

impl TextMatch {
    fn matches(self, expected: &str, actual: &str) -> bool {
        match self {
            Self::Normalized => normalize_whitespace(expected) == normalize_whitespace(actual),
            Self::Exact => expected == actual,
        }
    }
}

/// What an assertion saw on its last poll
#[derive(Debug, Clone)]
enum Observation {
    Missing,
    Seen(String),
    Unsettled(String),
}

/// Smart assertion builder for locators
#[derive(Debug, Clone)]
pub struct Expect {
    locator: Locator,
    config: RetryConfig,
}

impl Expect {
    /// Create a new expectation for a locator
    #[must_use]
    pub fn new(locator: Locator) -> Self {
        Self {
            locator,
            config: RetryConfig::default(),
        }
    }

    /// Override the polling timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Override the whole retry configuration
    #[must_use]
    pub const fn with_config(mut self, config: RetryConfig) -> Self {
        self.config = config;
        self
    }

    /// Assert the control's current value (e.g. a selected option code)
    pub async fn to_have_value(
        &self,
        session: &dyn PageSession,
        expected: &str,
    ) -> ProbeResult<()> {
        self.check_element(session, &format!("value {expected:?}"), |state| {
            match state.value.as_deref() {
                Some(v) if v == expected => Ok(()),
                other => Err(format!("value {other:?}")),
            }
        })
        .await
    }

    /// Assert a checkable indicator is checked
    pub async fn to_be_checked(&self, session: &dyn PageSession) -> ProbeResult<()> {
        self.check_element(session, "checked", |state| match state.checked {
            Some(true) => Ok(()),
            Some(false) => Err("unchecked".to_string()),
            None => Err("not checkable".to_string()),
        })
        .await
    }

    /// Assert the element's text (whitespace-normalized full match)
    pub async fn to_have_text(&self, session: &dyn PageSession, expected: &str) -> ProbeResult<()> {
        self.text_with(session, expected, TextMatch::Normalized)
            .await
    }

    /// Assert the element's text byte-for-byte
    pub async fn to_have_exact_text(
        &self,
        session: &dyn PageSession,
        expected: &str,
    ) -> ProbeResult<()> {
        self.text_with(session, expected, TextMatch::Exact).await
    }

    /// Assert the element's text using an explicit comparison mode
    pub async fn text_with(
        &self,
        session: &dyn PageSession,
        expected: &str,
        mode: TextMatch,
    ) -> ProbeResult<()> {
        self.check_element(session, &format!("text {expected:?}"), |state| {
            if mode.matches(expected, &state.text) {
                Ok(())
            } else {
                Err(format!("text {:?}", state.text))
            }
        })
        .await
    }

    /// Assert how many elements the descriptor currently matches.
    ///
    /// Zero is a legitimate observation here, so a missing list is reported
    /// as `AssertionFailed`, not `ElementNotFound`.
    pub async fn to_have_count(&self, session: &dyn PageSession, expected: usize) -> ProbeResult<()> {
        let locator = &self.locator;
        tracing::debug!(%locator, expected, "expect count");

        let polled = poll_until(self.config, move || async move {
            let actual = match locator.count(session).await {
                Ok(actual) => actual,
                Err(e) if e.is_transient() => return Ok(Attempt::Pending(e.to_string())),
                Err(e) => return Err(e),
            };
            Ok(if actual == expected {
                Attempt::Ready(())
            } else {
                Attempt::Pending(format!("count {actual}"))
            })
        })
        .await?;

        match polled {
            Polled::Ready { .. } => Ok(()),
            Polled::Exhausted { last, .. } => Err(self.failed(&format!("count {expected}"), last)),
        }
    }

    async fn check_element<F>(&self, session: &dyn PageSession, expected: &str, check: F) -> ProbeResult<()>
    where
        F: Fn(&ElementState) -> Result<(), String>,
    {
        let locator = &self.locator;
        let check = &check;
        tracing::debug!(%locator, expected, "expect");

        let polled = poll_until(self.config, move || async move {
            let resolution = match locator.resolve(session).await {
                Ok(resolution) => resolution,
                Err(e) if e.is_transient() => {
                    return Ok(Attempt::Pending(Observation::Unsettled(e.to_string())));
                }
                Err(e) => return Err(e),
            };
            match resolution {
                Resolution::Found(el) => Ok(match check(&el.state) {
                    Ok(()) => Attempt::Ready(()),
                    Err(seen) => Attempt::Pending(Observation::Seen(seen)),
                }),
                Resolution::Missing => Ok(Attempt::Pending(Observation::Missing)),
                Resolution::Ambiguous { count } => Err(ProbeError::AmbiguousMatch {
                    descriptor: locator.to_string(),
                    count,
                }),
            }
        })
        .await?;

        match polled {
            Polled::Ready { .. } => Ok(()),
            Polled::Exhausted {
                last: Observation::Missing,
                ..
            } => {
                tracing::warn!(%locator, "assertion target never resolved");
                Err(ProbeError::ElementNotFound {
                    descriptor: locator.to_string(),
                    waited_ms: self.config.timeout_ms(),
                })
            }
            Polled::Exhausted {
                last: Observation::Seen(seen) | Observation::Unsettled(seen),
                ..
            } => Err(self.failed(expected, seen)),
        }
    }

    fn failed(&self, expected: &str, observed: String) -> ProbeError {
        tracing::warn!(locator = %self.locator, expected, observed = %observed, "assertion failed");
        ProbeError::AssertionFailed {
            descriptor: self.locator.to_string(),
            expected: expected.to_string(),
            observed,
        }
    }
}

/// Create an expectation for a locator (Playwright-style)
#[must_use]
pub fn expect(locator: &Locator) -> Expect {
    Expect::new(locator.clone())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::locator::Role;
    use crate::mock::{MockStorefront, ReloadingPage};
    use crate::profile::SiteProfile;

    const QUICK: Duration = Duration::from_millis(120);

    async fn top_page() -> (SiteProfile, MockStorefront) {
        let profile = SiteProfile::mercari_jp();
        let page = MockStorefront::new(&profile);
        page.goto(&profile.base_url).await.unwrap();
        (profile, page)
    }

    mod text_match_tests {
        use super::*;

        #[test]
        fn test_normalized_ignores_spacing() {
            assert!(TextMatch::Normalized.matches("a, b", " a,  b\n"));
            assert!(!TextMatch::Exact.matches("a, b", " a,  b\n"));
        }

        #[test]
        fn test_normalized_is_not_substring() {
            assert!(!TextMatch::Normalized.matches("コンピュータ・IT", "javascript, コンピュータ・IT"));
        }
    }

    mod expect_tests {
        use super::*;

        #[tokio::test]
        async fn test_to_have_text_passes() {
            let (_, page) = top_page().await;
            expect(&Locator::role(Role::Link, "ログイン"))
                .with_timeout(QUICK)
                .to_have_text(&page, "ログイン")
                .await
                .unwrap();
        }

        #[tokio::test]
        async fn test_to_have_text_reports_observed() {
            let (_, page) = top_page().await;
            let err = expect(&Locator::role(Role::Link, "ログイン"))
                .with_timeout(QUICK)
                .to_have_text(&page, "ログアウト")
                .await
                .unwrap_err();
            match err {
                ProbeError::AssertionFailed {
                    descriptor,
                    expected,
                    observed,
                } => {
                    assert!(descriptor.contains("ログイン"));
                    assert!(expected.contains("ログアウト"));
                    assert!(observed.contains("ログイン"));
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[tokio::test]
        async fn test_missing_target_is_not_found() {
            let (_, page) = top_page().await;
            let err = expect(&Locator::label("no-such-control"))
                .with_timeout(QUICK)
                .to_be_checked(&page)
                .await
                .unwrap_err();
            assert!(err.is_not_found());
        }

        #[tokio::test]
        async fn test_ambiguous_target_fails_without_waiting() {
            let (_, page) = top_page().await;
            let started = std::time::Instant::now();
            let err = expect(&Locator::any_role(Role::Link))
                .with_timeout(Duration::from_secs(5))
                .to_have_text(&page, "anything")
                .await
                .unwrap_err();
            assert!(err.is_ambiguous());
            assert!(started.elapsed() < Duration::from_secs(1));
        }

        #[tokio::test]
        async fn test_value_on_non_form_element() {
            let (_, page) = top_page().await;
            let err = expect(&Locator::role(Role::Link, "ログイン"))
                .with_timeout(QUICK)
                .to_have_value(&page, "5")
                .await
                .unwrap_err();
            assert!(err.is_assertion_failure());
            assert!(err.to_string().contains("None"));
        }

        #[tokio::test]
        async fn test_count_zero_is_observable() {
            let (_, page) = top_page().await;
            expect(&Locator::any_role(Role::Combobox))
                .with_timeout(QUICK)
                .to_have_count(&page, 0)
                .await
                .unwrap();
        }

        #[tokio::test]
        async fn test_count_mismatch_reports_actual() {
            let (_, page) = top_page().await;
            let err = expect(&Locator::any_role(Role::Combobox))
                .with_timeout(QUICK)
                .to_have_count(&page, 2)
                .await
                .unwrap_err();
            assert!(err.is_assertion_failure());
            assert!(err.to_string().contains("count 0"));
        }

        #[tokio::test]
        async fn test_value_checked_after_context_is_rebuilt() {
            let page = ReloadingPage::new(1, vec![ElementState::visible("本").with_value("72")]);
            expect(&Locator::any_role(Role::Combobox))
                .with_timeout(Duration::from_secs(2))
                .to_have_value(&page, "72")
                .await
                .unwrap();
            assert_eq!(page.queries(), 2);
        }

        #[tokio::test]
        async fn test_count_after_context_is_rebuilt() {
            let entries = vec![ElementState::visible("a"), ElementState::visible("b")];
            let page = ReloadingPage::new(2, entries);
            expect(&Locator::test_id("history"))
                .with_timeout(Duration::from_secs(2))
                .to_have_count(&page, 2)
                .await
                .unwrap();
            assert_eq!(page.queries(), 3);
        }

        #[tokio::test]
        async fn test_unsettled_page_fails_with_its_error_observed() {
            let page = ReloadingPage::new(usize::MAX, Vec::new());
            let err = expect(&Locator::any_role(Role::Checkbox))
                .with_timeout(QUICK)
                .to_be_checked(&page)
                .await
                .unwrap_err();
            assert!(err.is_assertion_failure());
            assert!(err.to_string().contains("Execution context was destroyed"));
        }
    }
}
