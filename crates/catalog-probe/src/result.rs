//! Result and error types for catalog-probe.

use thiserror::Error;

/// Result type for catalog-probe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that can occur while driving a scenario
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Descriptor matched zero elements at the moment of use
    #[error("Element not found: {descriptor} (waited {waited_ms}ms)")]
    ElementNotFound {
        /// Descriptor that failed to resolve
        descriptor: String,
        /// How long resolution was retried
        waited_ms: u64,
    },

    /// Descriptor matched several elements where exactly one was required
    #[error("Ambiguous match: {descriptor} resolved to {count} elements")]
    AmbiguousMatch {
        /// Descriptor that matched too much
        descriptor: String,
        /// Number of candidates found
        count: usize,
    },

    /// Element is present but hidden or disabled
    #[error("Element not interactable: {descriptor} ({reason})")]
    NotInteractable {
        /// Descriptor of the element
        descriptor: String,
        /// Why the element could not be used
        reason: String,
    },

    /// A readiness condition did not hold in time
    #[error("Timed out after {ms}ms waiting for {descriptor} to be {condition} (last seen: {observed})")]
    Timeout {
        /// Descriptor being waited on
        descriptor: String,
        /// Condition that never held
        condition: String,
        /// Last observation before giving up
        observed: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Observed UI state did not match the expectation
    #[error("Assertion failed on {descriptor}: expected {expected}, observed {observed}")]
    AssertionFailed {
        /// Descriptor that was asserted on
        descriptor: String,
        /// Expected value
        expected: String,
        /// Last observed value
        observed: String,
    },

    /// A scenario step failed; wraps the primitive's error
    #[error("Step {index} ({state}) failed: {step}: {source}")]
    StepFailed {
        /// Zero-based index of the failing step
        index: usize,
        /// State the step was entering
        state: String,
        /// Human readable step description
        step: String,
        /// Underlying failure
        #[source]
        source: Box<ProbeError>,
    },

    /// Scenario plan is not a legal walk through the state machine
    #[error("Invalid scenario: {message}")]
    InvalidScenario {
        /// Error message
        message: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Page-level error reported by the session
    #[error("Page error: {message}")]
    Page {
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl ProbeError {
    /// Create a page error
    #[must_use]
    pub fn page(message: impl Into<String>) -> Self {
        Self::Page {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid scenario error
    #[must_use]
    pub fn invalid_scenario(message: impl Into<String>) -> Self {
        Self::InvalidScenario {
            message: message.into(),
        }
    }

    /// The primitive error underneath any `StepFailed` wrapping
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::StepFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Whether the root cause is `ElementNotFound`
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self.root_cause(), Self::ElementNotFound { .. })
    }

    /// Whether the root cause is `AmbiguousMatch`
    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        matches!(self.root_cause(), Self::AmbiguousMatch { .. })
    }

    /// Whether the root cause is `NotInteractable`
    #[must_use]
    pub fn is_not_interactable(&self) -> bool {
        matches!(self.root_cause(), Self::NotInteractable { .. })
    }

    /// Whether the root cause is `Timeout`
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self.root_cause(), Self::Timeout { .. })
    }

    /// Whether the root cause is `AssertionFailed`
    #[must_use]
    pub fn is_assertion_failure(&self) -> bool {
        matches!(self.root_cause(), Self::AssertionFailed { .. })
    }

    /// Whether a poll that hit this error should simply try again.
    ///
    /// Page errors surface while a document is being replaced (a detached
    /// frame, a destroyed execution context) and clear once it settles.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Page { .. })
    }

    /// Step index for `StepFailed`, if any
    #[must_use]
    pub const fn step_index(&self) -> Option<usize> {
        match self {
            Self::StepFailed { index, .. } => Some(*index),
            _ => None,
        }
    }
}
