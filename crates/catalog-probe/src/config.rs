//! Run configuration shared by the harness and the CLI.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::browser::BrowserConfig;
use crate::result::ProbeError;

/// When to keep a scenario's trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TraceMode {
    /// Never record
    Off,
    /// Always save
    On,
    /// Record every run, save only failures
    #[default]
    RetainOnFailure,
}

impl TraceMode {
    /// Whether a recorder is needed at all
    #[must_use]
    pub const fn records(self) -> bool {
        !matches!(self, Self::Off)
    }

    /// Whether a finished run's trace is written out
    #[must_use]
    pub const fn keeps(self, passed: bool) -> bool {
        match self {
            Self::Off => false,
            Self::On => true,
            Self::RetainOnFailure => !passed,
        }
    }
}

impl fmt::Display for TraceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Off => "off",
            Self::On => "on",
            Self::RetainOnFailure => "retain-on-failure",
        })
    }
}

impl FromStr for TraceMode {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(Self::Off),
            "on" => Ok(Self::On),
            "retain-on-failure" => Ok(Self::RetainOnFailure),
            other => Err(ProbeError::config(format!("unknown trace mode {other:?}"))),
        }
    }
}

/// How a suite is executed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Hide the browser window
    pub headless: bool,
    /// Trace retention
    pub trace: TraceMode,
    /// Where traces and screenshots go
    pub output_dir: PathBuf,
    /// Run scenarios concurrently, each in its own session
    pub parallel: bool,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Chromium sandbox (disable in containers)
    pub sandbox: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            headless: true,
            trace: TraceMode::default(),
            output_dir: PathBuf::from("catalog-probe-output"),
            parallel: false,
            chromium_path: None,
            sandbox: true,
            viewport_width: 1280,
            viewport_height: 800,
        }
    }
}

impl RunConfig {
    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set trace retention
    #[must_use]
    pub const fn with_trace(mut self, trace: TraceMode) -> Self {
        self.trace = trace;
        self
    }

    /// Set output directory
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Run scenarios concurrently
    #[must_use]
    pub const fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Browser launch options derived from this run
    #[must_use]
    pub fn browser_config(&self) -> BrowserConfig {
        let mut config = BrowserConfig::default()
            .with_headless(self.headless)
            .with_viewport(self.viewport_width, self.viewport_height);
        if let Some(path) = &self.chromium_path {
            config = config.with_chromium_path(path);
        }
        if !self.sandbox {
            config = config.with_no_sandbox();
        }
        config
    }
}
