//! Step-level execution traces.
//!
//! A [`TraceRecorder`] opens one span per executed scenario step and closes
//! it with the step's outcome. The resulting [`TraceArchive`] is written as
//! JSON next to an optional failure screenshot, so a failed run can be
//! inspected after the browser is gone.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};
use uuid::Uuid;

use crate::result::ProbeResult;

/// A traced span (one scenario step)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracedSpan {
    /// Unique span ID
    pub id: String,
    /// Span name (the step description)
    pub name: String,
    /// Start timestamp (ms since trace start)
    pub start_ms: u64,
    /// End timestamp (ms since trace start)
    pub end_ms: Option<u64>,
    /// Span duration
    pub duration_ms: Option<u64>,
    /// Span attributes
    pub attributes: BTreeMap<String, String>,
    /// Span status
    pub status: SpanStatus,
}

impl TracedSpan {
    /// Create a new span
    #[must_use]
    pub fn new(name: &str, start_ms: u64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            start_ms,
            end_ms: None,
            duration_ms: None,
            attributes: BTreeMap::new(),
            status: SpanStatus::Running,
        }
    }

    /// Add an attribute
    pub fn add_attribute(&mut self, key: &str, value: impl Into<String>) {
        self.attributes.insert(key.to_string(), value.into());
    }

    /// End the span
    pub fn end(&mut self, end_ms: u64) {
        self.end_ms = Some(end_ms);
        self.duration_ms = Some(end_ms.saturating_sub(self.start_ms));
        if self.status == SpanStatus::Running {
            self.status = SpanStatus::Ok;
        }
    }

    /// Mark as error
    pub fn mark_error(&mut self, message: &str) {
        self.status = SpanStatus::Error;
        self.add_attribute("error.message", message);
    }

    /// Check if span is complete
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.end_ms.is_some()
    }
}

/// Status of a span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanStatus {
    /// Step is running
    Running,
    /// Step completed
    Ok,
    /// Step failed
    Error,
    /// Step never finished (trace stopped first)
    Cancelled,
}

/// Metadata for a trace archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceMetadata {
    /// Trace ID
    pub trace_id: String,
    /// Scenario name
    pub scenario: String,
    /// Start time
    pub start_time: SystemTime,
    /// End time
    pub end_time: Option<SystemTime>,
    /// Total duration in ms
    pub duration_ms: Option<u64>,
    /// Number of spans
    pub span_count: usize,
    /// Scenario outcome, once known
    pub passed: Option<bool>,
    /// Crate version that produced the trace
    pub version: String,
}

impl TraceMetadata {
    /// Create new metadata
    #[must_use]
    pub fn new(scenario: &str) -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string(),
            scenario: scenario.to_string(),
            start_time: SystemTime::now(),
            end_time: None,
            duration_ms: None,
            span_count: 0,
            passed: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Complete trace of one scenario run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceArchive {
    /// Trace metadata
    pub metadata: TraceMetadata,
    /// One span per executed step
    pub spans: Vec<TracedSpan>,
    /// File name of the failure screenshot, relative to the archive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

impl TraceArchive {
    /// File stem shared by the archive and its screenshot
    #[must_use]
    pub fn file_stem(&self) -> String {
        format!("{}-{}", self.metadata.scenario, self.metadata.trace_id)
    }

    /// Save to `<dir>/<scenario>-<trace id>.json`, returning the path
    pub fn save_json(&self, dir: &Path) -> ProbeResult<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.json", self.file_stem()));
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json)?;
        tracing::info!(path = %path.display(), "trace saved");
        Ok(path)
    }

    /// Write a PNG screenshot next to the archive and reference it
    pub fn attach_screenshot(&mut self, dir: &Path, png: &[u8]) -> ProbeResult<PathBuf> {
        fs::create_dir_all(dir)?;
        let name = format!("{}.png", self.file_stem());
        let path = dir.join(&name);
        fs::write(&path, png)?;
        self.screenshot = Some(name);
        Ok(path)
    }

    /// Load archive from JSON file
    pub fn load_json(path: &Path) -> ProbeResult<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Spans that ended in error
    #[must_use]
    pub fn error_spans(&self) -> Vec<&TracedSpan> {
        self.spans
            .iter()
            .filter(|s| s.status == SpanStatus::Error)
            .collect()
    }
}

/// Records spans for one scenario run
#[derive(Debug)]
pub struct TraceRecorder {
    start: Instant,
    metadata: TraceMetadata,
    spans: Vec<TracedSpan>,
}

impl TraceRecorder {
    /// Start recording a scenario
    #[must_use]
    pub fn start(scenario: &str) -> Self {
        Self {
            start: Instant::now(),
            metadata: TraceMetadata::new(scenario),
            spans: Vec::new(),
        }
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Open a span for step `index` entering `state`
    pub fn begin_step(&mut self, index: usize, state: &str, step: &str) {
        let mut span = TracedSpan::new(step, self.elapsed_ms());
        span.add_attribute("step.index", index.to_string());
        span.add_attribute("step.state", state);
        self.spans.push(span);
    }

    /// Close the open span, recording the failure message if any
    pub fn end_step(&mut self, error: Option<&str>) {
        let now = self.elapsed_ms();
        if let Some(span) = self.spans.iter_mut().rev().find(|s| !s.is_complete()) {
            if let Some(message) = error {
                span.mark_error(message);
            }
            span.end(now);
        }
    }

    /// Number of spans so far
    #[must_use]
    pub fn span_count(&self) -> usize {
        self.spans.len()
    }

    /// Stop recording; unfinished spans are marked cancelled
    #[must_use]
    pub fn finish(mut self, passed: bool) -> TraceArchive {
        let end_ms = self.elapsed_ms();
        for span in &mut self.spans {
            if !span.is_complete() {
                span.end(end_ms);
                span.status = SpanStatus::Cancelled;
            }
        }
        self.metadata.end_time = Some(SystemTime::now());
        self.metadata.duration_ms = Some(end_ms);
        self.metadata.span_count = self.spans.len();
        self.metadata.passed = Some(passed);
        TraceArchive {
            metadata: self.metadata,
            spans: self.spans,
            screenshot: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod span_tests {
        use super::*;

        #[test]
        fn test_end_sets_duration_and_ok() {
            let mut span = TracedSpan::new("click", 10);
            span.end(35);
            assert_eq!(span.duration_ms, Some(25));
            assert_eq!(span.status, SpanStatus::Ok);
        }

        #[test]
        fn test_error_survives_end() {
            let mut span = TracedSpan::new("expect", 0);
            span.mark_error("boom");
            span.end(1);
            assert_eq!(span.status, SpanStatus::Error);
            assert_eq!(span.attributes["error.message"], "boom");
        }
    }

    mod recorder_tests {
        use super::*;

        #[test]
        fn test_steps_become_spans() {
            let mut rec = TraceRecorder::start("drill-down");
            rec.begin_step(0, "Navigated", "navigate");
            rec.end_step(None);
            rec.begin_step(1, "SearchOpened", "click");
            rec.end_step(Some("not found"));
            let archive = rec.finish(false);

            assert_eq!(archive.metadata.span_count, 2);
            assert_eq!(archive.metadata.passed, Some(false));
            assert_eq!(archive.error_spans().len(), 1);
            assert_eq!(archive.spans[1].attributes["step.state"], "SearchOpened");
        }

        #[test]
        fn test_unfinished_span_is_cancelled() {
            let mut rec = TraceRecorder::start("history");
            rec.begin_step(0, "Navigated", "navigate");
            let archive = rec.finish(false);
            assert_eq!(archive.spans[0].status, SpanStatus::Cancelled);
        }
    }

    mod archive_tests {
        use super::*;

        #[test]
        fn test_save_and_load() {
            let dir = tempfile::tempdir().unwrap();
            let mut rec = TraceRecorder::start("drill-down");
            rec.begin_step(0, "Navigated", "navigate");
            rec.end_step(None);
            let archive = rec.finish(true);

            let path = archive.save_json(dir.path()).unwrap();
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            assert!(name.starts_with("drill-down-"));
            assert!(name.ends_with(".json"));
            assert_eq!(TraceArchive::load_json(&path).unwrap(), archive);
        }

        #[test]
        fn test_screenshot_is_referenced() {
            let dir = tempfile::tempdir().unwrap();
            let mut archive = TraceRecorder::start("history").finish(false);
            let png = archive.attach_screenshot(dir.path(), b"\x89PNG").unwrap();
            assert!(png.exists());
            let json = archive.save_json(dir.path()).unwrap();
            let loaded = TraceArchive::load_json(&json).unwrap();
            assert_eq!(loaded.screenshot.as_deref(), png.file_name().and_then(|n| n.to_str()));
        }
    }
}
