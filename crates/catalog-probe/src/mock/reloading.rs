//! A page that is mid-navigation for its first few queries.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::locator::Locator;
use crate::result::{ProbeError, ProbeResult};
use crate::session::{ElementState, PageSession};

/// Fails the first `unsettled` queries with a destroyed-context page error,
/// then answers every query with the same candidates.
#[derive(Debug)]
pub(crate) struct ReloadingPage {
    unsettled: usize,
    candidates: Vec<ElementState>,
    queries: AtomicUsize,
    clicks: Mutex<Vec<usize>>,
}

impl ReloadingPage {
    pub(crate) fn new(unsettled: usize, candidates: Vec<ElementState>) -> Self {
        Self {
            unsettled,
            candidates,
            queries: AtomicUsize::new(0),
            clicks: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub(crate) fn clicks(&self) -> Vec<usize> {
        self.clicks.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PageSession for ReloadingPage {
    async fn goto(&self, _url: &str) -> ProbeResult<()> {
        Ok(())
    }

    async fn query(&self, _locator: &Locator) -> ProbeResult<Vec<ElementState>> {
        if self.queries.fetch_add(1, Ordering::SeqCst) < self.unsettled {
            return Err(ProbeError::page("Execution context was destroyed"));
        }
        Ok(self.candidates.clone())
    }

    async fn click(&self, _locator: &Locator, index: usize) -> ProbeResult<()> {
        if let Ok(mut clicks) = self.clicks.lock() {
            clicks.push(index);
        }
        Ok(())
    }

    async fn fill(&self, _locator: &Locator, _index: usize, _text: &str) -> ProbeResult<()> {
        Ok(())
    }

    async fn press(&self, _locator: &Locator, _index: usize, _key: &str) -> ProbeResult<()> {
        Ok(())
    }

    async fn current_url(&self) -> ProbeResult<String> {
        Ok("about:blank".to_string())
    }
}
