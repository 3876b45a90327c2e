//! Scripted source adapters for pipeline tests.

use argos::types::{Paper, Result};
use argos::{SourceAdapter, SourceFamily};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Build a minimally complete paper owned by `source`.
pub fn make_paper(source: &str, title: &str, doi: Option<&str>) -> Paper {
    Paper {
        id: format!("{source}_{title}"),
        title: title.to_string(),
        doi: doi.map(String::from),
        source: source.to_string(),
        sources_found_in: vec![source.to_string()],
        // A local PDF URL keeps the full-text resolver off the network.
        pdf_url: Some(format!("https://papers.test/{source}/{title}.pdf")),
        ..Default::default()
    }
}

/// Adapter returning a fixed record set, optionally after a delay or as a
/// scripted failure. Call counts are observable through a shared handle.
pub struct MockAdapter {
    id: String,
    family: SourceFamily,
    papers: Vec<Paper>,
    citations: Vec<Paper>,
    references: Vec<Paper>,
    fail: bool,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl MockAdapter {
    pub fn new(id: &str, family: SourceFamily, papers: Vec<Paper>) -> Self {
        Self {
            id: id.to_string(),
            family,
            papers,
            citations: Vec::new(),
            references: Vec::new(),
            fail: false,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(id: &str, family: SourceFamily) -> Self {
        let mut adapter = Self::new(id, family, Vec::new());
        adapter.fail = true;
        adapter
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_citations(mut self, citations: Vec<Paper>, references: Vec<Paper>) -> Self {
        self.citations = citations;
        self.references = references;
        self
    }

    /// Shared handle observing how many searches this adapter served.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl SourceAdapter for MockAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.id
    }

    fn family(&self) -> SourceFamily {
        self.family
    }

    fn supports_citations(&self) -> bool {
        !self.citations.is_empty() || !self.references.is_empty()
    }

    async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<Paper>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(argos::AppError::Transport("mock transport failure".into()));
        }
        Ok(self.papers.iter().take(max_results).cloned().collect())
    }

    async fn get_citations(&self, _identifier: &str, max_results: usize) -> Result<Vec<Paper>> {
        Ok(self.citations.iter().take(max_results).cloned().collect())
    }

    async fn get_references(&self, _identifier: &str, max_results: usize) -> Result<Vec<Paper>> {
        Ok(self.references.iter().take(max_results).cloned().collect())
    }
}
