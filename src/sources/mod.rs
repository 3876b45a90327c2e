//! Source adapters for scholarly data providers.
//!
//! Each adapter wraps one external provider behind the [`SourceAdapter`]
//! trait and enforces its own token-bucket rate limit. The orchestrator
//! only ever talks to the trait; it never needs to know which concrete
//! provider it is calling.
//!
//! The forty-plus providers the system can reach collapse into a handful of
//! wire patterns. Dedicated modules implement one reference adapter per
//! pattern (PubMed two-step XML, arXiv Atom, CrossRef REST, Semantic Scholar
//! graph API, OpenAlex polite REST, Dimensions DSL-POST, DuckDuckGo HTML);
//! everything else is driven by the descriptor table in [`descriptor`]
//! through the generic [`rest::RestAdapter`].

pub mod arxiv;
pub mod crossref;
pub mod descriptor;
pub mod dimensions;
pub mod duckduckgo;
pub mod openalex;
pub mod pubmed;
pub mod registry;
pub mod rest;
pub mod scholar;
pub mod semantic_scholar;
pub mod unpaywall;

pub use registry::SourceRegistry;

use crate::types::{AppError, Paper, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Coarse grouping used by the orchestrator to pick the adapters for each
/// fan-out phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFamily {
    /// Priority bibliographic indexes (PubMed, arXiv, CrossRef, ...).
    Academic,
    /// Google-Scholar-class search.
    Scholar,
    /// Citation graph databases (Dimensions, Lens, Scopus, Web of Science).
    CitationIndex,
    /// Publishers with direct APIs (Springer, IEEE).
    Publisher,
    /// Preprint servers (bioRxiv, medRxiv, ChemRxiv).
    Preprint,
    /// Alternative/general web search.
    GeneralSearch,
}

/// Capability-typed adapter contract.
///
/// `search` must tolerate provider failure: callers translate errors into
/// empty contributions plus an error progress event, so adapters report
/// faults honestly instead of papering over them. Optional capabilities
/// default to a `search` fallback (publisher filter) or an empty result
/// (citation lookups).
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable source identifier, e.g. `pubmed`.
    fn id(&self) -> &str;

    /// Human-readable provider name, e.g. `PubMed/MEDLINE`.
    fn name(&self) -> &str;

    fn family(&self) -> SourceFamily;

    /// False when required credentials are missing; unavailable adapters are
    /// omitted from the registry.
    fn available(&self) -> bool {
        true
    }

    /// True when `get_citations`/`get_references` return real data.
    fn supports_citations(&self) -> bool {
        false
    }

    /// Free-text search returning up to `max_results` records, each tagged
    /// with this adapter's source identifier.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Paper>>;

    /// Server-side publisher filter. Adapters without one fall back to a
    /// plain search.
    async fn search_by_publisher(
        &self,
        query: &str,
        _publisher: &str,
        max_results: usize,
    ) -> Result<Vec<Paper>> {
        self.search(query, max_results).await
    }

    /// Papers citing the given DOI/identifier.
    async fn get_citations(&self, _identifier: &str, _max_results: usize) -> Result<Vec<Paper>> {
        Ok(Vec::new())
    }

    /// Papers referenced by the given DOI/identifier.
    async fn get_references(&self, _identifier: &str, _max_results: usize) -> Result<Vec<Paper>> {
        Ok(Vec::new())
    }
}

/// Shared HTTP client for all adapters. Identifies the crate to polite-pool
/// providers via the configured contact email.
pub fn build_http_client(email: &str, timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(format!("argos/0.1 (mailto:{email})"))
        .build()
        .map_err(|e| AppError::Configuration(format!("failed to build HTTP client: {e}")))
}

/// Map a non-success HTTP status to the error taxonomy.
pub(crate) fn check_status(response: reqwest::Response, source: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(AppError::RateLimited(format!("{source}: HTTP 429")));
    }
    if !status.is_success() {
        return Err(AppError::Transport(format!("{source}: HTTP {status}")));
    }
    Ok(response)
}

/// Boundary pass applied to every adapter result: drop records without any
/// identity, tag provenance, and assign a stable id.
pub(crate) fn finalize(mut papers: Vec<Paper>, source_id: &str) -> Vec<Paper> {
    papers.retain(Paper::has_identity);
    for paper in &mut papers {
        if paper.source.is_empty() {
            paper.source = source_id.to_string();
        }
        paper.add_source(source_id);
        if paper.id.is_empty() {
            paper.id = derive_id(paper, source_id);
        }
    }
    papers
}

fn derive_id(paper: &Paper, source_id: &str) -> String {
    if let Some(doi) = &paper.doi {
        format!("{source_id}_{}", doi.replace('/', "_"))
    } else if let Some(pmid) = &paper.pmid {
        format!("{source_id}_{pmid}")
    } else if let Some(arxiv_id) = &paper.arxiv_id {
        format!("{source_id}_{arxiv_id}")
    } else {
        format!(
            "{source_id}_{}",
            crate::utils::text::normalize_title(&paper.title).replace(' ', "_")
        )
    }
}
