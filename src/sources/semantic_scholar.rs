//! Semantic Scholar adapter over the Graph API.
//!
//! Besides search this is the citation-network workhorse: the
//! `paper/{id}/citations` and `paper/{id}/references` endpoints back the
//! citation expansion phase. Works keyless on the public tier; an API key
//! only raises the rate limit.

use super::{check_status, finalize, SourceAdapter, SourceFamily};
use crate::types::{AccessType, Paper, Result, SourceType};
use crate::utils::RateLimiter;
use async_trait::async_trait;
use serde::Deserialize;

const BASE_URL: &str = "https://api.semanticscholar.org/graph/v1";

const PAPER_FIELDS: &str =
    "title,abstract,year,authors,citationCount,externalIds,openAccessPdf,venue,publicationTypes";

pub struct SemanticScholarAdapter {
    client: reqwest::Client,
    limiter: RateLimiter,
    api_key: Option<String>,
    base_url: String,
}

impl SemanticScholarAdapter {
    pub fn new(
        client: reqwest::Client,
        rate_limit_per_minute: u32,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            limiter: RateLimiter::per_minute(rate_limit_per_minute),
            api_key,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Point the adapter at a different endpoint. Used by tests.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        self.limiter.acquire().await;

        let mut request = self.client.get(url).query(query);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key.as_str());
        }
        let response = check_status(request.send().await?, "semantic_scholar")?;
        Ok(response.json().await?)
    }

    /// Identifier accepted by the graph API: bare DOIs work as-is.
    fn paper_path(&self, identifier: &str) -> String {
        format!("{}/paper/{}", self.base_url, identifier)
    }

    async fn linked_papers(
        &self,
        identifier: &str,
        direction: &str,
        max_results: usize,
    ) -> Result<Vec<Paper>> {
        let url = format!("{}/{}", self.paper_path(identifier), direction);
        let limit = max_results.min(100).to_string();
        let body: LinkedResponse = self
            .get_json(&url, &[("fields", PAPER_FIELDS), ("limit", limit.as_str())])
            .await?;

        let field: fn(LinkedEntry) -> Option<GraphPaper> = if direction == "citations" {
            |entry| entry.citing_paper
        } else {
            |entry| entry.cited_paper
        };
        let papers = body
            .data
            .into_iter()
            .filter_map(field)
            .map(parse_paper)
            .collect();
        Ok(finalize(papers, "semantic_scholar"))
    }
}

#[async_trait]
impl SourceAdapter for SemanticScholarAdapter {
    fn id(&self) -> &str {
        "semantic_scholar"
    }

    fn name(&self) -> &str {
        "Semantic Scholar"
    }

    fn family(&self) -> SourceFamily {
        SourceFamily::Academic
    }

    fn supports_citations(&self) -> bool {
        true
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Paper>> {
        let url = format!("{}/paper/search", self.base_url);
        let limit = max_results.min(100).to_string();
        let body: SearchResponse = self
            .get_json(
                &url,
                &[
                    ("query", query),
                    ("fields", PAPER_FIELDS),
                    ("limit", limit.as_str()),
                ],
            )
            .await?;

        let papers: Vec<Paper> = body.data.into_iter().map(parse_paper).collect();
        tracing::debug!(count = papers.len(), "Semantic Scholar search complete");
        Ok(finalize(papers, "semantic_scholar"))
    }

    async fn get_citations(&self, identifier: &str, max_results: usize) -> Result<Vec<Paper>> {
        self.linked_papers(identifier, "citations", max_results)
            .await
    }

    async fn get_references(&self, identifier: &str, max_results: usize) -> Result<Vec<Paper>> {
        self.linked_papers(identifier, "references", max_results)
            .await
    }
}

fn parse_paper(item: GraphPaper) -> Paper {
    let (doi, pmid, arxiv_id) = item
        .external_ids
        .map(|ids| (ids.doi, ids.pub_med, ids.arxiv))
        .unwrap_or((None, None, None));

    let source_type = item
        .publication_types
        .as_deref()
        .map(|types| {
            if types.iter().any(|t| t == "Conference") {
                SourceType::Conference
            } else if types.iter().any(|t| t == "JournalArticle" || t == "Review") {
                SourceType::PeerReviewed
            } else {
                SourceType::Unknown
            }
        })
        .unwrap_or(SourceType::Unknown);

    let pdf_url = item.open_access_pdf.and_then(|pdf| pdf.url);

    Paper {
        title: item.title.unwrap_or_default(),
        authors: item
            .authors
            .into_iter()
            .filter_map(|a| a.name)
            .collect(),
        year: item.year,
        abstract_text: item.abstract_text,
        journal: item.venue.filter(|v| !v.is_empty()),
        doi,
        pmid,
        arxiv_id,
        citation_count: item.citation_count,
        access_type: if pdf_url.is_some() {
            AccessType::Open
        } else {
            AccessType::Unknown
        },
        pdf_url,
        source_type,
        ..Default::default()
    }
}

// ============= Wire Types =============

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<GraphPaper>,
}

#[derive(Debug, Deserialize)]
struct LinkedResponse {
    #[serde(default)]
    data: Vec<LinkedEntry>,
}

#[derive(Debug, Deserialize)]
struct LinkedEntry {
    #[serde(rename = "citingPaper")]
    citing_paper: Option<GraphPaper>,
    #[serde(rename = "citedPaper")]
    cited_paper: Option<GraphPaper>,
}

#[derive(Debug, Deserialize)]
struct GraphPaper {
    title: Option<String>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    year: Option<i32>,
    #[serde(default)]
    authors: Vec<GraphAuthor>,
    #[serde(rename = "citationCount")]
    citation_count: Option<u32>,
    #[serde(rename = "externalIds")]
    external_ids: Option<ExternalIds>,
    #[serde(rename = "openAccessPdf")]
    open_access_pdf: Option<OpenAccessPdf>,
    venue: Option<String>,
    #[serde(rename = "publicationTypes")]
    publication_types: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct GraphAuthor {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExternalIds {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(rename = "PubMed")]
    pub_med: Option<String>,
    #[serde(rename = "ArXiv")]
    arxiv: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAccessPdf {
    url: Option<String>,
}
