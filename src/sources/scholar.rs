//! Google-Scholar-class adapter, served through SerpAPI's JSON front.
//!
//! Scholar has no official API and aggressively blocks scrapers, so this
//! adapter requires a `SERPAPI_KEY` and keeps a very conservative rate
//! limit (5 requests/minute by default).

use super::{check_status, finalize, SourceAdapter, SourceFamily};
use crate::types::{AccessType, Paper, Result};
use crate::utils::text::{extract_doi, extract_year};
use crate::utils::RateLimiter;
use async_trait::async_trait;
use serde::Deserialize;

const BASE_URL: &str = "https://serpapi.com/search.json";

pub struct GoogleScholarAdapter {
    client: reqwest::Client,
    limiter: RateLimiter,
    api_key: Option<String>,
    base_url: String,
}

impl GoogleScholarAdapter {
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
}

#[async_trait]
impl SourceAdapter for GoogleScholarAdapter {
    fn id(&self) -> &str {
        "google_scholar"
    }

    fn name(&self) -> &str {
        "Google Scholar"
    }

    fn family(&self) -> SourceFamily {
        SourceFamily::Scholar
    }

    fn available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Paper>> {
        let Some(api_key) = &self.api_key else {
            return Ok(Vec::new());
        };
        self.limiter.acquire().await;

        let num = max_results.min(20).to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("engine", "google_scholar"),
                ("q", query),
                ("num", num.as_str()),
                ("api_key", api_key.as_str()),
            ])
            .send()
            .await?;
        let response = check_status(response, "google_scholar")?;

        let body: ScholarResponse = response.json().await?;
        let papers: Vec<Paper> = body
            .organic_results
            .into_iter()
            .map(parse_result)
            .collect();

        tracing::debug!(count = papers.len(), "Google Scholar search complete");
        Ok(finalize(papers, "google_scholar"))
    }
}

fn parse_result(result: OrganicResult) -> Paper {
    let summary = result
        .publication_info
        .as_ref()
        .and_then(|info| info.summary.clone())
        .unwrap_or_default();

    let authors = result
        .publication_info
        .map(|info| {
            info.authors
                .into_iter()
                .filter_map(|a| a.name)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let pdf_url = result
        .resources
        .into_iter()
        .find(|r| r.file_format.as_deref() == Some("PDF"))
        .and_then(|r| r.link);

    let citation_count = result
        .inline_links
        .and_then(|links| links.cited_by)
        .and_then(|cited| cited.total);

    let doi = result
        .link
        .as_deref()
        .and_then(extract_doi)
        .or_else(|| extract_doi(&summary));

    let mut paper = Paper {
        title: result.title.unwrap_or_default(),
        authors,
        year: extract_year(&summary),
        abstract_text: result.snippet,
        doi,
        citation_count,
        access_type: if pdf_url.is_some() {
            AccessType::Open
        } else {
            AccessType::Unknown
        },
        pdf_url,
        ..Default::default()
    };
    if let Some(link) = result.link {
        paper.urls.insert("html".into(), link);
    }
    paper
}

// ============= Wire Types =============

#[derive(Debug, Deserialize)]
struct ScholarResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    title: Option<String>,
    link: Option<String>,
    snippet: Option<String>,
    publication_info: Option<PublicationInfo>,
    inline_links: Option<InlineLinks>,
    #[serde(default)]
    resources: Vec<Resource>,
}

#[derive(Debug, Deserialize)]
struct PublicationInfo {
    summary: Option<String>,
    #[serde(default)]
    authors: Vec<ScholarAuthor>,
}

#[derive(Debug, Deserialize)]
struct ScholarAuthor {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InlineLinks {
    cited_by: Option<CitedBy>,
}

#[derive(Debug, Deserialize)]
struct CitedBy {
    total: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct Resource {
    file_format: Option<String>,
    link: Option<String>,
}
