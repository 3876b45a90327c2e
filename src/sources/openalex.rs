//! OpenAlex adapter. Keyless, with polite-pool identification via `mailto`.

use super::{check_status, finalize, SourceAdapter, SourceFamily};
use crate::types::{AccessType, Paper, Result, SourceType};
use crate::utils::text::normalize_doi;
use crate::utils::RateLimiter;
use async_trait::async_trait;
use serde::Deserialize;

const BASE_URL: &str = "https://api.openalex.org/works";

pub struct OpenAlexAdapter {
    client: reqwest::Client,
    limiter: RateLimiter,
    email: String,
    base_url: String,
}

impl OpenAlexAdapter {
    pub fn new(client: reqwest::Client, rate_limit_per_minute: u32, email: String) -> Self {
        Self {
            client,
            limiter: RateLimiter::per_minute(rate_limit_per_minute),
            email,
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
impl SourceAdapter for OpenAlexAdapter {
    fn id(&self) -> &str {
        "openalex"
    }

    fn name(&self) -> &str {
        "OpenAlex"
    }

    fn family(&self) -> SourceFamily {
        SourceFamily::Academic
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Paper>> {
        self.limiter.acquire().await;

        let per_page = max_results.min(200).to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("search", query),
                ("per-page", per_page.as_str()),
                ("mailto", self.email.as_str()),
            ])
            .send()
            .await?;
        let response = check_status(response, "openalex")?;

        let body: WorksResponse = response.json().await?;
        let papers: Vec<Paper> = body.results.into_iter().map(parse_work).collect();
        tracing::debug!(count = papers.len(), "OpenAlex search complete");
        Ok(finalize(papers, "openalex"))
    }
}

fn parse_work(work: OpenAlexWork) -> Paper {
    let doi = work.doi.map(|d| normalize_doi(&d));
    let pmid = work.ids.and_then(|ids| ids.pmid).map(|url| {
        url.rsplit('/')
            .find(|part| !part.is_empty())
            .unwrap_or_default()
            .to_string()
    });

    let journal = work
        .primary_location
        .as_ref()
        .and_then(|loc| loc.source.as_ref())
        .and_then(|s| s.display_name.clone());
    let pdf_url = work
        .primary_location
        .as_ref()
        .and_then(|loc| loc.pdf_url.clone())
        .or_else(|| work.open_access.as_ref().and_then(|oa| oa.oa_url.clone()));
    let is_oa = work
        .open_access
        .as_ref()
        .and_then(|oa| oa.is_oa)
        .unwrap_or(false);

    Paper {
        title: work.title.or(work.display_name).unwrap_or_default(),
        authors: work
            .authorships
            .into_iter()
            .filter_map(|a| a.author.and_then(|author| author.display_name))
            .collect(),
        year: work.publication_year,
        journal,
        doi,
        pmid,
        citation_count: work.cited_by_count,
        access_type: if is_oa {
            AccessType::Open
        } else {
            AccessType::Unknown
        },
        pdf_url,
        source_type: match work.work_type.as_deref() {
            Some("article") => SourceType::PeerReviewed,
            Some("preprint") => SourceType::Preprint,
            Some("book-chapter") => SourceType::BookChapter,
            Some("dissertation") => SourceType::Thesis,
            _ => SourceType::Unknown,
        },
        ..Default::default()
    }
}

// ============= Wire Types =============

#[derive(Debug, Deserialize)]
struct WorksResponse {
    #[serde(default)]
    results: Vec<OpenAlexWork>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexWork {
    title: Option<String>,
    display_name: Option<String>,
    publication_year: Option<i32>,
    cited_by_count: Option<u32>,
    doi: Option<String>,
    ids: Option<WorkIds>,
    primary_location: Option<Location>,
    open_access: Option<OpenAccess>,
    #[serde(default)]
    authorships: Vec<Authorship>,
    #[serde(rename = "type")]
    work_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorkIds {
    pmid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Location {
    source: Option<LocationSource>,
    pdf_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LocationSource {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAccess {
    is_oa: Option<bool>,
    oa_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Authorship {
    author: Option<AuthorInfo>,
}

#[derive(Debug, Deserialize)]
struct AuthorInfo {
    display_name: Option<String>,
}
