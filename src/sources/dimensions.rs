//! DSL-over-POST adapters: Dimensions and Lens.org.
//!
//! Both providers take a query document in a POST body instead of URL
//! parameters, and both are key-gated: without the corresponding API key the
//! adapter reports itself unavailable and is omitted from the registry.

use super::{check_status, finalize, SourceAdapter, SourceFamily};
use crate::types::{Paper, Result, SourceType};
use crate::utils::RateLimiter;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

const DIMENSIONS_URL: &str = "https://app.dimensions.ai/api/dsl.json";
const LENS_URL: &str = "https://api.lens.org/scholarly/search";

pub struct DimensionsAdapter {
    client: reqwest::Client,
    limiter: RateLimiter,
    api_key: Option<String>,
    base_url: String,
}

impl DimensionsAdapter {
    pub fn new(
        client: reqwest::Client,
        rate_limit_per_minute: u32,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            limiter: RateLimiter::per_minute(rate_limit_per_minute),
            api_key,
            base_url: DIMENSIONS_URL.to_string(),
        }
    }

    /// Point the adapter at a different endpoint. Used by tests.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }
}

#[async_trait]
impl SourceAdapter for DimensionsAdapter {
    fn id(&self) -> &str {
        "dimensions"
    }

    fn name(&self) -> &str {
        "Dimensions"
    }

    fn family(&self) -> SourceFamily {
        SourceFamily::CitationIndex
    }

    fn available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Paper>> {
        let Some(api_key) = &self.api_key else {
            return Ok(Vec::new());
        };
        self.limiter.acquire().await;

        // Dimensions takes its own query language as the POST body.
        let escaped = query.replace('"', "\\\"");
        let dsl = format!(
            "search publications for \"{escaped}\" \
             return publications[title+authors+year+doi+abstract+times_cited+journal] \
             limit {}",
            max_results.min(200)
        );

        let response = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("JWT {api_key}"))
            .header("Content-Type", "application/json")
            .body(dsl)
            .send()
            .await?;
        let response = check_status(response, "dimensions")?;

        let body: DimensionsResponse = response.json().await?;
        let papers: Vec<Paper> = body
            .publications
            .into_iter()
            .map(|p| Paper {
                title: p.title.unwrap_or_default(),
                authors: p
                    .authors
                    .into_iter()
                    .filter_map(|a| {
                        let name = [a.first_name, a.last_name]
                            .into_iter()
                            .flatten()
                            .collect::<Vec<_>>()
                            .join(" ");
                        (!name.trim().is_empty()).then(|| name.trim().to_string())
                    })
                    .collect(),
                year: p.year,
                abstract_text: p.abstract_text,
                journal: p.journal.and_then(|j| j.title),
                doi: p.doi,
                citation_count: p.times_cited,
                source_type: SourceType::PeerReviewed,
                ..Default::default()
            })
            .collect();

        tracing::debug!(count = papers.len(), "Dimensions search complete");
        Ok(finalize(papers, "dimensions"))
    }
}

pub struct LensAdapter {
    client: reqwest::Client,
    limiter: RateLimiter,
    api_key: Option<String>,
    base_url: String,
}

impl LensAdapter {
    pub fn new(
        client: reqwest::Client,
        rate_limit_per_minute: u32,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            limiter: RateLimiter::per_minute(rate_limit_per_minute),
            api_key,
            base_url: LENS_URL.to_string(),
        }
    }

    /// Point the adapter at a different endpoint. Used by tests.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }
}

#[async_trait]
impl SourceAdapter for LensAdapter {
    fn id(&self) -> &str {
        "lens"
    }

    fn name(&self) -> &str {
        "Lens.org"
    }

    fn family(&self) -> SourceFamily {
        SourceFamily::CitationIndex
    }

    fn available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Paper>> {
        let Some(api_key) = &self.api_key else {
            return Ok(Vec::new());
        };
        self.limiter.acquire().await;

        let body = json!({
            "query": {"match": {"title": query}},
            "size": max_results.min(100),
        });

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response, "lens")?;

        let body: LensResponse = response.json().await?;
        let papers: Vec<Paper> = body
            .data
            .into_iter()
            .map(|item| {
                let doi = item.external_ids.and_then(|ids| {
                    ids.into_iter()
                        .find(|id| id.id_type.as_deref() == Some("doi"))
                        .and_then(|id| id.value)
                });
                Paper {
                    title: item.title.unwrap_or_default(),
                    authors: item
                        .authors
                        .into_iter()
                        .filter_map(|a| a.display_name)
                        .collect(),
                    year: item.year_published,
                    abstract_text: item.abstract_text,
                    doi,
                    citation_count: item.scholarly_citations_count,
                    source_type: SourceType::PeerReviewed,
                    ..Default::default()
                }
            })
            .collect();

        tracing::debug!(count = papers.len(), "Lens search complete");
        Ok(finalize(papers, "lens"))
    }
}

// ============= Wire Types =============

#[derive(Debug, Deserialize)]
struct DimensionsResponse {
    #[serde(default)]
    publications: Vec<DimensionsPublication>,
}

#[derive(Debug, Deserialize)]
struct DimensionsPublication {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<DimensionsAuthor>,
    year: Option<i32>,
    doi: Option<String>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    times_cited: Option<u32>,
    journal: Option<DimensionsJournal>,
}

#[derive(Debug, Deserialize)]
struct DimensionsAuthor {
    first_name: Option<String>,
    last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DimensionsJournal {
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LensResponse {
    #[serde(default)]
    data: Vec<LensWork>,
}

#[derive(Debug, Deserialize)]
struct LensWork {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<LensAuthor>,
    year_published: Option<i32>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(rename = "external_ids")]
    external_ids: Option<Vec<LensExternalId>>,
    scholarly_citations_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct LensAuthor {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LensExternalId {
    #[serde(rename = "type")]
    id_type: Option<String>,
    value: Option<String>,
}
