//! CrossRef adapter and the composite publisher adapter built on top of it.
//!
//! CrossRef's `works` endpoint is the workhorse of the publisher fan-out:
//! its server-side `publisher-name` filter lets one client cover dozens of
//! publishers, so [`CrossRefPublisherAdapter`] simply pins a publisher name
//! onto the shared [`CrossRefAdapter`].

use super::{check_status, finalize, SourceAdapter, SourceFamily};
use crate::types::{AccessType, Paper, Result, SourceType};
use crate::utils::text::strip_markup;
use crate::utils::RateLimiter;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

const BASE_URL: &str = "https://api.crossref.org/works";

const SELECT_FIELDS: &str =
    "DOI,title,author,published,abstract,container-title,is-referenced-by-count,publisher,type,link";

pub struct CrossRefAdapter {
    client: reqwest::Client,
    limiter: RateLimiter,
    email: String,
    base_url: String,
}

impl CrossRefAdapter {
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

    async fn query_works(
        &self,
        query: &str,
        publisher_filter: Option<&str>,
        max_results: usize,
    ) -> Result<Vec<Paper>> {
        self.limiter.acquire().await;

        let rows = max_results.min(100).to_string();
        let mut request = self.client.get(&self.base_url).query(&[
            ("query", query),
            ("rows", rows.as_str()),
            ("select", SELECT_FIELDS),
            ("mailto", self.email.as_str()),
        ]);
        if let Some(publisher) = publisher_filter {
            request = request.query(&[("filter", format!("publisher-name:{publisher}"))]);
        }

        let response = check_status(request.send().await?, "crossref")?;
        let body: WorksResponse = response.json().await?;

        let mut papers: Vec<Paper> = body
            .message
            .items
            .into_iter()
            .filter_map(parse_work)
            .collect();
        if let Some(publisher) = publisher_filter {
            for paper in &mut papers {
                paper.publisher = Some(publisher.to_string());
            }
        }
        Ok(papers)
    }
}

#[async_trait]
impl SourceAdapter for CrossRefAdapter {
    fn id(&self) -> &str {
        "crossref"
    }

    fn name(&self) -> &str {
        "CrossRef"
    }

    fn family(&self) -> SourceFamily {
        SourceFamily::Academic
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Paper>> {
        let papers = self.query_works(query, None, max_results).await?;
        tracing::debug!(count = papers.len(), "CrossRef search complete");
        Ok(finalize(papers, "crossref"))
    }

    async fn search_by_publisher(
        &self,
        query: &str,
        publisher: &str,
        max_results: usize,
    ) -> Result<Vec<Paper>> {
        let papers = self
            .query_works(query, Some(publisher), max_results)
            .await?;
        Ok(finalize(papers, "crossref"))
    }
}

/// Composite adapter: one publisher pinned onto the shared CrossRef client.
pub struct CrossRefPublisherAdapter {
    inner: Arc<CrossRefAdapter>,
    publisher: String,
    id: String,
}

impl CrossRefPublisherAdapter {
    pub fn new(inner: Arc<CrossRefAdapter>, publisher: &str) -> Self {
        let id = format!(
            "publisher_{}",
            publisher
                .to_lowercase()
                .replace(|c: char| !c.is_ascii_alphanumeric(), "_")
        );
        Self {
            inner,
            publisher: publisher.to_string(),
            id,
        }
    }

    pub fn publisher(&self) -> &str {
        &self.publisher
    }
}

#[async_trait]
impl SourceAdapter for CrossRefPublisherAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.publisher
    }

    fn family(&self) -> SourceFamily {
        SourceFamily::Publisher
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Paper>> {
        self.inner
            .search_by_publisher(query, &self.publisher, max_results)
            .await
    }
}

fn parse_work(item: Work) -> Option<Paper> {
    let doi = item.doi.filter(|d| !d.is_empty())?;

    let title = item.title.into_iter().next().unwrap_or_default();
    let authors = item
        .author
        .into_iter()
        .filter_map(|a| {
            let name = [a.given, a.family]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            (!name.trim().is_empty()).then(|| name.trim().to_string())
        })
        .collect();

    let year = item
        .published
        .and_then(|p| p.date_parts.into_iter().next())
        .and_then(|parts| parts.into_iter().next());

    let pdf_url = item
        .link
        .into_iter()
        .find(|l| l.content_type.as_deref() == Some("application/pdf"))
        .and_then(|l| l.url);

    Some(Paper {
        title,
        authors,
        year,
        abstract_text: item.abstract_text.map(|a| strip_markup(&a)),
        journal: item.container_title.into_iter().next(),
        publisher: item.publisher,
        doi: Some(doi),
        citation_count: item.is_referenced_by_count,
        access_type: if pdf_url.is_some() {
            AccessType::Open
        } else {
            AccessType::Unknown
        },
        pdf_url,
        source_type: map_work_type(item.work_type.as_deref()),
        ..Default::default()
    })
}

fn map_work_type(work_type: Option<&str>) -> SourceType {
    match work_type {
        Some("journal-article") => SourceType::PeerReviewed,
        Some("proceedings-article") => SourceType::Conference,
        Some("posted-content") => SourceType::Preprint,
        Some("dissertation") => SourceType::Thesis,
        Some("book-chapter") => SourceType::BookChapter,
        _ => SourceType::Unknown,
    }
}

// ============= Wire Types =============

#[derive(Debug, Deserialize)]
struct WorksResponse {
    message: WorksMessage,
}

#[derive(Debug, Deserialize)]
struct WorksMessage {
    #[serde(default)]
    items: Vec<Work>,
}

#[derive(Debug, Deserialize)]
struct Work {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(default)]
    title: Vec<String>,
    #[serde(default)]
    author: Vec<WorkAuthor>,
    published: Option<WorkDate>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(rename = "container-title", default)]
    container_title: Vec<String>,
    #[serde(rename = "is-referenced-by-count")]
    is_referenced_by_count: Option<u32>,
    publisher: Option<String>,
    #[serde(rename = "type")]
    work_type: Option<String>,
    #[serde(default)]
    link: Vec<WorkLink>,
}

#[derive(Debug, Deserialize)]
struct WorkAuthor {
    given: Option<String>,
    family: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorkDate {
    #[serde(rename = "date-parts", default)]
    date_parts: Vec<Vec<i32>>,
}

#[derive(Debug, Deserialize)]
struct WorkLink {
    #[serde(rename = "URL")]
    url: Option<String>,
    #[serde(rename = "content-type")]
    content_type: Option<String>,
}
