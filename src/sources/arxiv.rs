//! arXiv adapter over the Atom query API.
//!
//! arXiv asks clients to keep to one request every three seconds; the
//! configured 60/min bucket stays inside that guidance with short bursts.

use super::{check_status, finalize, SourceAdapter, SourceFamily};
use crate::types::{AccessType, Paper, Result, SourceType};
use crate::utils::text::normalize_arxiv_id;
use crate::utils::RateLimiter;
use async_trait::async_trait;
use serde::Deserialize;

const BASE_URL: &str = "https://export.arxiv.org/api/query";

pub struct ArxivAdapter {
    client: reqwest::Client,
    limiter: RateLimiter,
    base_url: String,
}

impl ArxivAdapter {
    pub fn new(client: reqwest::Client, rate_limit_per_minute: u32) -> Self {
        Self {
            client,
            limiter: RateLimiter::per_minute(rate_limit_per_minute),
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
impl SourceAdapter for ArxivAdapter {
    fn id(&self) -> &str {
        "arxiv"
    }

    fn name(&self) -> &str {
        "arXiv"
    }

    fn family(&self) -> SourceFamily {
        SourceFamily::Academic
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Paper>> {
        self.limiter.acquire().await;

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("search_query", format!("all:{query}")),
                ("start", "0".to_string()),
                ("max_results", max_results.to_string()),
                ("sortBy", "relevance".to_string()),
                ("sortOrder", "descending".to_string()),
            ])
            .send()
            .await?;
        let response = check_status(response, "arxiv")?;

        let xml = response.text().await?;
        let feed: AtomFeed = quick_xml::de::from_str(&xml)?;

        let papers: Vec<Paper> = feed.entries.into_iter().filter_map(parse_entry).collect();
        tracing::debug!(count = papers.len(), "arXiv search complete");
        Ok(finalize(papers, "arxiv"))
    }
}

fn parse_entry(entry: AtomEntry) -> Option<Paper> {
    let raw_id = entry.id?;
    let abs_id = raw_id
        .rsplit("/abs/")
        .next()
        .filter(|tail| *tail != raw_id.as_str())?;
    let arxiv_id = normalize_arxiv_id(abs_id);
    if arxiv_id.is_empty() {
        return None;
    }

    let title = entry
        .title
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default();
    let abstract_text = entry
        .summary
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|s| !s.is_empty());

    let year = entry
        .published
        .as_deref()
        .and_then(|p| p.get(..4))
        .and_then(|y| y.parse().ok());

    let pdf_url = entry
        .links
        .iter()
        .find(|link| {
            link.title.as_deref() == Some("pdf")
                || link.content_type.as_deref() == Some("application/pdf")
        })
        .and_then(|link| link.href.clone())
        .or_else(|| Some(format!("https://arxiv.org/pdf/{arxiv_id}.pdf")));

    let keywords = entry
        .categories
        .into_iter()
        .filter_map(|c| c.term)
        .collect();

    Some(Paper {
        title,
        authors: entry.authors.into_iter().filter_map(|a| a.name).collect(),
        year,
        abstract_text,
        doi: entry.doi.filter(|d| !d.is_empty()),
        arxiv_id: Some(arxiv_id),
        keywords,
        pdf_url,
        access_type: AccessType::Open,
        source_type: SourceType::Preprint,
        ..Default::default()
    })
}

// ============= Wire Types =============

#[derive(Debug, Deserialize)]
#[serde(rename = "feed")]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    id: Option<String>,
    title: Option<String>,
    summary: Option<String>,
    published: Option<String>,
    #[serde(rename = "author", default)]
    authors: Vec<AtomAuthor>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    #[serde(rename = "category", default)]
    categories: Vec<AtomCategory>,
    #[serde(rename = "doi")]
    doi: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomAuthor {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@title")]
    title: Option<String>,
    #[serde(rename = "@type")]
    content_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomCategory {
    #[serde(rename = "@term")]
    term: Option<String>,
}
