//! Generic descriptor-driven REST adapter.
//!
//! Covers every provider whose API is "GET with a query parameter, JSON
//! back": Europe PMC, CORE, BASE, DOAJ, the *Rxiv preprint servers, and the
//! key-gated Springer / IEEE / Scopus / Web of Science APIs. The descriptor
//! supplies the URL, auth style and the projection used to turn the response
//! body into records.

use super::descriptor::{AuthStyle, Projection, SourceDescriptor};
use super::{check_status, finalize, SourceAdapter, SourceFamily};
use crate::types::{AccessType, Paper, Result, SourceType};
use crate::utils::text::strip_markup;
use crate::utils::RateLimiter;
use async_trait::async_trait;
use serde_json::Value;

pub struct RestAdapter {
    descriptor: SourceDescriptor,
    base_url: String,
    client: reqwest::Client,
    limiter: RateLimiter,
    api_key: Option<String>,
}

impl RestAdapter {
    pub fn new(
        descriptor: SourceDescriptor,
        client: reqwest::Client,
        rate_limit_per_minute: u32,
        api_key: Option<String>,
    ) -> Self {
        Self {
            base_url: descriptor.base_url.to_string(),
            descriptor,
            client,
            limiter: RateLimiter::per_minute(rate_limit_per_minute),
            api_key,
        }
    }

    /// Point the adapter at a different endpoint. Used by tests.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }
}

#[async_trait]
impl SourceAdapter for RestAdapter {
    fn id(&self) -> &str {
        self.descriptor.id
    }

    fn name(&self) -> &str {
        self.descriptor.name
    }

    fn family(&self) -> SourceFamily {
        self.descriptor.family
    }

    fn available(&self) -> bool {
        self.descriptor.requires_key.is_none() || self.api_key.is_some()
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Paper>> {
        self.limiter.acquire().await;

        let page_size = max_results.min(self.descriptor.page_max).to_string();
        let mut request = self.client.get(&self.base_url).query(&[
            (self.descriptor.query_param, query),
            (self.descriptor.page_param, page_size.as_str()),
        ]);
        for (key, value) in self.descriptor.extra_params {
            request = request.query(&[(*key, *value)]);
        }

        match (&self.descriptor.auth, &self.api_key) {
            (AuthStyle::Bearer(_), Some(key)) => {
                request = request.bearer_auth(key);
            }
            (AuthStyle::Header { header, .. }, Some(key)) => {
                request = request.header(*header, key.as_str());
            }
            (AuthStyle::QueryParam { param, .. }, Some(key)) => {
                request = request.query(&[(*param, key.as_str())]);
            }
            _ => {}
        }

        let response = check_status(request.send().await?, self.descriptor.id)?;
        let body: Value = response.json().await?;

        let papers = project(self.descriptor.projection, &body, max_results);
        tracing::debug!(
            source = self.descriptor.id,
            count = papers.len(),
            "REST search complete"
        );
        Ok(finalize(papers, self.descriptor.id))
    }
}

/// Apply the descriptor's response-to-record projection.
pub(crate) fn project(projection: Projection, body: &Value, max_results: usize) -> Vec<Paper> {
    let papers = match projection {
        Projection::EuropePmc => project_europe_pmc(body),
        Projection::Core => project_core(body),
        Projection::Base => project_base(body),
        Projection::Doaj => project_doaj(body),
        Projection::Rxiv => project_rxiv(body),
        Projection::Springer => project_springer(body),
        Projection::Ieee => project_ieee(body),
        Projection::Scopus => project_scopus(body),
        Projection::WebOfScience => project_wos(body),
    };
    papers.into_iter().take(max_results).collect()
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn int_field(value: &Value, key: &str) -> Option<i64> {
    match value.get(key) {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

fn items<'a>(value: &'a Value, path: &[&str]) -> &'a [Value] {
    let mut current = value;
    for key in path {
        match current.get(key) {
            Some(next) => current = next,
            None => return &[],
        }
    }
    current.as_array().map(Vec::as_slice).unwrap_or(&[])
}

fn project_europe_pmc(body: &Value) -> Vec<Paper> {
    items(body, &["resultList", "result"])
        .iter()
        .map(|item| {
            let authors = str_field(item, "authorString")
                .map(|s| {
                    s.split(',')
                        .map(|a| a.trim().trim_end_matches('.').to_string())
                        .filter(|a| !a.is_empty())
                        .collect()
                })
                .unwrap_or_default();
            let open = str_field(item, "isOpenAccess").as_deref() == Some("Y");
            Paper {
                title: str_field(item, "title").unwrap_or_default(),
                authors,
                year: int_field(item, "pubYear").map(|y| y as i32),
                abstract_text: str_field(item, "abstractText").map(|a| strip_markup(&a)),
                journal: str_field(item, "journalTitle"),
                doi: str_field(item, "doi"),
                pmid: str_field(item, "pmid"),
                pmcid: str_field(item, "pmcid"),
                citation_count: int_field(item, "citedByCount").map(|c| c.max(0) as u32),
                access_type: if open {
                    AccessType::Open
                } else {
                    AccessType::Unknown
                },
                source_type: SourceType::PeerReviewed,
                ..Default::default()
            }
        })
        .collect()
}

fn project_core(body: &Value) -> Vec<Paper> {
    items(body, &["results"])
        .iter()
        .map(|item| Paper {
            title: str_field(item, "title").unwrap_or_default(),
            authors: items(item, &["authors"])
                .iter()
                .filter_map(|a| str_field(a, "name"))
                .collect(),
            year: int_field(item, "yearPublished").map(|y| y as i32),
            abstract_text: str_field(item, "abstract"),
            doi: str_field(item, "doi"),
            citation_count: int_field(item, "citationCount").map(|c| c.max(0) as u32),
            pdf_url: str_field(item, "downloadUrl"),
            access_type: if item.get("downloadUrl").is_some() {
                AccessType::Open
            } else {
                AccessType::Unknown
            },
            ..Default::default()
        })
        .collect()
}

fn project_base(body: &Value) -> Vec<Paper> {
    items(body, &["response", "docs"])
        .iter()
        .map(|item| Paper {
            title: str_field(item, "dctitle").unwrap_or_default(),
            authors: items(item, &["dccreator"])
                .iter()
                .filter_map(|a| a.as_str().map(String::from))
                .collect(),
            year: int_field(item, "dcyear").map(|y| y as i32),
            abstract_text: str_field(item, "dcdescription"),
            doi: str_field(item, "dcdoi").map(|d| crate::utils::text::normalize_doi(&d)),
            pdf_url: str_field(item, "dclink"),
            ..Default::default()
        })
        .collect()
}

fn project_doaj(body: &Value) -> Vec<Paper> {
    items(body, &["results"])
        .iter()
        .filter_map(|item| {
            let bibjson = item.get("bibjson")?;
            let doi = items(bibjson, &["identifier"])
                .iter()
                .find(|id| str_field(id, "type").as_deref() == Some("doi"))
                .and_then(|id| str_field(id, "id"));
            let pdf_url = items(bibjson, &["link"])
                .iter()
                .find(|l| str_field(l, "type").as_deref() == Some("fulltext"))
                .and_then(|l| str_field(l, "url"));
            Some(Paper {
                title: str_field(bibjson, "title").unwrap_or_default(),
                authors: items(bibjson, &["author"])
                    .iter()
                    .filter_map(|a| str_field(a, "name"))
                    .collect(),
                year: int_field(bibjson, "year").map(|y| y as i32),
                abstract_text: str_field(bibjson, "abstract"),
                journal: bibjson
                    .get("journal")
                    .and_then(|j| str_field(j, "title")),
                publisher: bibjson
                    .get("journal")
                    .and_then(|j| str_field(j, "publisher")),
                doi,
                pdf_url,
                // Everything in DOAJ is open access by definition.
                access_type: AccessType::Open,
                source_type: SourceType::PeerReviewed,
                ..Default::default()
            })
        })
        .collect()
}

fn project_rxiv(body: &Value) -> Vec<Paper> {
    items(body, &["collection"])
        .iter()
        .map(|item| {
            let doi = str_field(item, "doi");
            let pdf_url = doi.as_ref().and_then(|d| {
                str_field(item, "server")
                    .map(|server| format!("https://www.{server}.org/content/{d}v1.full.pdf"))
            });
            Paper {
                title: str_field(item, "title").unwrap_or_default(),
                authors: str_field(item, "authors")
                    .map(|s| {
                        s.split(';')
                            .map(|a| a.trim().to_string())
                            .filter(|a| !a.is_empty())
                            .collect()
                    })
                    .unwrap_or_default(),
                year: str_field(item, "date")
                    .and_then(|d| d.split('-').next().and_then(|y| y.parse().ok())),
                abstract_text: str_field(item, "abstract"),
                doi,
                pdf_url,
                access_type: AccessType::Open,
                source_type: SourceType::Preprint,
                ..Default::default()
            }
        })
        .collect()
}

fn project_springer(body: &Value) -> Vec<Paper> {
    items(body, &["records"])
        .iter()
        .map(|item| Paper {
            title: str_field(item, "title").unwrap_or_default(),
            authors: items(item, &["creators"])
                .iter()
                .filter_map(|c| str_field(c, "creator"))
                .collect(),
            year: str_field(item, "publicationDate")
                .and_then(|d| d.split('-').next().and_then(|y| y.parse().ok())),
            abstract_text: str_field(item, "abstract"),
            journal: str_field(item, "publicationName"),
            publisher: Some("Springer Nature".to_string()),
            doi: str_field(item, "doi"),
            source_type: SourceType::PeerReviewed,
            ..Default::default()
        })
        .collect()
}

fn project_ieee(body: &Value) -> Vec<Paper> {
    items(body, &["articles"])
        .iter()
        .map(|item| Paper {
            title: str_field(item, "title").unwrap_or_default(),
            authors: items(item, &["authors", "authors"])
                .iter()
                .filter_map(|a| str_field(a, "full_name"))
                .collect(),
            year: int_field(item, "publication_year").map(|y| y as i32),
            abstract_text: str_field(item, "abstract"),
            journal: str_field(item, "publication_title"),
            publisher: Some("IEEE".to_string()),
            doi: str_field(item, "doi"),
            citation_count: int_field(item, "citing_paper_count").map(|c| c.max(0) as u32),
            pdf_url: str_field(item, "pdf_url"),
            access_type: if str_field(item, "access_type").as_deref() == Some("OPEN_ACCESS") {
                AccessType::Open
            } else {
                AccessType::Paywalled
            },
            source_type: SourceType::PeerReviewed,
            ..Default::default()
        })
        .collect()
}

fn project_scopus(body: &Value) -> Vec<Paper> {
    items(body, &["search-results", "entry"])
        .iter()
        .map(|item| Paper {
            title: str_field(item, "dc:title").unwrap_or_default(),
            authors: str_field(item, "dc:creator").map(|a| vec![a]).unwrap_or_default(),
            year: str_field(item, "prism:coverDate")
                .and_then(|d| d.split('-').next().and_then(|y| y.parse().ok())),
            journal: str_field(item, "prism:publicationName"),
            doi: str_field(item, "prism:doi"),
            citation_count: int_field(item, "citedby-count").map(|c| c.max(0) as u32),
            source_type: SourceType::PeerReviewed,
            ..Default::default()
        })
        .collect()
}

fn project_wos(body: &Value) -> Vec<Paper> {
    items(body, &["hits"])
        .iter()
        .map(|item| Paper {
            title: str_field(item, "title").unwrap_or_default(),
            authors: items(item, &["names", "authors"])
                .iter()
                .filter_map(|a| str_field(a, "displayName"))
                .collect(),
            year: item
                .get("source")
                .and_then(|s| int_field(s, "publishYear"))
                .map(|y| y as i32),
            journal: item
                .get("source")
                .and_then(|s| str_field(s, "sourceTitle")),
            doi: item
                .get("identifiers")
                .and_then(|ids| str_field(ids, "doi")),
            citation_count: item
                .get("citations")
                .and_then(|c| int_field(c, "count"))
                .map(|c| c.max(0) as u32),
            source_type: SourceType::PeerReviewed,
            ..Default::default()
        })
        .collect()
}
