//! DuckDuckGo adapter, the HTML-scrape reference implementation.
//!
//! DuckDuckGo keeps a static HTML endpoint that needs no JavaScript, which
//! makes it the one general-web fallback that can be scraped politely. The
//! query is augmented with "research paper" and records only survive the
//! boundary when a DOI or a usable title could be extracted.

use super::{check_status, finalize, SourceAdapter, SourceFamily};
use crate::types::{Paper, Result};
use crate::utils::text::{extract_doi, extract_year};
use crate::utils::RateLimiter;
use async_trait::async_trait;
use scraper::{Html, Selector};

const BASE_URL: &str = "https://html.duckduckgo.com/html/";

pub struct DuckDuckGoAdapter {
    client: reqwest::Client,
    limiter: RateLimiter,
    base_url: String,
}

impl DuckDuckGoAdapter {
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
impl SourceAdapter for DuckDuckGoAdapter {
    fn id(&self) -> &str {
        "duckduckgo"
    }

    fn name(&self) -> &str {
        "DuckDuckGo"
    }

    fn family(&self) -> SourceFamily {
        SourceFamily::GeneralSearch
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Paper>> {
        self.limiter.acquire().await;

        let augmented = format!("{query} research paper");
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", augmented.as_str())])
            .send()
            .await?;
        let response = check_status(response, "duckduckgo")?;

        let html = response.text().await?;
        let papers = parse_results(&html, max_results);
        tracing::debug!(count = papers.len(), "DuckDuckGo search complete");
        Ok(finalize(papers, "duckduckgo"))
    }
}

fn parse_results(html: &str, max_results: usize) -> Vec<Paper> {
    let document = Html::parse_document(html);
    let result_selector = Selector::parse(".result").expect("valid selector");
    let title_selector = Selector::parse(".result__a").expect("valid selector");
    let snippet_selector = Selector::parse(".result__snippet").expect("valid selector");

    document
        .select(&result_selector)
        .filter_map(|result| {
            let anchor = result.select(&title_selector).next()?;
            let title = anchor.text().collect::<String>().trim().to_string();
            if title.is_empty() {
                return None;
            }
            let href = anchor.value().attr("href").map(String::from);
            let snippet = result
                .select(&snippet_selector)
                .next()
                .map(|s| s.text().collect::<String>().trim().to_string())
                .filter(|s| !s.is_empty());

            let doi = href
                .as_deref()
                .and_then(extract_doi)
                .or_else(|| snippet.as_deref().and_then(extract_doi));
            let year = snippet.as_deref().and_then(extract_year);

            let mut paper = Paper {
                title,
                year,
                abstract_text: snippet,
                doi,
                ..Default::default()
            };
            if let Some(link) = href {
                paper.urls.insert("html".into(), link);
            }
            Some(paper)
        })
        .take(max_results)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"
<html><body>
  <div class="result">
    <h2><a class="result__a" href="https://doi.org/10.1038/s41586-020-2649-2">Array programming with NumPy</a></h2>
    <a class="result__snippet">Published in Nature, 2020. Array programming underpins scientific computing.</a>
  </div>
  <div class="result">
    <h2><a class="result__a" href="https://example.org/blog">A blog post without identifiers</a></h2>
    <a class="result__snippet">Not a paper at all.</a>
  </div>
</body></html>"#;

    #[test]
    fn test_parse_results_extracts_doi_and_year() {
        let papers = parse_results(SAMPLE_HTML, 10);
        assert_eq!(papers.len(), 2);

        assert_eq!(papers[0].title, "Array programming with NumPy");
        assert_eq!(papers[0].doi.as_deref(), Some("10.1038/s41586-020-2649-2"));
        assert_eq!(papers[0].year, Some(2020));
        assert!(papers[0].urls.contains_key("html"));

        // Second result has no DOI but keeps its title identity.
        assert!(papers[1].doi.is_none());
        assert!(papers[1].has_identity());
    }

    #[test]
    fn test_parse_results_respects_limit() {
        assert_eq!(parse_results(SAMPLE_HTML, 1).len(), 1);
    }

    #[test]
    fn test_parse_empty_document() {
        assert!(parse_results("<html></html>", 10).is_empty());
    }
}
