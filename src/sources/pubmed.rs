//! PubMed/MEDLINE adapter over the NCBI E-utilities.
//!
//! Search is two-step: `esearch.fcgi` returns PMIDs as JSON, `efetch.fcgi`
//! returns article metadata as XML. Anonymous clients get 3 req/s; an
//! `NCBI_API_KEY` raises the tier to 10 req/s (handled in the config's
//! rate-limit table).

use super::{check_status, finalize, SourceAdapter, SourceFamily};
use crate::types::{AccessType, Paper, Result, SourceType};
use crate::utils::RateLimiter;
use async_trait::async_trait;
use serde::Deserialize;

const BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

pub struct PubMedAdapter {
    client: reqwest::Client,
    limiter: RateLimiter,
    api_key: Option<String>,
    email: String,
    base_url: String,
}

impl PubMedAdapter {
    pub fn new(
        client: reqwest::Client,
        rate_limit_per_minute: u32,
        api_key: Option<String>,
        email: String,
    ) -> Self {
        Self {
            client,
            limiter: RateLimiter::per_minute(rate_limit_per_minute),
            api_key,
            email,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Point the adapter at a different endpoint. Used by tests.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    fn common_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("db", "pubmed".to_string()), ("email", self.email.clone())];
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        params
    }

    async fn search_pmids(&self, query: &str, max_results: usize) -> Result<Vec<String>> {
        self.limiter.acquire().await;

        let url = format!("{}/esearch.fcgi", self.base_url);
        let retmax = max_results.to_string();
        let response = self
            .client
            .get(&url)
            .query(&self.common_params())
            .query(&[
                ("term", query),
                ("retmax", retmax.as_str()),
                ("retmode", "json"),
                ("sort", "relevance"),
            ])
            .send()
            .await?;
        let response = check_status(response, "pubmed")?;

        let body: ESearchResponse = response.json().await?;
        Ok(body.esearchresult.idlist)
    }

    async fn fetch_details(&self, pmids: &[String]) -> Result<Vec<Paper>> {
        if pmids.is_empty() {
            return Ok(Vec::new());
        }
        self.limiter.acquire().await;

        let url = format!("{}/efetch.fcgi", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&self.common_params())
            .query(&[("id", pmids.join(",")), ("retmode", "xml".to_string())])
            .send()
            .await?;
        let response = check_status(response, "pubmed")?;

        let xml = response.text().await?;
        let article_set: PubmedArticleSet = quick_xml::de::from_str(&xml)?;

        Ok(article_set
            .articles
            .into_iter()
            .filter_map(parse_article)
            .collect())
    }
}

#[async_trait]
impl SourceAdapter for PubMedAdapter {
    fn id(&self) -> &str {
        "pubmed"
    }

    fn name(&self) -> &str {
        "PubMed/MEDLINE"
    }

    fn family(&self) -> SourceFamily {
        SourceFamily::Academic
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Paper>> {
        let pmids = self.search_pmids(query, max_results).await?;
        let papers = self.fetch_details(&pmids).await?;
        tracing::debug!(count = papers.len(), "PubMed search complete");
        Ok(finalize(papers, "pubmed"))
    }
}

fn parse_article(article: PubmedArticle) -> Option<Paper> {
    let citation = article.medline_citation?;
    let pmid = citation.pmid.filter(|p| !p.is_empty())?;
    let data = citation.article?;

    let title = data.article_title.unwrap_or_default();
    let abstract_text = data.abstract_section.and_then(|a| {
        let joined = a.texts.join(" ");
        (!joined.trim().is_empty()).then_some(joined)
    });

    let authors = data
        .author_list
        .map(|list| {
            list.authors
                .into_iter()
                .filter_map(|author| {
                    let mut parts = Vec::new();
                    if let Some(fore) = author.fore_name {
                        parts.push(fore);
                    }
                    if let Some(last) = author.last_name {
                        parts.push(last);
                    }
                    (!parts.is_empty()).then(|| parts.join(" "))
                })
                .collect()
        })
        .unwrap_or_default();

    let journal = data.journal.as_ref().and_then(|j| j.title.clone());
    let year = data
        .journal
        .and_then(|j| j.issue)
        .and_then(|i| i.pub_date)
        .and_then(|d| d.year)
        .and_then(|y| y.parse().ok());

    let mut doi = None;
    let mut pmcid = None;
    if let Some(ids) = article.pubmed_data.and_then(|d| d.article_id_list) {
        for id in ids.ids {
            match id.id_type.as_deref() {
                Some("doi") => doi = Some(id.value),
                Some("pmc") => pmcid = Some(id.value),
                _ => {}
            }
        }
    }

    let keywords: Vec<String> = citation
        .mesh_heading_list
        .map(|list| {
            list.headings
                .into_iter()
                .filter_map(|h| h.descriptor_name)
                .take(10)
                .collect()
        })
        .unwrap_or_default();

    let mut paper = Paper {
        title,
        authors,
        year,
        abstract_text,
        journal,
        doi,
        pmid: Some(pmid),
        pmcid: pmcid.clone(),
        keywords,
        access_type: if pmcid.is_some() {
            AccessType::Open
        } else {
            AccessType::Paywalled
        },
        source_type: SourceType::PeerReviewed,
        ..Default::default()
    };
    if let Some(pmc) = &paper.pmcid {
        paper.pdf_url = Some(format!(
            "https://www.ncbi.nlm.nih.gov/pmc/articles/{pmc}/pdf/"
        ));
    }
    Some(paper)
}

// ============= Wire Types =============

#[derive(Debug, Deserialize)]
struct ESearchResponse {
    esearchresult: ESearchResult,
}

#[derive(Debug, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename = "PubmedArticleSet")]
struct PubmedArticleSet {
    #[serde(rename = "PubmedArticle", default)]
    articles: Vec<PubmedArticle>,
}

#[derive(Debug, Deserialize)]
struct PubmedArticle {
    #[serde(rename = "MedlineCitation")]
    medline_citation: Option<MedlineCitation>,
    #[serde(rename = "PubmedData")]
    pubmed_data: Option<PubmedData>,
}

#[derive(Debug, Deserialize)]
struct MedlineCitation {
    #[serde(rename = "PMID")]
    pmid: Option<String>,
    #[serde(rename = "Article")]
    article: Option<ArticleData>,
    #[serde(rename = "MeshHeadingList")]
    mesh_heading_list: Option<MeshHeadingList>,
}

#[derive(Debug, Deserialize)]
struct ArticleData {
    #[serde(rename = "ArticleTitle")]
    article_title: Option<String>,
    #[serde(rename = "Abstract")]
    abstract_section: Option<AbstractSection>,
    #[serde(rename = "AuthorList")]
    author_list: Option<AuthorList>,
    #[serde(rename = "Journal")]
    journal: Option<Journal>,
}

#[derive(Debug, Deserialize)]
struct AbstractSection {
    #[serde(rename = "AbstractText", default)]
    texts: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AuthorList {
    #[serde(rename = "Author", default)]
    authors: Vec<Author>,
}

#[derive(Debug, Deserialize)]
struct Author {
    #[serde(rename = "LastName")]
    last_name: Option<String>,
    #[serde(rename = "ForeName")]
    fore_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Journal {
    #[serde(rename = "Title")]
    title: Option<String>,
    #[serde(rename = "JournalIssue")]
    issue: Option<JournalIssue>,
}

#[derive(Debug, Deserialize)]
struct JournalIssue {
    #[serde(rename = "PubDate")]
    pub_date: Option<PubDate>,
}

#[derive(Debug, Deserialize)]
struct PubDate {
    #[serde(rename = "Year")]
    year: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MeshHeadingList {
    #[serde(rename = "MeshHeading", default)]
    headings: Vec<MeshHeading>,
}

#[derive(Debug, Deserialize)]
struct MeshHeading {
    #[serde(rename = "DescriptorName")]
    descriptor_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PubmedData {
    #[serde(rename = "ArticleIdList")]
    article_id_list: Option<ArticleIdList>,
}

#[derive(Debug, Deserialize)]
struct ArticleIdList {
    #[serde(rename = "ArticleId", default)]
    ids: Vec<ArticleId>,
}

#[derive(Debug, Deserialize)]
struct ArticleId {
    #[serde(rename = "@IdType")]
    id_type: Option<String>,
    #[serde(rename = "$text")]
    value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_XML: &str = r#"<?xml version="1.0" ?>
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation>
      <PMID>23883931</PMID>
      <Article>
        <Journal>
          <JournalIssue>
            <PubDate><Year>2013</Year></PubDate>
          </JournalIssue>
          <Title>Nature</Title>
        </Journal>
        <ArticleTitle>CRISPR-mediated genome engineering</ArticleTitle>
        <Abstract>
          <AbstractText>Programmable nucleases enable targeted edits.</AbstractText>
        </Abstract>
        <AuthorList>
          <Author><LastName>Smith</LastName><ForeName>Jane</ForeName></Author>
          <Author><LastName>Lee</LastName><ForeName>Ken</ForeName></Author>
        </AuthorList>
      </Article>
      <MeshHeadingList>
        <MeshHeading><DescriptorName>Gene Editing</DescriptorName></MeshHeading>
      </MeshHeadingList>
    </MedlineCitation>
    <PubmedData>
      <ArticleIdList>
        <ArticleId IdType="doi">10.1038/nature12373</ArticleId>
        <ArticleId IdType="pmc">PMC3969860</ArticleId>
      </ArticleIdList>
    </PubmedData>
  </PubmedArticle>
</PubmedArticleSet>"#;

    #[test]
    fn test_parse_efetch_xml() {
        let set: PubmedArticleSet = quick_xml::de::from_str(SAMPLE_XML).unwrap();
        assert_eq!(set.articles.len(), 1);

        let paper = parse_article(set.articles.into_iter().next().unwrap()).unwrap();
        assert_eq!(paper.pmid.as_deref(), Some("23883931"));
        assert_eq!(paper.doi.as_deref(), Some("10.1038/nature12373"));
        assert_eq!(paper.pmcid.as_deref(), Some("PMC3969860"));
        assert_eq!(paper.title, "CRISPR-mediated genome engineering");
        assert_eq!(paper.authors, vec!["Jane Smith", "Ken Lee"]);
        assert_eq!(paper.year, Some(2013));
        assert_eq!(paper.journal.as_deref(), Some("Nature"));
        assert_eq!(paper.keywords, vec!["Gene Editing"]);
        assert_eq!(paper.access_type, AccessType::Open);
        assert_eq!(paper.source_type, SourceType::PeerReviewed);
        assert!(paper.pdf_url.as_deref().unwrap().contains("PMC3969860"));
    }

    #[test]
    fn test_article_without_pmid_is_skipped() {
        let xml = r#"<PubmedArticleSet>
  <PubmedArticle><MedlineCitation><Article><ArticleTitle>No id</ArticleTitle></Article></MedlineCitation></PubmedArticle>
</PubmedArticleSet>"#;
        let set: PubmedArticleSet = quick_xml::de::from_str(xml).unwrap();
        assert!(parse_article(set.articles.into_iter().next().unwrap()).is_none());
    }
}
