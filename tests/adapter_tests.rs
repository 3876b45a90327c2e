//! Wire-level adapter tests against a mocked HTTP server.

use argos::sources::arxiv::ArxivAdapter;
use argos::sources::crossref::CrossRefAdapter;
use argos::sources::descriptor::REST_SOURCES;
use argos::sources::pubmed::PubMedAdapter;
use argos::sources::rest::RestAdapter;
use argos::sources::semantic_scholar::SemanticScholarAdapter;
use argos::sources::unpaywall::UnpaywallClient;
use argos::{AppError, SourceAdapter};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

// ============= CrossRef =============

#[tokio::test]
async fn test_crossref_parses_works() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/works"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {
                "items": [{
                    "DOI": "10.1038/nature12373",
                    "title": ["Genome engineering"],
                    "author": [{"given": "Jane", "family": "Smith"}],
                    "published": {"date-parts": [[2013]]},
                    "container-title": ["Nature"],
                    "is-referenced-by-count": 1500,
                    "publisher": "Springer Nature",
                    "type": "journal-article"
                }]
            }
        })))
        .mount(&server)
        .await;

    let adapter = CrossRefAdapter::new(client(), 3000, "test@example.com".into())
        .with_base_url(&format!("{}/works", server.uri()));
    let papers = adapter.search("genome engineering", 10).await.unwrap();

    assert_eq!(papers.len(), 1);
    assert_eq!(papers[0].doi.as_deref(), Some("10.1038/nature12373"));
    assert_eq!(papers[0].source, "crossref");
    assert_eq!(papers[0].sources_found_in, vec!["crossref"]);
}

#[tokio::test]
async fn test_crossref_publisher_filter_is_server_side() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("filter", "publisher-name:Wiley"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {"items": [{
                "DOI": "10.1002/example",
                "title": ["Filtered work"],
                "type": "journal-article"
            }]}
        })))
        .mount(&server)
        .await;

    let adapter = CrossRefAdapter::new(client(), 3000, "test@example.com".into())
        .with_base_url(&format!("{}/works", server.uri()));
    let papers = adapter.search_by_publisher("anything", "Wiley", 10).await.unwrap();

    assert_eq!(papers.len(), 1);
    assert_eq!(papers[0].publisher.as_deref(), Some("Wiley"));
}

#[tokio::test]
async fn test_crossref_http_error_maps_to_transport() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/works"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let adapter = CrossRefAdapter::new(client(), 3000, "test@example.com".into())
        .with_base_url(&format!("{}/works", server.uri()));
    let err = adapter.search("q", 10).await.unwrap_err();
    assert!(matches!(err, AppError::Transport(_)));
}

#[tokio::test]
async fn test_crossref_rate_limit_maps_to_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/works"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let adapter = CrossRefAdapter::new(client(), 3000, "test@example.com".into())
        .with_base_url(&format!("{}/works", server.uri()));
    let err = adapter.search("q", 10).await.unwrap_err();
    assert!(matches!(err, AppError::RateLimited(_)));
}

#[tokio::test]
async fn test_crossref_malformed_body_maps_to_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/works"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json at all"))
        .mount(&server)
        .await;

    let adapter = CrossRefAdapter::new(client(), 3000, "test@example.com".into())
        .with_base_url(&format!("{}/works", server.uri()));
    let err = adapter.search("q", 10).await.unwrap_err();
    // reqwest surfaces JSON decode failures through its own error type.
    assert!(matches!(err, AppError::Transport(_) | AppError::Parse(_)));
}

// ============= PubMed =============

#[tokio::test]
async fn test_pubmed_two_step_search() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "esearchresult": {"idlist": ["23883931"]}
        })))
        .mount(&server)
        .await;

    let efetch_xml = r#"<?xml version="1.0"?>
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation>
      <PMID>23883931</PMID>
      <Article>
        <Journal>
          <JournalIssue><PubDate><Year>2013</Year></PubDate></JournalIssue>
          <Title>Nature</Title>
        </Journal>
        <ArticleTitle>CRISPR-mediated genome engineering</ArticleTitle>
        <Abstract><AbstractText>Programmable nucleases.</AbstractText></Abstract>
        <AuthorList>
          <Author><LastName>Smith</LastName><ForeName>Jane</ForeName></Author>
        </AuthorList>
      </Article>
    </MedlineCitation>
    <PubmedData>
      <ArticleIdList>
        <ArticleId IdType="doi">10.1038/nature12373</ArticleId>
      </ArticleIdList>
    </PubmedData>
  </PubmedArticle>
</PubmedArticleSet>"#;
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(efetch_xml, "application/xml"))
        .mount(&server)
        .await;

    let adapter = PubMedAdapter::new(client(), 600, None, "test@example.com".into())
        .with_base_url(&server.uri());
    let papers = adapter.search("crispr", 10).await.unwrap();

    assert_eq!(papers.len(), 1);
    assert_eq!(papers[0].pmid.as_deref(), Some("23883931"));
    assert_eq!(papers[0].doi.as_deref(), Some("10.1038/nature12373"));
    assert_eq!(papers[0].source, "pubmed");
}

#[tokio::test]
async fn test_pubmed_empty_id_list_short_circuits() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "esearchresult": {"idlist": []}
        })))
        .mount(&server)
        .await;

    let adapter = PubMedAdapter::new(client(), 600, None, "test@example.com".into())
        .with_base_url(&server.uri());
    let papers = adapter.search("nothing", 10).await.unwrap();
    assert!(papers.is_empty());
}

// ============= arXiv =============

#[tokio::test]
async fn test_arxiv_parses_atom_feed() {
    let feed = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <entry>
    <id>http://arxiv.org/abs/2301.00001v1</id>
    <title>Quantum error correction at scale</title>
    <summary>Surface codes in practice.</summary>
    <published>2023-01-01T00:00:00Z</published>
    <author><name>Alice Chen</name></author>
    <category term="quant-ph"/>
  </entry>
</feed>"#;

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/query"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(feed, "application/atom+xml"))
        .mount(&server)
        .await;

    let adapter =
        ArxivAdapter::new(client(), 60).with_base_url(&format!("{}/api/query", server.uri()));
    let papers = adapter.search("quantum error correction", 10).await.unwrap();

    assert_eq!(papers.len(), 1);
    assert_eq!(papers[0].arxiv_id.as_deref(), Some("2301.00001"));
    assert_eq!(papers[0].source, "arxiv");
    assert!(papers[0].pdf_url.is_some());
}

// ============= Semantic Scholar =============

#[tokio::test]
async fn test_semantic_scholar_search_and_citations() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/paper/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "title": "Foundational work",
                "year": 2015,
                "citationCount": 900,
                "externalIds": {"DOI": "10.1/foundation"}
            }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/paper/10.1/foundation/citations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"citingPaper": {
                "title": "Later result",
                "year": 2020,
                "externalIds": {"DOI": "10.1/later"}
            }}]
        })))
        .mount(&server)
        .await;

    let adapter =
        SemanticScholarAdapter::new(client(), 1200, None).with_base_url(&server.uri());

    let found = adapter.search("foundation", 10).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].citation_count, Some(900));
    assert!(adapter.supports_citations());

    let citing = adapter.get_citations("10.1/foundation", 10).await.unwrap();
    assert_eq!(citing.len(), 1);
    assert_eq!(citing[0].doi.as_deref(), Some("10.1/later"));
}

// ============= Generic REST (Europe PMC descriptor) =============

#[tokio::test]
async fn test_rest_adapter_europe_pmc_projection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resultList": {"result": [{
                "title": "Open biomedical result",
                "authorString": "Garcia M, Chen L.",
                "pubYear": "2021",
                "journalTitle": "eLife",
                "doi": "10.7554/elife.00001",
                "pmid": "34000000",
                "citedByCount": 12,
                "isOpenAccess": "Y"
            }]}
        })))
        .mount(&server)
        .await;

    let descriptor = REST_SOURCES
        .iter()
        .find(|d| d.id == "europe_pmc")
        .copied()
        .unwrap();
    let adapter = RestAdapter::new(descriptor, client(), 3600, None)
        .with_base_url(&format!("{}/search", server.uri()));
    let papers = adapter.search("biomedicine", 10).await.unwrap();

    assert_eq!(papers.len(), 1);
    assert_eq!(papers[0].pmid.as_deref(), Some("34000000"));
    assert_eq!(papers[0].source, "europe_pmc");
}

// ============= Unpaywall =============

#[tokio::test]
async fn test_unpaywall_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("email", "test@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "is_oa": true,
            "best_oa_location": {"url_for_pdf": "https://repo.example/paper.pdf"}
        })))
        .mount(&server)
        .await;

    let unpaywall = UnpaywallClient::new(client(), 3600, "test@example.com".into())
        .with_base_url(&server.uri());
    let location = unpaywall.lookup("10.1/x").await.unwrap().unwrap();
    assert_eq!(
        location.pdf_url.as_deref(),
        Some("https://repo.example/paper.pdf")
    );
}

#[tokio::test]
async fn test_unpaywall_closed_work_returns_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"is_oa": false})))
        .mount(&server)
        .await;

    let unpaywall = UnpaywallClient::new(client(), 3600, "test@example.com".into())
        .with_base_url(&server.uri());
    assert!(unpaywall.lookup("10.1/x").await.unwrap().is_none());
}
