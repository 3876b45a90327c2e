//! Source registry: constructs every adapter the configuration allows and
//! hands them out by id or by family. Immutable after construction.

use super::arxiv::ArxivAdapter;
use super::crossref::{CrossRefAdapter, CrossRefPublisherAdapter};
use super::descriptor::REST_SOURCES;
use super::dimensions::{DimensionsAdapter, LensAdapter};
use super::duckduckgo::DuckDuckGoAdapter;
use super::openalex::OpenAlexAdapter;
use super::pubmed::PubMedAdapter;
use super::rest::RestAdapter;
use super::scholar::GoogleScholarAdapter;
use super::semantic_scholar::SemanticScholarAdapter;
use super::{build_http_client, SourceAdapter, SourceFamily};
use crate::types::Result;
use crate::utils::ResearchConfig;
use std::collections::HashMap;
use std::sync::Arc;

pub struct SourceRegistry {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    index: HashMap<String, usize>,
    crossref: Option<Arc<CrossRefAdapter>>,
}

impl SourceRegistry {
    /// Build the full registry from configuration. Adapters whose required
    /// credentials are absent are omitted and logged once.
    pub fn from_config(config: &ResearchConfig) -> Result<Self> {
        let client = build_http_client(&config.email, config.adapter_timeout)?;
        let key = |name: &str| config.api_key(name).map(String::from);

        let crossref = Arc::new(CrossRefAdapter::new(
            client.clone(),
            config.rate_limit_for("crossref"),
            config.email.clone(),
        ));

        let mut candidates: Vec<Arc<dyn SourceAdapter>> = vec![
            Arc::new(PubMedAdapter::new(
                client.clone(),
                config.rate_limit_for("pubmed"),
                key("ncbi"),
                config.email.clone(),
            )),
            Arc::new(ArxivAdapter::new(
                client.clone(),
                config.rate_limit_for("arxiv"),
            )),
            Arc::new(SemanticScholarAdapter::new(
                client.clone(),
                config.rate_limit_for("semantic_scholar"),
                key("semantic_scholar"),
            )),
            crossref.clone(),
            Arc::new(OpenAlexAdapter::new(
                client.clone(),
                config.rate_limit_for("openalex"),
                config.email.clone(),
            )),
            Arc::new(GoogleScholarAdapter::new(
                client.clone(),
                config.rate_limit_for("google_scholar"),
                key("serpapi"),
            )),
            Arc::new(DimensionsAdapter::new(
                client.clone(),
                config.rate_limit_for("dimensions"),
                key("dimensions"),
            )),
            Arc::new(LensAdapter::new(
                client.clone(),
                config.rate_limit_for("lens"),
                key("lens"),
            )),
            Arc::new(DuckDuckGoAdapter::new(
                client.clone(),
                config.rate_limit_for("duckduckgo"),
            )),
        ];

        for descriptor in REST_SOURCES {
            let api_key = descriptor
                .auth
                .key_name()
                .and_then(|name| config.api_key(name))
                .map(String::from);
            candidates.push(Arc::new(RestAdapter::new(
                *descriptor,
                client.clone(),
                config.rate_limit_for(descriptor.id),
                api_key,
            )));
        }

        let mut registry = Self {
            adapters: Vec::new(),
            index: HashMap::new(),
            crossref: Some(crossref),
        };
        for adapter in candidates {
            if adapter.available() {
                registry.insert(adapter);
            } else {
                tracing::info!(
                    source = adapter.id(),
                    "adapter omitted: required credentials not configured"
                );
            }
        }

        tracing::info!(sources = registry.adapters.len(), "source registry ready");
        Ok(registry)
    }

    /// Registry over an explicit adapter set. Used by tests and embedders.
    pub fn from_adapters(adapters: Vec<Arc<dyn SourceAdapter>>) -> Self {
        let mut registry = Self {
            adapters: Vec::new(),
            index: HashMap::new(),
            crossref: None,
        };
        for adapter in adapters {
            if adapter.available() {
                registry.insert(adapter);
            }
        }
        registry
    }

    fn insert(&mut self, adapter: Arc<dyn SourceAdapter>) {
        let id = adapter.id().to_string();
        self.index.insert(id, self.adapters.len());
        self.adapters.push(adapter);
    }

    pub fn get(&self, source_id: &str) -> Option<Arc<dyn SourceAdapter>> {
        self.index
            .get(source_id)
            .map(|&idx| self.adapters[idx].clone())
    }

    pub fn all(&self) -> &[Arc<dyn SourceAdapter>] {
        &self.adapters
    }

    pub fn by_family(&self, family: SourceFamily) -> Vec<Arc<dyn SourceAdapter>> {
        self.adapters
            .iter()
            .filter(|a| a.family() == family)
            .cloned()
            .collect()
    }

    pub fn available_sources(&self) -> Vec<String> {
        self.adapters.iter().map(|a| a.id().to_string()).collect()
    }

    /// First adapter able to serve citation-network lookups.
    pub fn citation_provider(&self) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters
            .iter()
            .find(|a| a.supports_citations())
            .cloned()
    }

    /// Composite adapter searching one publisher through the shared CrossRef
    /// client. Returns `None` when CrossRef itself is not registered.
    pub fn publisher_adapter(&self, publisher: &str) -> Option<Arc<dyn SourceAdapter>> {
        self.crossref
            .as_ref()
            .map(|crossref| -> Arc<dyn SourceAdapter> {
                Arc::new(CrossRefPublisherAdapter::new(crossref.clone(), publisher))
            })
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_without_keys_omits_gated_sources() {
        let config = ResearchConfig::default();
        let registry = SourceRegistry::from_config(&config).unwrap();

        // Keyless tiers are always present.
        for id in [
            "pubmed",
            "arxiv",
            "semantic_scholar",
            "crossref",
            "openalex",
            "europe_pmc",
            "core",
            "base",
            "doaj",
            "duckduckgo",
        ] {
            assert!(registry.get(id).is_some(), "{id} missing");
        }

        // Key-gated adapters are omitted.
        for id in [
            "google_scholar",
            "dimensions",
            "lens",
            "springer",
            "ieee",
            "elsevier",
            "scopus",
            "wos",
        ] {
            assert!(registry.get(id).is_none(), "{id} should be omitted");
        }
    }

    #[test]
    fn test_registry_with_keys_enables_sources() {
        let config = ResearchConfig::default()
            .with_api_key("serpapi", "k")
            .with_api_key("dimensions", "k")
            .with_api_key("springer", "k");
        let registry = SourceRegistry::from_config(&config).unwrap();

        assert!(registry.get("google_scholar").is_some());
        assert!(registry.get("dimensions").is_some());
        assert!(registry.get("springer").is_some());
    }

    #[test]
    fn test_family_selection() {
        let config = ResearchConfig::default();
        let registry = SourceRegistry::from_config(&config).unwrap();

        let academic = registry.by_family(SourceFamily::Academic);
        assert!(academic.iter().any(|a| a.id() == "pubmed"));
        assert!(academic.iter().any(|a| a.id() == "crossref"));

        let preprints = registry.by_family(SourceFamily::Preprint);
        assert!(preprints.iter().any(|a| a.id() == "biorxiv"));
    }

    #[test]
    fn test_citation_provider_is_semantic_scholar() {
        let config = ResearchConfig::default();
        let registry = SourceRegistry::from_config(&config).unwrap();
        assert_eq!(
            registry.citation_provider().map(|a| a.id().to_string()),
            Some("semantic_scholar".to_string())
        );
    }

    #[test]
    fn test_publisher_adapter_shares_crossref() {
        let config = ResearchConfig::default();
        let registry = SourceRegistry::from_config(&config).unwrap();
        let adapter = registry.publisher_adapter("Wiley").unwrap();
        assert_eq!(adapter.id(), "publisher_wiley");
        assert_eq!(adapter.family(), SourceFamily::Publisher);
    }
}
