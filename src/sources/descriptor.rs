//! Static descriptors for the table-driven REST adapters.
//!
//! Most providers are thin variations of the same request shape: a base URL,
//! a query parameter, an auth style, and a projection from the response body
//! to [`Paper`](crate::types::Paper) records. Describing them here keeps one
//! generic adapter per wire pattern instead of one bespoke client per
//! provider.

use super::SourceFamily;

/// How a request authenticates against the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStyle {
    /// No credentials required.
    None,
    /// `Authorization: Bearer <key>` header; the key name is looked up in
    /// the configuration.
    Bearer(&'static str),
    /// Custom header carrying the key.
    Header {
        header: &'static str,
        key: &'static str,
    },
    /// Key passed as a query parameter.
    QueryParam {
        param: &'static str,
        key: &'static str,
    },
}

impl AuthStyle {
    /// Config key this auth style reads, when any.
    pub(crate) fn key_name(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Bearer(key) | Self::Header { key, .. } | Self::QueryParam { key, .. } => {
                Some(key)
            }
        }
    }
}

/// Selects the response-to-record projection inside the generic adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    EuropePmc,
    Core,
    Base,
    Doaj,
    Rxiv,
    Springer,
    Ieee,
    Scopus,
    WebOfScience,
}

/// One provider reachable through the generic REST adapter.
#[derive(Debug, Clone, Copy)]
pub struct SourceDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub family: SourceFamily,
    pub base_url: &'static str,
    /// Name of the free-text query parameter.
    pub query_param: &'static str,
    /// Name of the page-size parameter, with its maximum accepted value.
    pub page_param: &'static str,
    pub page_max: usize,
    pub auth: AuthStyle,
    pub projection: Projection,
    /// Config key that must hold an API key for the adapter to be available.
    /// `None` means the provider has a keyless tier.
    pub requires_key: Option<&'static str>,
    /// Extra fixed query parameters sent with every request.
    pub extra_params: &'static [(&'static str, &'static str)],
}

/// Providers served by the generic REST adapter. Dedicated modules cover
/// PubMed, arXiv, CrossRef, Semantic Scholar, OpenAlex, Dimensions/Lens,
/// Google Scholar and DuckDuckGo.
pub const REST_SOURCES: &[SourceDescriptor] = &[
    SourceDescriptor {
        id: "europe_pmc",
        name: "Europe PMC",
        family: SourceFamily::Academic,
        base_url: "https://www.ebi.ac.uk/europepmc/webservices/rest/search",
        query_param: "query",
        page_param: "pageSize",
        page_max: 100,
        auth: AuthStyle::None,
        projection: Projection::EuropePmc,
        requires_key: None,
        extra_params: &[("format", "json"), ("resultType", "core")],
    },
    SourceDescriptor {
        id: "core",
        name: "CORE",
        family: SourceFamily::Academic,
        base_url: "https://api.core.ac.uk/v3/search/works",
        query_param: "q",
        page_param: "limit",
        page_max: 100,
        auth: AuthStyle::Bearer("core"),
        projection: Projection::Core,
        requires_key: None,
        extra_params: &[],
    },
    SourceDescriptor {
        id: "base",
        name: "BASE",
        family: SourceFamily::Academic,
        base_url: "https://api.base-search.net/cgi-bin/BaseHttpSearchInterface.fcgi",
        query_param: "query",
        page_param: "hits",
        page_max: 100,
        auth: AuthStyle::None,
        projection: Projection::Base,
        requires_key: None,
        extra_params: &[("func", "PerformSearch"), ("format", "json")],
    },
    SourceDescriptor {
        id: "doaj",
        name: "DOAJ",
        family: SourceFamily::Academic,
        base_url: "https://doaj.org/api/search/articles",
        query_param: "q",
        page_param: "pageSize",
        page_max: 100,
        auth: AuthStyle::None,
        projection: Projection::Doaj,
        requires_key: None,
        extra_params: &[],
    },
    SourceDescriptor {
        id: "biorxiv",
        name: "bioRxiv",
        family: SourceFamily::Preprint,
        base_url: "https://api.biorxiv.org/fulltext",
        query_param: "terms",
        page_param: "limit",
        page_max: 100,
        auth: AuthStyle::None,
        projection: Projection::Rxiv,
        requires_key: None,
        extra_params: &[("server", "biorxiv")],
    },
    SourceDescriptor {
        id: "medrxiv",
        name: "medRxiv",
        family: SourceFamily::Preprint,
        base_url: "https://api.biorxiv.org/fulltext",
        query_param: "terms",
        page_param: "limit",
        page_max: 100,
        auth: AuthStyle::None,
        projection: Projection::Rxiv,
        requires_key: None,
        extra_params: &[("server", "medrxiv")],
    },
    SourceDescriptor {
        id: "chemrxiv",
        name: "ChemRxiv",
        family: SourceFamily::Preprint,
        base_url: "https://chemrxiv.org/engage/chemrxiv/public-api/v1/items",
        query_param: "term",
        page_param: "limit",
        page_max: 50,
        auth: AuthStyle::None,
        projection: Projection::Rxiv,
        requires_key: None,
        extra_params: &[],
    },
    SourceDescriptor {
        id: "springer",
        name: "Springer Nature",
        family: SourceFamily::Publisher,
        base_url: "https://api.springernature.com/metadata/json",
        query_param: "q",
        page_param: "p",
        page_max: 100,
        auth: AuthStyle::QueryParam {
            param: "api_key",
            key: "springer",
        },
        projection: Projection::Springer,
        requires_key: Some("springer"),
        extra_params: &[],
    },
    SourceDescriptor {
        id: "ieee",
        name: "IEEE Xplore",
        family: SourceFamily::Publisher,
        base_url: "https://ieeexploreapi.ieee.org/api/v1/search/articles",
        query_param: "querytext",
        page_param: "max_records",
        page_max: 200,
        auth: AuthStyle::QueryParam {
            param: "apikey",
            key: "ieee",
        },
        projection: Projection::Ieee,
        requires_key: Some("ieee"),
        extra_params: &[("format", "json")],
    },
    SourceDescriptor {
        id: "elsevier",
        name: "Elsevier ScienceDirect",
        family: SourceFamily::Publisher,
        base_url: "https://api.elsevier.com/content/search/sciencedirect",
        query_param: "query",
        page_param: "count",
        page_max: 100,
        auth: AuthStyle::Header {
            header: "X-ELS-APIKey",
            key: "elsevier",
        },
        // ScienceDirect and Scopus share the search-results envelope.
        projection: Projection::Scopus,
        requires_key: Some("elsevier"),
        extra_params: &[],
    },
    SourceDescriptor {
        id: "scopus",
        name: "Scopus",
        family: SourceFamily::CitationIndex,
        base_url: "https://api.elsevier.com/content/search/scopus",
        query_param: "query",
        page_param: "count",
        page_max: 25,
        auth: AuthStyle::Header {
            header: "X-ELS-APIKey",
            key: "scopus",
        },
        projection: Projection::Scopus,
        requires_key: Some("scopus"),
        extra_params: &[],
    },
    SourceDescriptor {
        id: "wos",
        name: "Web of Science",
        family: SourceFamily::CitationIndex,
        base_url: "https://api.clarivate.com/apis/wos-starter/v1/documents",
        query_param: "q",
        page_param: "limit",
        page_max: 50,
        auth: AuthStyle::Header {
            header: "X-ApiKey",
            key: "wos",
        },
        projection: Projection::WebOfScience,
        requires_key: Some("wos"),
        extra_params: &[("db", "WOS")],
    },
];

/// Publisher names routed through the composite CrossRef publisher adapter.
/// This is how dozens of publishers are covered without bespoke clients.
pub const CROSSREF_PUBLISHERS: &[&str] = &[
    // Major commercial publishers
    "Springer Nature",
    "Elsevier",
    "Wiley",
    "IEEE",
    "Taylor & Francis",
    "SAGE Publications",
    // Scientific society publishers
    "American Chemical Society",
    "American Physical Society",
    "IOP Publishing",
    "Royal Society of Chemistry",
    "American Association for the Advancement of Science",
    "American Institute of Physics",
    // University presses
    "Cambridge University Press",
    "Oxford University Press",
    "MIT Press",
    "Princeton University Press",
    "University of Chicago Press",
    // Open access publishers
    "Frontiers Media",
    "MDPI",
    "PLOS",
    "BMC",
    "Hindawi",
    "PeerJ",
    // Other majors
    "De Gruyter",
    "Brill",
    "Emerald",
    "Karger",
    "Thieme",
    "Wolters Kluwer",
    "Copernicus",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_ids_are_unique() {
        let mut ids: Vec<&str> = REST_SOURCES.iter().map(|d| d.id).collect();
        ids.sort_unstable();
        let before = ids.len();
        ids.dedup();
        assert_eq!(before, ids.len());
    }

    #[test]
    fn test_key_gated_sources_declare_their_key() {
        for descriptor in REST_SOURCES {
            if let Some(key) = descriptor.requires_key {
                let matches = match descriptor.auth {
                    AuthStyle::Bearer(k) => k == key,
                    AuthStyle::Header { key: k, .. } => k == key,
                    AuthStyle::QueryParam { key: k, .. } => k == key,
                    AuthStyle::None => false,
                };
                assert!(matches, "descriptor {} auth/key mismatch", descriptor.id);
            }
        }
    }
}
