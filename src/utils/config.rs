use std::collections::HashMap;
use std::env;
use std::time::Duration;

/// Environment variables that carry provider API keys, mapped to the
/// internal key name each adapter looks up.
const API_KEY_VARS: &[(&str, &str)] = &[
    ("NCBI_API_KEY", "ncbi"),
    ("SEMANTIC_SCHOLAR_API_KEY", "semantic_scholar"),
    ("CORE_API_KEY", "core"),
    ("SPRINGER_API_KEY", "springer"),
    ("IEEE_API_KEY", "ieee"),
    ("ELSEVIER_API_KEY", "elsevier"),
    ("DIMENSIONS_API_KEY", "dimensions"),
    ("LENS_API_KEY", "lens"),
    ("SCOPUS_API_KEY", "scopus"),
    ("WOS_API_KEY", "wos"),
    ("SERPAPI_KEY", "serpapi"),
];

/// Default per-source rate limits in requests per minute.
///
/// PubMed without an NCBI key is limited to 3 req/s; a key raises it to
/// 10 req/s (applied in [`ResearchConfig::from_env`]).
const DEFAULT_RATE_LIMITS: &[(&str, u32)] = &[
    ("pubmed", 180),
    ("arxiv", 60),
    ("semantic_scholar", 1200),
    ("crossref", 3000),
    ("openalex", 3600),
    ("base", 3600),
    ("core", 3600),
    ("europe_pmc", 3600),
    ("doaj", 3600),
    ("google_scholar", 5),
    ("scopus", 540),
    ("wos", 300),
    ("springer", 1200),
    ("ieee", 1800),
    ("elsevier", 900),
    ("dimensions", 1800),
    ("lens", 1800),
    ("biorxiv", 1800),
    ("medrxiv", 1800),
    ("chemrxiv", 1800),
    ("duckduckgo", 60),
    ("unpaywall", 3600),
];

/// Process-wide research configuration, read once at startup and immutable
/// afterwards.
#[derive(Debug, Clone)]
pub struct ResearchConfig {
    /// Contact email sent to polite-pool APIs (CrossRef, OpenAlex, Unpaywall).
    pub email: String,
    api_keys: HashMap<String, String>,
    rate_limits: HashMap<String, u32>,
    /// Enables the paywall-bypass fallback in the full-text resolver.
    pub enable_scihub: bool,
    pub max_papers_per_source: usize,
    /// Global search deadline.
    pub search_timeout: Duration,
    /// Per-adapter-call transport timeout.
    pub adapter_timeout: Duration,
    /// Bounded fan-out worker pool size.
    pub parallel_workers: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            email: "researcher@example.com".to_string(),
            api_keys: HashMap::new(),
            rate_limits: DEFAULT_RATE_LIMITS
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            enable_scihub: false,
            max_papers_per_source: 100,
            search_timeout: Duration::from_secs(120),
            adapter_timeout: Duration::from_secs(30),
            parallel_workers: 10,
        }
    }
}

impl ResearchConfig {
    /// Build configuration from the process environment (after loading a
    /// `.env` file when present). No variable is required; absent keys
    /// simply leave the corresponding adapters disabled.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let mut config = Self::default();

        for (var, key) in API_KEY_VARS {
            if let Ok(value) = env::var(var) {
                if !value.is_empty() {
                    config.api_keys.insert((*key).to_string(), value);
                }
            }
        }

        // An NCBI key moves PubMed from the anonymous 3 req/s tier to 10 req/s.
        if config.api_keys.contains_key("ncbi") {
            config.rate_limits.insert("pubmed".to_string(), 600);
        }

        for var in ["RESEARCHER_EMAIL", "NCBI_EMAIL", "UNPAYWALL_EMAIL"] {
            if let Ok(email) = env::var(var) {
                if !email.is_empty() {
                    config.email = email;
                    break;
                }
            }
        }

        if let Ok(value) = env::var("ENABLE_SCIHUB") {
            config.enable_scihub = value.eq_ignore_ascii_case("true");
        }

        if let Ok(value) = env::var("MAX_PAPERS_PER_SOURCE") {
            if let Ok(max) = value.parse() {
                config.max_papers_per_source = max;
            }
        }

        config
    }

    pub fn api_key(&self, name: &str) -> Option<&str> {
        self.api_keys.get(name).map(String::as_str)
    }

    pub fn has_api_key(&self, name: &str) -> bool {
        self.api_keys.contains_key(name)
    }

    /// Rate limit for a source in requests per minute. Sources without an
    /// entry fall back to a conservative 60/min.
    pub fn rate_limit_for(&self, source_id: &str) -> u32 {
        self.rate_limits.get(source_id).copied().unwrap_or(60)
    }

    /// Test/builder helper: install an API key directly.
    pub fn with_api_key(mut self, name: &str, value: &str) -> Self {
        self.api_keys.insert(name.to_string(), value.to_string());
        self
    }
}
