//! Open-access full-text resolution.
//!
//! Priority order: an existing PDF URL on the record, a constructed arXiv
//! PDF link, PubMed Central, Unpaywall by DOI, and (only when explicitly
//! enabled) the paywall-bypass fallback. The resolver never mutates the
//! record; the orchestrator writes results back.

use crate::sources::unpaywall::UnpaywallClient;
use crate::types::{AccessType, Paper};

/// Outcome of one resolution attempt.
#[derive(Debug, Clone)]
pub struct OpenAccessResult {
    pub found: bool,
    pub pdf_url: Option<String>,
    pub access_type: AccessType,
}

impl OpenAccessResult {
    fn not_found() -> Self {
        Self {
            found: false,
            pdf_url: None,
            access_type: AccessType::Unknown,
        }
    }

    fn open(pdf_url: String) -> Self {
        Self {
            found: true,
            pdf_url: Some(pdf_url),
            access_type: AccessType::Open,
        }
    }
}

pub struct FullTextResolver {
    unpaywall: UnpaywallClient,
    enable_scihub: bool,
}

impl FullTextResolver {
    pub fn new(unpaywall: UnpaywallClient, enable_scihub: bool) -> Self {
        Self {
            unpaywall,
            enable_scihub,
        }
    }

    /// Locate the best open-access URL for a record.
    pub async fn resolve(&self, paper: &Paper) -> OpenAccessResult {
        // 1. The record already carries a PDF link.
        if let Some(url) = paper.pdf_url.as_deref().filter(|u| !u.is_empty()) {
            return OpenAccessResult {
                found: true,
                pdf_url: Some(url.to_string()),
                access_type: paper.access_type.merged_with(AccessType::Open),
            };
        }

        // 2. arXiv PDFs are constructible from the identifier alone.
        if let Some(arxiv_id) = paper.arxiv_id.as_deref().filter(|a| !a.is_empty()) {
            return OpenAccessResult::open(format!("https://arxiv.org/pdf/{arxiv_id}.pdf"));
        }

        // 3. PubMed Central, when the PMC identifier is known.
        if let Some(pmcid) = paper.pmcid.as_deref().filter(|p| !p.is_empty()) {
            return OpenAccessResult::open(format!(
                "https://www.ncbi.nlm.nih.gov/pmc/articles/{pmcid}/pdf/"
            ));
        }

        // 4. Unpaywall lookup by DOI.
        if let Some(doi) = paper.doi.as_deref().filter(|d| !d.is_empty()) {
            match self.unpaywall.lookup(doi).await {
                Ok(Some(location)) => {
                    if let Some(url) = location.pdf_url.or(location.url) {
                        return OpenAccessResult::open(url);
                    }
                }
                Ok(None) => {}
                Err(e) => tracing::debug!(doi, error = %e, "unpaywall lookup failed"),
            }

            // 5. Paywall-bypass fallback, opt-in only.
            if self.enable_scihub {
                return OpenAccessResult {
                    found: true,
                    pdf_url: Some(format!("https://sci-hub.se/{doi}")),
                    access_type: AccessType::Paywalled,
                };
            }
        }

        OpenAccessResult::not_found()
    }
}
