//! Unpaywall lookup client, used by the full-text resolver.
//!
//! Not a search adapter: Unpaywall resolves one DOI at a time to its best
//! known open-access location. The API requires a contact email.

use super::check_status;
use crate::types::{AccessType, Result};
use crate::utils::RateLimiter;
use serde::Deserialize;

const BASE_URL: &str = "https://api.unpaywall.org/v2";

/// Best open-access location known for a DOI.
#[derive(Debug, Clone)]
pub struct OaLocation {
    pub pdf_url: Option<String>,
    pub url: Option<String>,
    pub access_type: AccessType,
}

pub struct UnpaywallClient {
    client: reqwest::Client,
    limiter: RateLimiter,
    email: String,
    base_url: String,
}

impl UnpaywallClient {
    pub fn new(client: reqwest::Client, rate_limit_per_minute: u32, email: String) -> Self {
        Self {
            client,
            limiter: RateLimiter::per_minute(rate_limit_per_minute),
            email,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Point the client at a different endpoint. Used by tests.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    /// Look up the open-access status of a DOI. `Ok(None)` means the work is
    /// known but has no open copy.
    pub async fn lookup(&self, doi: &str) -> Result<Option<OaLocation>> {
        self.limiter.acquire().await;

        let url = format!("{}/{doi}", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("email", self.email.as_str())])
            .send()
            .await?;
        let response = check_status(response, "unpaywall")?;

        let body: UnpaywallResponse = response.json().await?;
        if !body.is_oa.unwrap_or(false) {
            return Ok(None);
        }

        let location = body.best_oa_location.unwrap_or_default();
        Ok(Some(OaLocation {
            pdf_url: location.url_for_pdf,
            url: location.url,
            access_type: AccessType::Open,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct UnpaywallResponse {
    is_oa: Option<bool>,
    best_oa_location: Option<BestLocation>,
}

#[derive(Debug, Default, Deserialize)]
struct BestLocation {
    url: Option<String>,
    url_for_pdf: Option<String>,
}
