//! Citation network expansion.
//!
//! Takes the most-cited seeds and walks one hop of the citation graph in
//! both directions through a caller-supplied fetch function. Also finds
//! "common references": DOIs cited by several seed records, which often
//! surface foundational works the initial search never indexed directly.

use crate::types::{Paper, Result};
use crate::utils::text::normalize_doi;
use std::collections::{HashMap, HashSet};
use std::future::Future;

/// Which side of the citation edge to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CitationDirection {
    /// Works referenced by the identified paper.
    CitedBy,
    /// Works citing the identified paper.
    Citing,
}

pub struct CitationNetworkBuilder {
    max_seeds: usize,
    max_references: usize,
    max_citers: usize,
}

impl Default for CitationNetworkBuilder {
    fn default() -> Self {
        Self {
            max_seeds: 20,
            max_references: 50,
            max_citers: 50,
        }
    }
}

impl CitationNetworkBuilder {
    pub fn new(max_references: usize, max_citers: usize) -> Self {
        Self {
            max_seeds: 20,
            max_references,
            max_citers,
        }
    }

    /// Expand the network around the 20 most-cited seeds carrying a DOI or
    /// PubMed ID. Each direction has its own cap. Newly discovered records
    /// are attributed to the `citation_network` pseudo-source.
    pub async fn expand<F, Fut>(&self, seeds: &[Paper], fetch: F) -> Vec<Paper>
    where
        F: Fn(CitationDirection, String) -> Fut,
        Fut: Future<Output = Result<Vec<Paper>>>,
    {
        if seeds.is_empty() {
            return Vec::new();
        }

        let mut top: Vec<&Paper> = seeds
            .iter()
            .filter(|p| p.doi.is_some() || p.pmid.is_some())
            .collect();
        top.sort_by(|a, b| b.citation_count.unwrap_or(0).cmp(&a.citation_count.unwrap_or(0)));
        top.truncate(self.max_seeds);

        let mut seen: HashSet<String> = seeds
            .iter()
            .filter_map(|p| p.doi.as_deref().map(normalize_doi))
            .collect();

        let mut references = Vec::new();
        let mut citers = Vec::new();

        for seed in top {
            let identifier = match (&seed.doi, &seed.pmid) {
                (Some(doi), _) => doi.clone(),
                (None, Some(pmid)) => format!("PMID:{pmid}"),
                _ => continue,
            };

            if references.len() < self.max_references {
                match fetch(CitationDirection::CitedBy, identifier.clone()).await {
                    Ok(papers) => collect_new(
                        papers,
                        &mut seen,
                        &mut references,
                        self.max_references,
                    ),
                    Err(e) => {
                        tracing::warn!(seed = %identifier, error = %e, "reference fetch failed")
                    }
                }
            }

            if citers.len() < self.max_citers {
                match fetch(CitationDirection::Citing, identifier.clone()).await {
                    Ok(papers) => collect_new(papers, &mut seen, &mut citers, self.max_citers),
                    Err(e) => {
                        tracing::warn!(seed = %identifier, error = %e, "citation fetch failed")
                    }
                }
            }

            if references.len() >= self.max_references && citers.len() >= self.max_citers {
                break;
            }
        }

        references.extend(citers);
        references
    }

    /// DOIs referenced by at least three of the given records, most common
    /// first, bounded to fifty. Emitted as stub records attributed to the
    /// `common_citation` pseudo-source.
    pub async fn find_common_references<F, Fut>(&self, papers: &[Paper], fetch_refs: F) -> Vec<Paper>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<Vec<String>>>,
    {
        let mut counts: HashMap<String, usize> = HashMap::new();

        for paper in papers {
            let Some(doi) = &paper.doi else { continue };
            match fetch_refs(doi.clone()).await {
                Ok(reference_dois) => {
                    for reference in reference_dois {
                        *counts.entry(normalize_doi(&reference)).or_default() += 1;
                    }
                }
                Err(e) => tracing::warn!(seed = %doi, error = %e, "reference list fetch failed"),
            }
        }

        let mut common: Vec<(String, usize)> =
            counts.into_iter().filter(|(_, count)| *count >= 3).collect();
        common.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        common.truncate(50);

        common
            .into_iter()
            .map(|(doi, _)| Paper {
                id: format!("common_citation_{}", doi.replace('/', "_")),
                doi: Some(doi),
                source: "common_citation".into(),
                sources_found_in: vec!["common_citation".into()],
                ..Default::default()
            })
            .collect()
    }
}

fn collect_new(
    papers: Vec<Paper>,
    seen: &mut HashSet<String>,
    out: &mut Vec<Paper>,
    cap: usize,
) {
    for mut paper in papers {
        if out.len() >= cap {
            break;
        }
        let Some(doi) = paper.doi.as_deref().map(normalize_doi) else {
            continue;
        };
        if !seen.insert(doi) {
            continue;
        }
        paper.source = "citation_network".into();
        paper.add_source("citation_network");
        out.push(paper);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(doi: &str, citations: u32) -> Paper {
        Paper {
            title: format!("Seed {doi}"),
            doi: Some(doi.to_string()),
            citation_count: Some(citations),
            ..Default::default()
        }
    }

    fn linked(doi: &str) -> Paper {
        Paper {
            title: format!("Linked {doi}"),
            doi: Some(doi.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_expand_tags_and_dedupes() {
        let seeds = vec![seed("10.1/a", 500), seed("10.1/b", 100)];
        let builder = CitationNetworkBuilder::default();

        let expanded = builder
            .expand(&seeds, |direction, _id| async move {
                Ok(match direction {
                    // One of the returned DOIs is already a seed.
                    CitationDirection::CitedBy => vec![linked("10.1/a"), linked("10.1/ref")],
                    CitationDirection::Citing => vec![linked("10.1/citer")],
                })
            })
            .await;

        // Seed DOI filtered out; the rest tagged as citation_network.
        let dois: Vec<&str> = expanded.iter().filter_map(|p| p.doi.as_deref()).collect();
        assert!(dois.contains(&"10.1/ref"));
        assert!(dois.contains(&"10.1/citer"));
        assert!(!dois.contains(&"10.1/a"));
        for paper in &expanded {
            assert_eq!(paper.source, "citation_network");
        }
    }

    #[tokio::test]
    async fn test_expand_respects_per_direction_caps() {
        let seeds = vec![seed("10.1/a", 10)];
        let builder = CitationNetworkBuilder::new(3, 2);

        let expanded = builder
            .expand(&seeds, |direction, _id| async move {
                let prefix = match direction {
                    CitationDirection::CitedBy => "ref",
                    CitationDirection::Citing => "cite",
                };
                Ok((0..10).map(|i| linked(&format!("10.2/{prefix}{i}"))).collect())
            })
            .await;

        let refs = expanded
            .iter()
            .filter(|p| p.doi.as_deref().unwrap().contains("ref"))
            .count();
        let citers = expanded
            .iter()
            .filter(|p| p.doi.as_deref().unwrap().contains("cite"))
            .count();
        assert_eq!(refs, 3);
        assert_eq!(citers, 2);
    }

    #[tokio::test]
    async fn test_expand_survives_fetch_errors() {
        let seeds = vec![seed("10.1/a", 10)];
        let builder = CitationNetworkBuilder::default();
        let expanded = builder
            .expand(&seeds, |_direction, _id| async move {
                let failed: crate::types::Result<Vec<Paper>> =
                    Err(crate::types::AppError::Transport("boom".into()));
                failed
            })
            .await;
        assert!(expanded.is_empty());
    }

    #[tokio::test]
    async fn test_common_references_threshold() {
        let papers = vec![seed("10.1/a", 1), seed("10.1/b", 1), seed("10.1/c", 1)];
        let builder = CitationNetworkBuilder::default();

        let common = builder
            .find_common_references(&papers, |_doi| async move {
                // Every paper cites the same foundational work plus itself.
                Ok(vec!["10.9/foundational".to_string(), "10.9/noise".to_string()])
            })
            .await;

        // Only the DOI appearing in >= 3 reference lists survives... both do
        // here, since every fetch returns the same two DOIs.
        assert_eq!(common.len(), 2);
        assert_eq!(common[0].source, "common_citation");

        let selective = builder
            .find_common_references(&papers, |doi| async move {
                Ok(vec![format!("10.9/unique-{doi}")])
            })
            .await;
        assert!(selective.is_empty());
    }
}
