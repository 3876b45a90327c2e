//! Weighted multi-factor relevance ranking.
//!
//! Pure function of (records, query, analysis, current year): identical
//! inputs always produce identical orderings. Ties break by citation count
//! descending, then year descending, then insertion order.

use crate::types::{AccessType, Paper, QueryAnalysis};
use crate::utils::text::{is_stop_word, tokenize};
use std::cmp::Ordering;
use std::collections::HashSet;

const WEIGHT_QUERY_MATCH: f64 = 0.30;
const WEIGHT_CITATION_IMPACT: f64 = 0.20;
const WEIGHT_RECENCY: f64 = 0.15;
const WEIGHT_SOURCE_AUTHORITY: f64 = 0.15;
const WEIGHT_OPEN_ACCESS: f64 = 0.10;
const WEIGHT_FULLTEXT: f64 = 0.10;

/// Fixed per-source authority table; unlisted sources score 0.60.
const SOURCE_AUTHORITY: &[(&str, f64)] = &[
    // Tier 1
    ("pubmed", 0.95),
    ("scopus", 0.95),
    ("wos", 0.95),
    ("nature", 0.95),
    ("science", 0.95),
    ("cell", 0.95),
    // Tier 2
    ("semantic_scholar", 0.90),
    ("google_scholar", 0.90),
    ("springer", 0.90),
    ("ieee", 0.90),
    ("crossref", 0.88),
    ("openalex", 0.88),
    // Tier 3
    ("arxiv", 0.85),
    ("europe_pmc", 0.85),
    ("dimensions", 0.85),
    ("base", 0.80),
    ("core", 0.80),
    ("doaj", 0.80),
    // Tier 4
    ("biorxiv", 0.75),
    ("medrxiv", 0.75),
    ("chemrxiv", 0.75),
    ("ssrn", 0.70),
];

const DEFAULT_AUTHORITY: f64 = 0.60;

#[derive(Debug, Default)]
pub struct RelevanceRanker;

impl RelevanceRanker {
    pub fn new() -> Self {
        Self
    }

    /// Score and sort the records by descending relevance. Scores are
    /// written back onto each record.
    pub fn rank(
        &self,
        mut papers: Vec<Paper>,
        query: &str,
        analysis: &QueryAnalysis,
        current_year: i32,
    ) -> Vec<Paper> {
        if papers.is_empty() {
            return papers;
        }

        let query_terms = query_terms(query);
        let mut expanded_terms = query_terms.clone();
        for concept in &analysis.related_concepts {
            for token in tokenize(concept, 2) {
                expanded_terms.insert(token);
            }
        }

        let max_citations = papers
            .iter()
            .filter_map(|p| p.citation_count)
            .max()
            .unwrap_or(0);

        for paper in &mut papers {
            paper.relevance_score = score(
                paper,
                &query_terms,
                &expanded_terms,
                current_year,
                max_citations,
            );
        }

        // Stable sort keeps insertion order for full ties.
        papers.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| {
                    b.citation_count
                        .unwrap_or(0)
                        .cmp(&a.citation_count.unwrap_or(0))
                })
                .then_with(|| b.year.unwrap_or(i32::MIN).cmp(&a.year.unwrap_or(i32::MIN)))
        });
        papers
    }
}

fn query_terms(query: &str) -> HashSet<String> {
    tokenize(query, 2)
        .into_iter()
        .filter(|term| !is_stop_word(term))
        .collect()
}

fn score(
    paper: &Paper,
    query_terms: &HashSet<String>,
    expanded_terms: &HashSet<String>,
    current_year: i32,
    max_citations: u32,
) -> f64 {
    query_match(paper, query_terms, expanded_terms) * WEIGHT_QUERY_MATCH
        + citation_impact(paper.citation_count, max_citations) * WEIGHT_CITATION_IMPACT
        + recency(paper.year, current_year) * WEIGHT_RECENCY
        + source_authority(&paper.source) * WEIGHT_SOURCE_AUTHORITY
        + open_access_bonus(paper) * WEIGHT_OPEN_ACCESS
        + fulltext_availability(paper) * WEIGHT_FULLTEXT
}

/// 0.6 x title match + 0.4 x abstract match; each part blends exact query
/// terms with expanded (concept-augmented) terms 0.7/0.3.
fn query_match(
    paper: &Paper,
    query_terms: &HashSet<String>,
    expanded_terms: &HashSet<String>,
) -> f64 {
    let part = |text: Option<&str>| -> f64 {
        let Some(text) = text else { return 0.0 };
        if query_terms.is_empty() {
            return 0.0;
        }
        let tokens = tokenize(text, 2);
        let exact = query_terms.iter().filter(|t| tokens.contains(*t)).count();
        let expanded = expanded_terms
            .iter()
            .filter(|t| tokens.contains(*t))
            .count();
        0.7 * exact as f64 / query_terms.len() as f64
            + 0.3 * expanded as f64 / expanded_terms.len().max(1) as f64
    };

    0.6 * part(Some(paper.title.as_str())) + 0.4 * part(paper.abstract_text.as_deref())
}

/// Log-scaled citation share of the corpus maximum, in [0, 1].
fn citation_impact(citations: Option<u32>, max_citations: u32) -> f64 {
    let (Some(citations), true) = (citations, max_citations > 0) else {
        return 0.0;
    };
    let share = f64::from(citations) / f64::from(max_citations);
    ((1.0 + 100.0 * share).ln() / 101f64.ln()).clamp(0.0, 1.0)
}

/// Step function of the paper's age; missing year scores 0.
fn recency(year: Option<i32>, current_year: i32) -> f64 {
    let Some(year) = year else { return 0.0 };
    let age = current_year - year;
    match age {
        i32::MIN..=0 => 1.0,
        1..=2 => 0.95,
        3..=5 => 0.85,
        6..=10 => 0.70,
        11..=20 => 0.50,
        _ => (0.50 - 0.02 * f64::from(age - 20)).max(0.2),
    }
}

fn source_authority(source: &str) -> f64 {
    let lower = source.to_lowercase();
    SOURCE_AUTHORITY
        .iter()
        .find(|(id, _)| *id == lower)
        .map(|(_, authority)| *authority)
        .unwrap_or(DEFAULT_AUTHORITY)
}

fn open_access_bonus(paper: &Paper) -> f64 {
    if paper.access_type == AccessType::Open {
        1.0
    } else if paper.pdf_url.as_deref().is_some_and(|u| !u.is_empty()) {
        0.7
    } else {
        0.0
    }
}

fn fulltext_availability(paper: &Paper) -> f64 {
    if paper.pdf_url.as_deref().is_some_and(|u| !u.is_empty()) {
        1.0
    } else if paper.arxiv_id.is_some()
        || (paper.pmid.is_some() && paper.access_type == AccessType::Open)
    {
        0.8
    } else {
        0.0
    }
}
