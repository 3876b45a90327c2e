//! Multi-layer deduplication.
//!
//! Layer 1 folds records by normalized DOI. Layer 2 folds the DOI-less
//! remainder by PubMed ID and by normalized arXiv ID. Layer 3 catches what
//! identifiers cannot: titles are compared after normalization, with Jaccard
//! similarity backstops. Records promoted out of Layers 1-2 also pass the
//! title check so the same work indexed under different identifiers still
//! collapses.
//!
//! Layer 3 shards its candidate set by the first token of the normalized
//! title, which keeps the pairwise comparison near-linear on real corpora.

use crate::types::Paper;
use crate::utils::text::{
    author_surname, jaccard, normalize_arxiv_id, normalize_doi, normalize_title, tokenize,
};
use std::collections::{HashMap, HashSet};

const STRICT_TITLE_THRESHOLD: f64 = 0.95;
const TITLE_SIMILARITY_THRESHOLD: f64 = 0.90;

#[derive(Debug, Default)]
pub struct Deduplicator;

impl Deduplicator {
    pub fn new() -> Self {
        Self
    }

    /// Fold a raw record list into a unique set, merging complementary
    /// fields. Output order: DOI-folded records first (in first-seen order),
    /// then PubMed/arXiv promotions, then title-only records.
    pub fn deduplicate(&self, papers: Vec<Paper>) -> Vec<Paper> {
        if papers.is_empty() {
            return papers;
        }

        // Layer 1: DOI fold.
        let mut doi_fold = IdentityFold::default();
        let mut no_doi = Vec::new();
        for paper in papers {
            match paper
                .doi
                .as_deref()
                .map(normalize_doi)
                .filter(|d| !d.is_empty())
            {
                Some(key) => doi_fold.insert_or_merge(key, paper),
                None => no_doi.push(paper),
            }
        }

        // Layer 2: PubMed / arXiv fold over the DOI-less remainder.
        let mut pmid_fold = IdentityFold::default();
        let mut arxiv_fold = IdentityFold::default();
        let mut no_id = Vec::new();
        for paper in no_doi {
            if let Some(pmid) = paper.pmid.clone().filter(|p| !p.trim().is_empty()) {
                pmid_fold.insert_or_merge(pmid.trim().to_string(), paper);
            } else if let Some(arxiv) = paper
                .arxiv_id
                .as_deref()
                .map(normalize_arxiv_id)
                .filter(|a| !a.is_empty())
            {
                arxiv_fold.insert_or_merge(arxiv, paper);
            } else {
                no_id.push(paper);
            }
        }

        // Layer 3: title fold, applied to promotions and the unidentified
        // remainder alike.
        let mut unique = TitleIndex::default();
        for paper in doi_fold.into_papers() {
            unique.push(paper);
        }
        for paper in pmid_fold.into_papers() {
            unique.push_or_merge(paper);
        }
        for paper in arxiv_fold.into_papers() {
            unique.push_or_merge(paper);
        }
        for paper in no_id {
            unique.push_or_merge(paper);
        }

        unique.into_papers()
    }
}

/// Merge two observations of the same work. `kept` was seen first and keeps
/// the primary source; identifiers are sticky, descriptive fields take the
/// most complete value.
pub fn merge(mut kept: Paper, incoming: Paper) -> Paper {
    if kept.title.trim().is_empty() && !incoming.title.trim().is_empty() {
        kept.title = incoming.title;
    }

    kept.abstract_text = match (kept.abstract_text.take(), incoming.abstract_text) {
        (Some(a), Some(b)) => Some(if a.len() >= b.len() { a } else { b }),
        (a, b) => a.or(b),
    };

    kept.year = kept.year.or(incoming.year);
    kept.journal = kept.journal.filter(|j| !j.is_empty()).or(incoming.journal);
    kept.publisher = kept
        .publisher
        .filter(|p| !p.is_empty())
        .or(incoming.publisher);
    kept.doi = kept.doi.filter(|d| !d.is_empty()).or(incoming.doi);
    kept.pmid = kept.pmid.filter(|p| !p.is_empty()).or(incoming.pmid);
    kept.pmcid = kept.pmcid.filter(|p| !p.is_empty()).or(incoming.pmcid);
    kept.arxiv_id = kept
        .arxiv_id
        .filter(|a| !a.is_empty())
        .or(incoming.arxiv_id);

    if incoming.authors.len() > kept.authors.len() {
        kept.authors = incoming.authors;
    }

    kept.citation_count = match (kept.citation_count, incoming.citation_count) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    };

    kept.pdf_url = kept.pdf_url.filter(|u| !u.is_empty()).or(incoming.pdf_url);
    kept.access_type = kept.access_type.merged_with(incoming.access_type);

    for keyword in incoming.keywords {
        if !kept.keywords.contains(&keyword) {
            kept.keywords.push(keyword);
        }
    }
    for source in incoming.sources_found_in {
        if !kept.sources_found_in.contains(&source) {
            kept.sources_found_in.push(source);
        }
    }
    for (kind, url) in incoming.urls {
        kept.urls.entry(kind).or_insert(url);
    }

    if kept.source_type == crate::types::SourceType::Unknown {
        kept.source_type = incoming.source_type;
    }
    if kept.reliability.is_retracted || incoming.reliability.is_retracted {
        kept.reliability.is_retracted = true;
    }

    kept
}

/// Insertion-ordered fold keyed by one identifier.
#[derive(Debug, Default)]
struct IdentityFold {
    index: HashMap<String, usize>,
    papers: Vec<Paper>,
}

impl IdentityFold {
    fn insert_or_merge(&mut self, key: String, paper: Paper) {
        match self.index.get(&key) {
            Some(&idx) => {
                let kept = std::mem::take(&mut self.papers[idx]);
                self.papers[idx] = merge(kept, paper);
            }
            None => {
                self.index.insert(key, self.papers.len());
                self.papers.push(paper);
            }
        }
    }

    fn into_papers(self) -> Vec<Paper> {
        self.papers
    }
}

/// Accumulating unique set with title-equivalence lookup, sharded by the
/// first token of the normalized title.
#[derive(Debug, Default)]
struct TitleIndex {
    papers: Vec<Paper>,
    normalized: Vec<String>,
    tokens: Vec<HashSet<String>>,
    buckets: HashMap<String, Vec<usize>>,
}

impl TitleIndex {
    fn bucket_key(normalized: &str) -> String {
        normalized
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string()
    }

    fn push(&mut self, paper: Paper) {
        let normalized = normalize_title(&paper.title);
        let tokens = tokenize(&normalized, 2);
        let key = Self::bucket_key(&normalized);
        let idx = self.papers.len();
        self.buckets.entry(key).or_default().push(idx);
        self.normalized.push(normalized);
        self.tokens.push(tokens);
        self.papers.push(paper);
    }

    /// Insert the paper, or merge it into an existing title-equivalent one.
    fn push_or_merge(&mut self, paper: Paper) {
        match self.find_duplicate(&paper) {
            Some(idx) => {
                let kept = std::mem::take(&mut self.papers[idx]);
                self.papers[idx] = merge(kept, paper);
            }
            None => self.push(paper),
        }
    }

    fn find_duplicate(&self, paper: &Paper) -> Option<usize> {
        let normalized = normalize_title(&paper.title);
        if normalized.is_empty() {
            return None;
        }
        let tokens = tokenize(&normalized, 2);
        let key = Self::bucket_key(&normalized);

        for &idx in self.buckets.get(&key)? {
            if self.normalized[idx].is_empty() {
                continue;
            }
            if normalized == self.normalized[idx] {
                return Some(idx);
            }
            let similarity = jaccard(&tokens, &self.tokens[idx]);
            if similarity >= STRICT_TITLE_THRESHOLD {
                return Some(idx);
            }
            if similarity >= TITLE_SIMILARITY_THRESHOLD
                && same_year(paper, &self.papers[idx])
                && same_first_author(paper, &self.papers[idx])
            {
                return Some(idx);
            }
        }
        None
    }

    fn into_papers(self) -> Vec<Paper> {
        self.papers
    }
}

fn same_year(a: &Paper, b: &Paper) -> bool {
    matches!((a.year, b.year), (Some(x), Some(y)) if x == y)
}

fn same_first_author(a: &Paper, b: &Paper) -> bool {
    match (a.authors.first(), b.authors.first()) {
        (Some(first_a), Some(first_b)) => {
            let surname_a = author_surname(first_a);
            let surname_b = author_surname(first_b);
            !surname_a.is_empty() && surname_a == surname_b
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AccessType;

    fn paper(title: &str) -> Paper {
        Paper {
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_doi_fold_merges_complementary_fields() {
        let a = Paper {
            title: "Genome engineering".into(),
            doi: Some("10.1038/nature12373".into()),
            abstract_text: Some("foo".into()),
            citation_count: Some(100),
            sources_found_in: vec!["pubmed".into()],
            source: "pubmed".into(),
            ..Default::default()
        };
        let b = Paper {
            title: "Genome engineering".into(),
            doi: Some("https://doi.org/10.1038/NATURE12373".into()),
            abstract_text: Some("foo bar baz".into()),
            citation_count: Some(150),
            sources_found_in: vec!["crossref".into()],
            source: "crossref".into(),
            ..Default::default()
        };

        let unique = Deduplicator::new().deduplicate(vec![a, b]);
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].abstract_text.as_deref(), Some("foo bar baz"));
        assert_eq!(unique[0].citation_count, Some(150));
        assert_eq!(unique[0].source, "pubmed");
        assert_eq!(unique[0].sources_found_in, vec!["pubmed", "crossref"]);
    }

    #[test]
    fn test_title_layer_collapses_cross_identifier_duplicates() {
        let a = Paper {
            title: "A Study of Widgets".into(),
            doi: Some("10.1/x".into()),
            year: Some(2020),
            authors: vec!["Smith".into(), "Jones".into()],
            ..Default::default()
        };
        let b = Paper {
            title: "a study of widgets".into(),
            pmid: Some("1234".into()),
            year: Some(2020),
            authors: vec!["Smith".into(), "Lee".into()],
            ..Default::default()
        };

        let unique = Deduplicator::new().deduplicate(vec![a, b]);
        assert_eq!(unique.len(), 1);
        // Identifiers are sticky across the merge.
        assert_eq!(unique[0].doi.as_deref(), Some("10.1/x"));
        assert_eq!(unique[0].pmid.as_deref(), Some("1234"));
    }

    #[test]
    fn test_pmid_and_arxiv_fold_without_doi() {
        let papers = vec![
            Paper {
                title: "Neutrino oscillations".into(),
                pmid: Some("99".into()),
                ..Default::default()
            },
            Paper {
                title: "Neutrino oscillations observed".into(),
                pmid: Some("99".into()),
                ..Default::default()
            },
            Paper {
                title: "Lattice gauge theory".into(),
                arxiv_id: Some("arXiv:2301.00001v1".into()),
                ..Default::default()
            },
            Paper {
                title: "Lattice gauge theory".into(),
                arxiv_id: Some("2301.00001v3".into()),
                ..Default::default()
            },
        ];
        let unique = Deduplicator::new().deduplicate(papers);
        assert_eq!(unique.len(), 2);
    }

    #[test]
    fn test_no_doi_collision_in_output() {
        let papers: Vec<Paper> = (0..50)
            .map(|i| Paper {
                title: format!("Paper number {i}"),
                doi: Some(format!("10.1000/{}", i % 10)),
                ..Default::default()
            })
            .collect();
        let unique = Deduplicator::new().deduplicate(papers);

        let mut dois: Vec<String> = unique
            .iter()
            .filter_map(|p| p.doi.as_deref().map(normalize_doi))
            .collect();
        let before = dois.len();
        dois.sort();
        dois.dedup();
        assert_eq!(before, dois.len());
        assert_eq!(unique.len(), 10);
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let papers = vec![
            Paper {
                title: "A Study of Widgets".into(),
                doi: Some("10.1/x".into()),
                year: Some(2020),
                authors: vec!["Smith".into()],
                ..Default::default()
            },
            Paper {
                title: "a study of widgets".into(),
                pmid: Some("1234".into()),
                year: Some(2020),
                authors: vec!["Smith".into()],
                ..Default::default()
            },
            paper("Completely unrelated paper"),
            paper("Completely unrelated paper"),
        ];

        let dedup = Deduplicator::new();
        let once = dedup.deduplicate(papers);
        let twice = dedup.deduplicate(once.clone());

        assert_eq!(once.len(), twice.len());
        let titles_once: Vec<&str> = once.iter().map(|p| p.title.as_str()).collect();
        let titles_twice: Vec<&str> = twice.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles_once, titles_twice);
    }

    #[test]
    fn test_merge_is_commutative_on_contract_fields() {
        let a = Paper {
            title: "Title".into(),
            doi: Some("10.1/x".into()),
            abstract_text: Some("short".into()),
            authors: vec!["Smith".into()],
            keywords: vec!["alpha".into()],
            citation_count: Some(10),
            sources_found_in: vec!["pubmed".into()],
            source: "pubmed".into(),
            ..Default::default()
        };
        let b = Paper {
            title: "Title".into(),
            pmid: Some("42".into()),
            abstract_text: Some("a much longer abstract".into()),
            authors: vec!["Smith".into(), "Lee".into()],
            keywords: vec!["beta".into()],
            citation_count: Some(25),
            sources_found_in: vec!["crossref".into()],
            source: "crossref".into(),
            ..Default::default()
        };

        let ab = merge(a.clone(), b.clone());
        let ba = merge(b, a);

        assert_eq!(ab.doi, ba.doi);
        assert_eq!(ab.pmid, ba.pmid);
        assert_eq!(ab.abstract_text, ba.abstract_text);
        assert_eq!(ab.citation_count, ba.citation_count);

        let set = |v: &[String]| v.iter().cloned().collect::<std::collections::BTreeSet<_>>();
        assert_eq!(set(&ab.keywords), set(&ba.keywords));
        assert_eq!(set(&ab.sources_found_in), set(&ba.sources_found_in));
        assert_eq!(ab.authors, ba.authors);
        // Primary source follows first-seen and legitimately differs.
        assert_eq!(ab.source, "pubmed");
        assert_eq!(ba.source, "crossref");
    }

    #[test]
    fn test_merge_access_type_precedence() {
        let a = Paper {
            title: "T".into(),
            doi: Some("10.1/x".into()),
            access_type: AccessType::Paywalled,
            ..Default::default()
        };
        let b = Paper {
            title: "T".into(),
            doi: Some("10.1/x".into()),
            access_type: AccessType::Open,
            ..Default::default()
        };
        let unique = Deduplicator::new().deduplicate(vec![a, b]);
        assert_eq!(unique[0].access_type, AccessType::Open);
    }

    #[test]
    fn test_near_duplicate_titles_need_year_and_author_agreement() {
        // 18 shared tokens plus 1 differing per title: Jaccard 18/20 = 0.90,
        // inside the [0.90, 0.95) band that needs year + first-author accord.
        let base = "alpha beta gamma delta epsilon zeta eta theta iota rho \
                    sigma tau phi chi psi omega aleph bet";
        let a = Paper {
            title: format!("{base} kappa"),
            year: Some(2020),
            authors: vec!["Ann Smith".into()],
            ..Default::default()
        };
        let near = Paper {
            title: format!("{base} lambda"),
            year: Some(2020),
            authors: vec!["A. Smith".into()],
            ..Default::default()
        };
        let different_year = Paper {
            title: format!("{base} lambda"),
            year: Some(2021),
            authors: vec!["A. Smith".into()],
            ..Default::default()
        };

        let collapsed = Deduplicator::new().deduplicate(vec![a.clone(), near]);
        assert_eq!(collapsed.len(), 1);

        let kept = Deduplicator::new().deduplicate(vec![a, different_year]);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_retraction_flag_survives_merge() {
        let mut retracted = Paper {
            title: "T".into(),
            doi: Some("10.1/x".into()),
            ..Default::default()
        };
        retracted.reliability.is_retracted = true;
        let clean = Paper {
            title: "T".into(),
            doi: Some("10.1/x".into()),
            ..Default::default()
        };
        let unique = Deduplicator::new().deduplicate(vec![clean, retracted]);
        assert!(unique[0].reliability.is_retracted);
    }
}
