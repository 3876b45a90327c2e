//! Reliability scoring, independent of relevance.
//!
//! Additive components with fixed ceilings; the band thresholds live on
//! [`ReliabilityLevel`](crate::types::ReliabilityLevel). Retraction forces
//! the total to zero regardless of everything else.

use crate::types::{Paper, ReliabilityScore, SourceType};

/// Journals whose name alone carries the full journal-reputation component.
/// Matched case-insensitively by containment.
const HIGH_IMPACT_JOURNALS: &[&str] = &[
    "nature",
    "science",
    "cell",
    "the lancet",
    "new england journal of medicine",
    "jama",
    "bmj",
    "nature medicine",
    "nature genetics",
    "proceedings of the national academy of sciences",
    "physical review letters",
    "journal of the american chemical society",
    "angewandte chemie",
];

const REPUTABLE_PUBLISHERS: &[&str] = &[
    "springer",
    "elsevier",
    "wiley",
    "american chemical society",
    "royal society of chemistry",
    "ieee",
    "oxford university press",
    "cambridge university press",
    "plos",
    "frontiers",
    "bmc",
];

#[derive(Debug, Default)]
pub struct ReliabilityScorer;

impl ReliabilityScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score every record in place. Runs after deduplication so that
    /// `sources_found_in` reflects the full cross-source picture.
    pub fn score_all(&self, papers: &mut [Paper], current_year: i32) {
        for paper in papers {
            let retracted = paper.reliability.is_retracted;
            let contradictions = std::mem::take(&mut paper.reliability.contradictions);
            paper.reliability = score(paper, current_year);
            paper.reliability.is_retracted = retracted;
            paper.reliability.contradictions = contradictions;
        }
    }
}

fn score(paper: &Paper, current_year: i32) -> ReliabilityScore {
    ReliabilityScore {
        peer_review: peer_review_component(paper.source_type),
        journal: journal_component(paper.journal.as_deref(), paper.publisher.as_deref()),
        citations: citation_component(paper.citation_count.unwrap_or(0)),
        verification: verification_component(paper.sources_found_in.len().max(1)),
        recency: recency_component(paper.year, current_year),
        is_retracted: false,
        contradictions: Vec::new(),
    }
}

fn peer_review_component(source_type: SourceType) -> f64 {
    match source_type {
        SourceType::PeerReviewed => 0.30,
        SourceType::Conference => 0.20,
        SourceType::Preprint => 0.10,
        _ => 0.05,
    }
}

fn journal_component(journal: Option<&str>, publisher: Option<&str>) -> f64 {
    let Some(journal) = journal.filter(|j| !j.is_empty()) else {
        return 0.0;
    };
    let journal_lower = journal.to_lowercase();
    if HIGH_IMPACT_JOURNALS
        .iter()
        .any(|known| journal_lower.contains(known))
    {
        return 0.20;
    }
    if let Some(publisher) = publisher {
        let publisher_lower = publisher.to_lowercase();
        if REPUTABLE_PUBLISHERS
            .iter()
            .any(|known| publisher_lower.contains(known))
        {
            return 0.15;
        }
    }
    0.10
}

fn citation_component(citations: u32) -> f64 {
    match citations {
        500.. => 0.20,
        100..=499 => 0.15,
        25..=99 => 0.10,
        5..=24 => 0.05,
        1..=4 => 0.02,
        0 => 0.0,
    }
}

fn verification_component(sources_found: usize) -> f64 {
    match sources_found {
        5.. => 0.20,
        3..=4 => 0.15,
        2 => 0.10,
        _ => 0.05,
    }
}

fn recency_component(year: Option<i32>, current_year: i32) -> f64 {
    let Some(year) = year else { return 0.0 };
    let age = current_year - year;
    match age {
        i32::MIN..=2 => 0.10,
        3..=5 => 0.07,
        6..=10 => 0.04,
        _ => 0.02,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReliabilityLevel;

    #[test]
    fn test_high_impact_peer_reviewed_paper_scores_green() {
        let mut papers = vec![Paper {
            title: "Landmark result".into(),
            journal: Some("Nature".into()),
            source_type: SourceType::PeerReviewed,
            citation_count: Some(800),
            sources_found_in: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            year: Some(2021),
            ..Default::default()
        }];
        ReliabilityScorer::new().score_all(&mut papers, 2026);

        let reliability = &papers[0].reliability;
        // 0.30 + 0.20 + 0.20 + 0.15 + 0.07
        assert!((reliability.total() - 0.92).abs() < 1e-9);
        assert_eq!(reliability.level(), ReliabilityLevel::High);
        assert_eq!(reliability.level().color(), "green");
    }

    #[test]
    fn test_lone_preprint_scores_red() {
        let mut papers = vec![Paper {
            title: "Fresh preprint".into(),
            source_type: SourceType::Preprint,
            citation_count: Some(3),
            sources_found_in: vec!["arxiv".into()],
            year: Some(2026),
            ..Default::default()
        }];
        ReliabilityScorer::new().score_all(&mut papers, 2026);

        let reliability = &papers[0].reliability;
        // 0.10 + 0 + 0.02 + 0.05 + 0.10
        assert!((reliability.total() - 0.27).abs() < 1e-9);
        assert_eq!(reliability.level(), ReliabilityLevel::Low);
        assert_eq!(reliability.level().color(), "red");
    }

    #[test]
    fn test_retraction_forces_zero_through_rescoring() {
        let mut papers = vec![Paper {
            title: "Withdrawn".into(),
            journal: Some("Nature".into()),
            source_type: SourceType::PeerReviewed,
            citation_count: Some(1000),
            sources_found_in: vec!["a".into(), "b".into(), "c".into(), "d".into(), "e".into()],
            year: Some(2025),
            ..Default::default()
        }];
        papers[0].reliability.is_retracted = true;

        ReliabilityScorer::new().score_all(&mut papers, 2026);
        assert_eq!(papers[0].reliability.total(), 0.0);
    }

    #[test]
    fn test_contradictions_survive_rescoring() {
        let mut papers = vec![Paper {
            title: "Contested".into(),
            journal: Some("Nature".into()),
            source_type: SourceType::PeerReviewed,
            citation_count: Some(800),
            sources_found_in: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            year: Some(2021),
            ..Default::default()
        }];
        papers[0]
            .reliability
            .contradictions
            .push("disputed effect size".into());

        ReliabilityScorer::new().score_all(&mut papers, 2026);
        // 0.92 base minus one 0.05 contradiction penalty.
        assert!((papers[0].reliability.total() - 0.87).abs() < 1e-9);
    }

    #[test]
    fn test_journal_component_tiers() {
        assert_eq!(journal_component(Some("Nature Medicine"), None), 0.20);
        assert_eq!(
            journal_component(Some("Journal of Obscure Results"), Some("Elsevier")),
            0.15
        );
        assert_eq!(
            journal_component(Some("Journal of Obscure Results"), None),
            0.10
        );
        assert_eq!(journal_component(None, Some("Elsevier")), 0.0);
    }

    #[test]
    fn test_citation_component_bands() {
        assert_eq!(citation_component(0), 0.0);
        assert_eq!(citation_component(1), 0.02);
        assert_eq!(citation_component(5), 0.05);
        assert_eq!(citation_component(25), 0.10);
        assert_eq!(citation_component(100), 0.15);
        assert_eq!(citation_component(500), 0.20);
    }

    #[test]
    fn test_verification_component_bands() {
        assert_eq!(verification_component(1), 0.05);
        assert_eq!(verification_component(2), 0.10);
        assert_eq!(verification_component(3), 0.15);
        assert_eq!(verification_component(5), 0.20);
    }

    #[test]
    fn test_all_scores_bounded() {
        let mut papers: Vec<Paper> = (0..20)
            .map(|i| Paper {
                title: format!("p{i}"),
                citation_count: Some(i * 100),
                year: Some(1990 + i as i32),
                sources_found_in: (0..(i % 6)).map(|s| format!("s{s}")).collect(),
                source_type: if i % 2 == 0 {
                    SourceType::PeerReviewed
                } else {
                    SourceType::Preprint
                },
                ..Default::default()
            })
            .collect();
        ReliabilityScorer::new().score_all(&mut papers, 2026);
        for paper in &papers {
            let total = paper.reliability.total();
            assert!((0.0..=1.0).contains(&total));
        }
    }
}
