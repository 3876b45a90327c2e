//! Multi-turn reasoning over the ranked record set.
//!
//! Exactly eight deterministic passes, in a fixed order that is part of the
//! contract: categorization, themes, conflicts, cross-validation, gaps,
//! chronology, citation patterns, synthesis. The reasoner performs no I/O.
//! A pass that panics is isolated: the step is recorded with confidence 0
//! and an error rationale, and the remaining passes continue.

use crate::types::{
    CategoryBucket, CitationAnalysis, Conflict, KeyInsight, Paper, ReasoningResult, ReasoningStep,
    ReasoningStepKind, ResearchContext, ResearchGap, StepResult, Synthesis, Theme, TimelineEntry,
    ValidatedFinding,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Stop list used when mining themes from titles and abstracts; includes
/// boilerplate words common to virtually all academic prose.
const THEME_STOP_WORDS: &[&str] = &[
    "about", "after", "again", "being", "between", "could", "during", "having", "their", "there",
    "these", "those", "through", "under", "where", "which", "while", "would", "paper", "study",
    "research", "results", "method", "methods", "using", "based", "analysis",
];

pub struct MultiTurnReasoner {
    current_year: i32,
}

impl MultiTurnReasoner {
    pub fn new(current_year: i32) -> Self {
        Self { current_year }
    }

    /// Run all eight passes and aggregate the result.
    pub fn analyze(&self, papers: &[Paper], context: &ResearchContext) -> ReasoningResult {
        let mut steps: Vec<ReasoningStep> = Vec::with_capacity(8);

        let passes: Vec<(ReasoningStepKind, &str)> = vec![
            (ReasoningStepKind::Categorization, "Categorizing papers by topic and subtopic"),
            (ReasoningStepKind::ThemeIdentification, "Identifying recurring themes and concepts"),
            (ReasoningStepKind::ConflictDetection, "Detecting conflicting information across sources"),
            (ReasoningStepKind::CrossValidation, "Cross-validating key findings across sources"),
            (ReasoningStepKind::GapIdentification, "Identifying potential research gaps"),
            (ReasoningStepKind::ChronologicalAnalysis, "Analyzing research evolution over time"),
            (ReasoningStepKind::CitationAnalysis, "Analyzing citation patterns and influential papers"),
            (ReasoningStepKind::Synthesis, "Synthesizing all findings into coherent insights"),
        ];

        for (number, (kind, description)) in passes.into_iter().enumerate() {
            let step_number = number + 1;
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                self.run_pass(kind, step_number, description, papers, context, &steps)
            }));
            let step = outcome.unwrap_or_else(|payload| {
                let message = panic_message(payload.as_ref());
                tracing::warn!(step = step_number, message, "reasoning pass failed");
                ReasoningStep {
                    step_number,
                    step_type: kind,
                    description: description.to_string(),
                    result: StepResult::Empty,
                    confidence: 0.0,
                    rationale: format!("step failed: {message}"),
                }
            });
            steps.push(step);
        }

        let confidence_score =
            steps.iter().map(|s| s.confidence).sum::<f64>() / steps.len() as f64;
        let key_insights = steps
            .iter()
            .filter(|s| s.confidence >= 0.75)
            .map(|s| KeyInsight {
                kind: s.step_type,
                content: s.rationale.clone(),
                confidence: s.confidence,
            })
            .collect();

        ReasoningResult {
            total_steps: steps.len(),
            confidence_score,
            key_insights,
            recommended_papers: recommend(papers),
            steps,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn run_pass(
        &self,
        kind: ReasoningStepKind,
        step_number: usize,
        description: &str,
        papers: &[Paper],
        context: &ResearchContext,
        prior: &[ReasoningStep],
    ) -> ReasoningStep {
        let (result, confidence, rationale) = match kind {
            ReasoningStepKind::Categorization => categorize(papers),
            ReasoningStepKind::ThemeIdentification => identify_themes(papers),
            ReasoningStepKind::ConflictDetection => detect_conflicts(papers),
            ReasoningStepKind::CrossValidation => cross_validate(papers),
            ReasoningStepKind::GapIdentification => {
                identify_gaps(papers, context, self.current_year)
            }
            ReasoningStepKind::ChronologicalAnalysis => analyze_chronology(papers),
            ReasoningStepKind::CitationAnalysis => analyze_citations(papers, self.current_year),
            ReasoningStepKind::Synthesis => synthesize(papers, prior),
        };
        ReasoningStep {
            step_number,
            step_type: kind,
            description: description.to_string(),
            result,
            confidence,
            rationale,
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

fn recommend(papers: &[Paper]) -> Vec<Paper> {
    let mut cited: Vec<&Paper> = papers
        .iter()
        .filter(|p| p.citation_count.unwrap_or(0) > 0)
        .collect();
    cited.sort_by(|a, b| b.citation_count.cmp(&a.citation_count));
    cited.into_iter().take(10).cloned().collect()
}

// ============= Pass 1: Categorization =============

fn classify(paper: &Paper) -> &'static str {
    let combined = format!(
        "{} {}",
        paper.title,
        paper.abstract_text.as_deref().unwrap_or_default()
    )
    .to_lowercase();

    let contains_any = |terms: &[&str]| terms.iter().any(|t| combined.contains(t));
    if contains_any(&["medicine", "clinical", "patient", "therapy", "disease"]) {
        "medicine"
    } else if contains_any(&["biology", "gene", "cell", "protein"]) {
        "biology"
    } else if contains_any(&["physics", "quantum", "particle"]) {
        "physics"
    } else if contains_any(&["chemistry", "molecule", "synthesis"]) {
        "chemistry"
    } else if contains_any(&["computer", "algorithm", "machine learning", "neural"]) {
        "computer_science"
    } else if contains_any(&["engineering", "material", "mechanical"]) {
        "engineering"
    } else {
        "general"
    }
}

fn categorize(papers: &[Paper]) -> (StepResult, f64, String) {
    let mut buckets: BTreeMap<&'static str, usize> = BTreeMap::new();
    for paper in papers {
        *buckets.entry(classify(paper)).or_default() += 1;
    }

    let mut categories: Vec<CategoryBucket> = buckets
        .into_iter()
        .map(|(field, count)| CategoryBucket {
            field: field.to_string(),
            count,
        })
        .collect();
    categories.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.field.cmp(&b.field)));

    let rationale = format!(
        "Categorized {} papers into {} distinct topics based on title, abstract, and keywords",
        papers.len(),
        categories.len()
    );
    (StepResult::Categories(categories), 0.85, rationale)
}

// ============= Pass 2: Theme identification =============

fn key_terms(paper: &Paper) -> HashSet<String> {
    let text = format!(
        "{} {}",
        paper.title,
        paper.abstract_text.as_deref().unwrap_or_default()
    );
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| w.len() > 4 && !THEME_STOP_WORDS.contains(w))
        .map(String::from)
        .collect()
}

fn identify_themes(papers: &[Paper]) -> (StepResult, f64, String) {
    let mut frequency: HashMap<String, usize> = HashMap::new();
    for paper in papers {
        for term in key_terms(paper) {
            *frequency.entry(term).or_default() += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = frequency.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let total = papers.len().max(1);
    let themes: Vec<Theme> = ranked
        .into_iter()
        .take(20)
        .map(|(term, count)| Theme {
            term,
            count,
            frequency: count as f64 / total as f64,
        })
        .collect();

    let rationale = format!(
        "Identified {} key themes from term frequency analysis across {} papers",
        themes.len(),
        papers.len()
    );
    (StepResult::Themes(themes), 0.80, rationale)
}

// ============= Pass 3: Conflict detection =============

fn main_topic(paper: &Paper) -> String {
    paper
        .title
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .find(|w| w.len() > 5 && !THEME_STOP_WORDS.contains(w))
        .map(String::from)
        .unwrap_or_else(|| "general".to_string())
}

/// Within-group heuristics. Both return empty for now: temporal and
/// methodology conflict detection need full-text access to do honestly.
fn temporal_conflicts(_group: &[&Paper]) -> Vec<Conflict> {
    Vec::new()
}

fn methodology_conflicts(_group: &[&Paper]) -> Vec<Conflict> {
    Vec::new()
}

fn detect_conflicts(papers: &[Paper]) -> (StepResult, f64, String) {
    let mut groups: BTreeMap<String, Vec<&Paper>> = BTreeMap::new();
    for paper in papers {
        groups.entry(main_topic(paper)).or_default().push(paper);
    }

    let mut conflicts = Vec::new();
    for group in groups.values().filter(|g| g.len() >= 2) {
        conflicts.extend(temporal_conflicts(group));
        conflicts.extend(methodology_conflicts(group));
    }

    let confidence = if conflicts.is_empty() { 0.95 } else { 0.70 };
    let rationale = format!(
        "Analyzed {} topic groups, found {} potential conflicts requiring further investigation",
        groups.len(),
        conflicts.len()
    );
    (StepResult::Conflicts(conflicts), confidence, rationale)
}

// ============= Pass 4: Cross-validation =============

fn cross_validate(papers: &[Paper]) -> (StepResult, f64, String) {
    let mut claim_sources: BTreeMap<String, HashSet<String>> = BTreeMap::new();
    for paper in papers {
        claim_sources
            .entry(main_topic(paper))
            .or_default()
            .insert(paper.source.clone());
    }

    let total_sources: HashSet<&String> = papers.iter().map(|p| &p.source).collect();

    let mut findings: Vec<ValidatedFinding> = claim_sources
        .into_iter()
        .filter(|(_, sources)| sources.len() >= 2)
        .map(|(claim, sources)| {
            let mut sources: Vec<String> = sources.into_iter().collect();
            sources.sort();
            ValidatedFinding {
                claim,
                source_count: sources.len(),
                sources,
            }
        })
        .collect();
    findings.sort_by(|a, b| {
        b.source_count
            .cmp(&a.source_count)
            .then_with(|| a.claim.cmp(&b.claim))
    });

    let confidence = if findings.is_empty() || total_sources.is_empty() {
        0.5
    } else {
        let avg_sources = findings.iter().map(|f| f.source_count).sum::<usize>() as f64
            / findings.len() as f64;
        (0.5 + 0.5 * avg_sources / total_sources.len() as f64).min(0.95)
    };

    let rationale = format!(
        "Cross-validated findings across {} sources, {} findings confirmed by multiple sources",
        total_sources.len(),
        findings.len()
    );
    (StepResult::Validations(findings), confidence, rationale)
}

// ============= Pass 5: Gap identification =============

fn identify_gaps(
    papers: &[Paper],
    context: &ResearchContext,
    current_year: i32,
) -> (StepResult, f64, String) {
    let mut by_year: HashMap<i32, usize> = HashMap::new();
    for paper in papers {
        if let Some(year) = paper.year.filter(|y| *y > 0) {
            *by_year.entry(year).or_default() += 1;
        }
    }

    let mut gaps = Vec::new();
    for year in (current_year - 10)..=current_year {
        let count = by_year.get(&year).copied().unwrap_or(0);
        if count < papers.len() / 20 {
            gaps.push(ResearchGap {
                kind: "temporal".into(),
                description: format!("Limited research from year {year}"),
                importance: 0.6,
            });
        }
    }

    for concept in &context.analysis.related_concepts {
        let needle = concept.to_lowercase();
        let coverage = papers
            .iter()
            .filter(|p| {
                format!(
                    "{} {}",
                    p.title,
                    p.abstract_text.as_deref().unwrap_or_default()
                )
                .to_lowercase()
                .contains(&needle)
            })
            .count();
        if coverage < papers.len() / 10 {
            gaps.push(ResearchGap {
                kind: "topical".into(),
                description: format!("Limited coverage of subtopic: {concept}"),
                importance: 0.7,
            });
        }
    }

    let rationale = format!(
        "Identified {} potential research gaps based on temporal and topical analysis",
        gaps.len()
    );
    (StepResult::Gaps(gaps), 0.75, rationale)
}

// ============= Pass 6: Chronological analysis =============

fn top_themes(papers: &[&Paper], limit: usize) -> Vec<String> {
    let mut frequency: HashMap<String, usize> = HashMap::new();
    for paper in papers {
        for term in key_terms(paper) {
            *frequency.entry(term).or_default() += 1;
        }
    }
    let mut ranked: Vec<(String, usize)> = frequency.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(limit).map(|(term, _)| term).collect()
}

fn analyze_chronology(papers: &[Paper]) -> (StepResult, f64, String) {
    let mut by_year: BTreeMap<i32, Vec<&Paper>> = BTreeMap::new();
    for paper in papers {
        if let Some(year) = paper.year.filter(|y| *y > 0) {
            by_year.entry(year).or_default().push(paper);
        }
    }

    let mut timeline = Vec::new();
    let mut previous_themes: Vec<String> = Vec::new();
    for (year, year_papers) in &by_year {
        let themes = top_themes(year_papers, 5);
        let emerging = themes
            .iter()
            .filter(|t| !previous_themes.contains(t))
            .cloned()
            .collect();
        timeline.push(TimelineEntry {
            year: *year,
            paper_count: year_papers.len(),
            themes: themes.clone(),
            emerging_themes: emerging,
        });
        previous_themes = themes;
    }

    let rationale = format!(
        "Analyzed research evolution across {} years, tracking theme emergence and development",
        by_year.len()
    );
    (StepResult::Timeline(timeline), 0.85, rationale)
}

// ============= Pass 7: Citation analysis =============

fn analyze_citations(papers: &[Paper], current_year: i32) -> (StepResult, f64, String) {
    let cited: Vec<&Paper> = papers
        .iter()
        .filter(|p| p.citation_count.unwrap_or(0) > 0)
        .collect();

    let mean = if cited.is_empty() {
        0.0
    } else {
        cited
            .iter()
            .map(|p| f64::from(p.citation_count.unwrap_or(0)))
            .sum::<f64>()
            / cited.len() as f64
    };

    let mut top = cited.clone();
    top.sort_by(|a, b| {
        b.citation_count
            .cmp(&a.citation_count)
            .then_with(|| a.title.cmp(&b.title))
    });

    let highly_cited: Vec<String> = top.iter().take(20).map(|p| p.title.clone()).collect();

    let foundational: Vec<String> = cited
        .iter()
        .filter(|p| {
            f64::from(p.citation_count.unwrap_or(0)) > mean * 2.0
                && p.year.is_some_and(|y| y < current_year - 5)
        })
        .map(|p| p.title.clone())
        .collect();

    let rising_stars: Vec<String> = cited
        .iter()
        .filter(|p| {
            p.year.is_some_and(|y| y >= current_year - 2)
                && f64::from(p.citation_count.unwrap_or(0)) > mean
        })
        .map(|p| p.title.clone())
        .collect();

    let rationale = format!(
        "Analyzed {} papers with citations, identified {} foundational and {} rising star papers",
        cited.len(),
        foundational.len(),
        rising_stars.len()
    );
    (
        StepResult::Citations(CitationAnalysis {
            highly_cited,
            foundational,
            rising_stars,
            mean_citations: mean,
        }),
        0.90,
        rationale,
    )
}

// ============= Pass 8: Synthesis =============

fn synthesize(papers: &[Paper], prior: &[ReasoningStep]) -> (StepResult, f64, String) {
    let mut synthesis = Synthesis {
        total_papers: papers.len(),
        sources_covered: papers
            .iter()
            .map(|p| p.source.as_str())
            .collect::<HashSet<_>>()
            .len(),
        time_span: time_span(papers),
        ..Default::default()
    };

    let mut confident_steps = 0usize;
    for step in prior {
        let entry = (format!("{:?}", step.step_type), step.rationale.clone());
        if step.confidence >= 0.70 {
            confident_steps += 1;
            synthesis.confirmed_findings.push(entry);
        } else {
            synthesis.uncertain_findings.push(entry);
        }
    }

    // The synthesis pass counts itself among the total eight.
    let total_steps = prior.len() + 1;
    let confidence = 0.5 + 0.5 * confident_steps as f64 / total_steps as f64;

    (
        StepResult::Synthesis(synthesis),
        confidence,
        "Synthesized findings from all analysis steps into actionable insights".to_string(),
    )
}

fn time_span(papers: &[Paper]) -> String {
    let years: Vec<i32> = papers
        .iter()
        .filter_map(|p| p.year.filter(|y| *y > 1900))
        .collect();
    match (years.iter().min(), years.iter().max()) {
        (Some(min), Some(max)) => format!("{min} - {max}"),
        _ => "Unknown".to_string(),
    }
}
