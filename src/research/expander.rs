//! Query analysis and expansion.
//!
//! Everything here is a pure function of the query text (plus the current
//! year, passed in so callers and tests stay deterministic). Field detection
//! is a keyword-match rule over fixed vocabularies, tried in declaration
//! order with first match winning.

use crate::types::{QueryAnalysis, QueryType, ResearchField};
use crate::utils::text::is_stop_word;

const MAX_VARIATIONS: usize = 15;

/// Per-field detection vocabularies, in detection order.
const FIELD_VOCABULARIES: &[(ResearchField, &[&str])] = &[
    (
        ResearchField::MedicineBiology,
        &[
            "gene", "protein", "cell", "disease", "treatment", "therapy", "patient", "clinical",
            "drug", "cancer", "crispr", "dna", "rna", "mutation", "genome", "medical",
        ],
    ),
    (
        ResearchField::Physics,
        &[
            "quantum", "particle", "physics", "energy", "wave", "electron", "photon",
            "relativity", "cosmology", "gravity",
        ],
    ),
    (
        ResearchField::Chemistry,
        &[
            "chemical", "molecule", "reaction", "synthesis", "catalyst", "compound", "organic",
            "inorganic", "polymer",
        ],
    ),
    (
        ResearchField::ComputerScience,
        &[
            "algorithm",
            "machine learning",
            "neural",
            "network",
            "software",
            "computing",
            "data",
            "artificial intelligence",
            "deep learning",
            "programming",
            "computer",
        ],
    ),
    (
        ResearchField::Engineering,
        &[
            "engineering",
            "material",
            "design",
            "mechanical",
            "electrical",
            "structural",
            "robot",
            "sensor",
        ],
    ),
    (
        ResearchField::SocialScience,
        &[
            "social",
            "economic",
            "psychology",
            "behavior",
            "society",
            "policy",
            "education",
            "political",
            "culture",
        ],
    ),
];

/// Canned concept expansions per field, capped at eight.
fn related_concepts_for(field: ResearchField) -> &'static [&'static str] {
    match field {
        ResearchField::MedicineBiology => &[
            "therapeutic",
            "mechanism",
            "pathway",
            "biomarker",
            "efficacy",
            "safety",
            "outcome",
            "intervention",
        ],
        ResearchField::ComputerScience => &[
            "model",
            "framework",
            "approach",
            "method",
            "performance",
            "benchmark",
            "optimization",
            "architecture",
        ],
        ResearchField::Physics => &[
            "theory",
            "experiment",
            "measurement",
            "simulation",
            "dynamics",
            "properties",
            "effect",
            "phenomenon",
        ],
        ResearchField::Chemistry => &[
            "mechanism",
            "kinetics",
            "selectivity",
            "yield",
            "characterization",
            "spectroscopy",
            "structure",
            "properties",
        ],
        _ => &[],
    }
}

/// Field-specific query augmentations used in variation generation.
fn field_variations_for(field: ResearchField) -> &'static [&'static str] {
    match field {
        ResearchField::MedicineBiology => &["clinical trial", "mechanism", "therapeutic"],
        ResearchField::ComputerScience => &["benchmark", "implementation", "evaluation"],
        ResearchField::Physics => &["experimental", "theoretical"],
        _ => &[],
    }
}

/// Stateless query expander.
#[derive(Debug, Default)]
pub struct QueryExpander;

impl QueryExpander {
    pub fn new() -> Self {
        Self
    }

    /// Analyze a raw query: extract keywords, detect the field and intent,
    /// attach related concepts.
    pub fn analyze(&self, query: &str) -> QueryAnalysis {
        let keywords = extract_keywords(query);
        let detected_field = detect_field(query);
        let related_concepts = related_concepts_for(detected_field)
            .iter()
            .map(|c| c.to_string())
            .collect();

        QueryAnalysis {
            original_query: query.to_string(),
            keywords,
            detected_field,
            related_concepts,
            query_type: detect_query_type(query),
        }
    }

    /// Up to fifteen distinct query variations, original first.
    pub fn generate_variations(
        &self,
        query: &str,
        analysis: &QueryAnalysis,
        current_year: i32,
    ) -> Vec<String> {
        let mut variations = vec![
            query.to_string(),
            format!("{query} review"),
            format!("{query} systematic review"),
            format!("{query} meta-analysis"),
            format!("{query} {current_year}"),
            format!("{query} {}", current_year - 1),
        ];

        for concept in &analysis.related_concepts {
            let concept = concept.trim();
            if concept.len() > 3 {
                variations.push(format!("{query} {concept}"));
            }
        }

        for augmentation in field_variations_for(analysis.detected_field) {
            variations.push(format!("{query} {augmentation}"));
        }

        let mut seen = std::collections::HashSet::new();
        variations.retain(|v| seen.insert(v.clone()));
        variations.truncate(MAX_VARIATIONS);
        variations
    }
}

fn extract_keywords(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
                .collect::<String>()
        })
        .filter(|word| word.len() > 2 && !is_stop_word(word))
        .collect()
}

fn detect_field(query: &str) -> ResearchField {
    let lower = query.to_lowercase();
    for (field, vocabulary) in FIELD_VOCABULARIES {
        if vocabulary.iter().any(|term| lower.contains(term)) {
            return *field;
        }
    }
    ResearchField::General
}

fn detect_query_type(query: &str) -> QueryType {
    let lower = query.to_lowercase();
    let contains_any =
        |terms: &[&str]| terms.iter().any(|t| lower.contains(t));

    if contains_any(&["review", "overview", "survey", "state of the art"]) {
        QueryType::Review
    } else if contains_any(&["meta-analysis", "systematic"]) {
        QueryType::MetaAnalysis
    } else if contains_any(&["how", "method", "technique", "approach"]) {
        QueryType::Methodology
    } else if contains_any(&["compare", "versus", " vs ", "comparison"]) {
        QueryType::Comparison
    } else {
        QueryType::Exploratory
    }
}
