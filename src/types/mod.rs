use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

// ============= Paper Model =============

/// How freely a paper can be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    Open,
    Paywalled,
    #[default]
    Unknown,
}

impl AccessType {
    /// Merge precedence: open beats paywalled beats unknown.
    pub fn merged_with(self, other: AccessType) -> AccessType {
        use AccessType::*;
        match (self, other) {
            (Open, _) | (_, Open) => Open,
            (Paywalled, _) | (_, Paywalled) => Paywalled,
            _ => Unknown,
        }
    }
}

/// Publication venue category, used by the reliability scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    PeerReviewed,
    Preprint,
    Conference,
    Thesis,
    BookChapter,
    #[default]
    Unknown,
}

/// Discrete reliability band derived from the continuous score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReliabilityLevel {
    High,
    Medium,
    Low,
}

impl ReliabilityLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            ReliabilityLevel::High
        } else if score >= 0.5 {
            ReliabilityLevel::Medium
        } else {
            ReliabilityLevel::Low
        }
    }

    /// Color code used by front-ends: green / yellow / red.
    pub fn color(&self) -> &'static str {
        match self {
            ReliabilityLevel::High => "green",
            ReliabilityLevel::Medium => "yellow",
            ReliabilityLevel::Low => "red",
        }
    }
}

/// Reliability assessment with per-component breakdown.
///
/// Component ceilings sum to 1.0: peer review 0.30, journal 0.20,
/// citations 0.20, cross-source verification 0.20, recency 0.10.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReliabilityScore {
    pub peer_review: f64,
    pub journal: f64,
    pub citations: f64,
    pub verification: f64,
    pub recency: f64,
    pub is_retracted: bool,
    pub contradictions: Vec<String>,
}

impl ReliabilityScore {
    /// Total score in [0, 1]. A retracted paper always scores 0.
    pub fn total(&self) -> f64 {
        if self.is_retracted {
            return 0.0;
        }
        let base =
            self.peer_review + self.journal + self.citations + self.verification + self.recency;
        let penalty = (self.contradictions.len() as f64 * 0.05).min(0.25);
        (base - penalty).clamp(0.0, 1.0)
    }

    pub fn level(&self) -> ReliabilityLevel {
        ReliabilityLevel::from_score(self.total())
    }
}

/// One academic work as seen by the discovery pipeline.
///
/// A paper may be discovered by several sources; `source` records the first
/// discoverer and `sources_found_in` every source that returned it. DOI,
/// PubMed ID and arXiv ID are identity: once set they are never overwritten.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Paper {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub journal: Option<String>,
    pub publisher: Option<String>,
    pub doi: Option<String>,
    pub pmid: Option<String>,
    pub pmcid: Option<String>,
    pub arxiv_id: Option<String>,
    pub keywords: Vec<String>,
    pub citation_count: Option<u32>,
    pub access_type: AccessType,
    pub pdf_url: Option<String>,
    /// Source that first discovered this paper.
    pub source: String,
    pub source_type: SourceType,
    pub sources_found_in: Vec<String>,
    pub urls: BTreeMap<String, String>,
    pub relevance_score: f64,
    pub reliability: ReliabilityScore,
}

impl Paper {
    /// A paper must carry at least one stable identifier or a title.
    /// Records failing this are discarded at the adapter boundary.
    pub fn has_identity(&self) -> bool {
        self.doi.as_deref().is_some_and(|d| !d.is_empty())
            || self.pmid.as_deref().is_some_and(|p| !p.is_empty())
            || self.arxiv_id.as_deref().is_some_and(|a| !a.is_empty())
            || !self.title.trim().is_empty()
    }

    /// Record that `source_id` returned this paper.
    pub fn add_source(&mut self, source_id: &str) {
        if !self.sources_found_in.iter().any(|s| s == source_id) {
            self.sources_found_in.push(source_id.to_string());
        }
    }

    /// Populate the `urls` map from identifiers. The Sci-Hub entry is only
    /// constructed when the paywall-bypass fallback is explicitly enabled.
    pub fn build_urls(&mut self, enable_scihub: bool) {
        if let Some(doi) = &self.doi {
            self.urls
                .insert("doi".into(), format!("https://doi.org/{doi}"));
            if enable_scihub {
                self.urls
                    .insert("scihub".into(), format!("https://sci-hub.se/{doi}"));
            }
        }
        if let Some(pmid) = &self.pmid {
            self.urls.insert(
                "pubmed".into(),
                format!("https://pubmed.ncbi.nlm.nih.gov/{pmid}/"),
            );
        }
        if let Some(pmcid) = &self.pmcid {
            self.urls.insert(
                "pmc".into(),
                format!("https://www.ncbi.nlm.nih.gov/pmc/articles/{pmcid}/"),
            );
        }
        if let Some(arxiv_id) = &self.arxiv_id {
            self.urls
                .insert("arxiv".into(), format!("https://arxiv.org/abs/{arxiv_id}"));
        }
        if let Some(pdf) = &self.pdf_url {
            self.urls.insert("pdf".into(), pdf.clone());
        }
    }
}

// ============= Query Analysis =============

/// Research field detected from the query text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResearchField {
    MedicineBiology,
    Physics,
    Chemistry,
    ComputerScience,
    Engineering,
    SocialScience,
    #[default]
    General,
}

impl ResearchField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResearchField::MedicineBiology => "medicine_biology",
            ResearchField::Physics => "physics",
            ResearchField::Chemistry => "chemistry",
            ResearchField::ComputerScience => "computer_science",
            ResearchField::Engineering => "engineering",
            ResearchField::SocialScience => "social_science",
            ResearchField::General => "general",
        }
    }
}

/// Intent category detected from the query text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    Review,
    MetaAnalysis,
    Methodology,
    Comparison,
    #[default]
    Exploratory,
}

/// Output of query analysis: keywords, detected field, related concepts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryAnalysis {
    pub original_query: String,
    pub keywords: Vec<String>,
    pub detected_field: ResearchField,
    pub related_concepts: Vec<String>,
    pub query_type: QueryType,
}

/// Read-only context created at the start of a search.
#[derive(Debug, Clone, Default)]
pub struct ResearchContext {
    pub original_query: String,
    pub analysis: QueryAnalysis,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl ResearchContext {
    pub fn new(query: &str, analysis: QueryAnalysis) -> Self {
        Self {
            original_query: query.to_string(),
            analysis,
            metadata: BTreeMap::new(),
        }
    }
}

// ============= Progress Reporting =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Running,
    Complete,
    Error,
}

/// One progress event. Emitted at phase boundaries and once per adapter
/// invocation: `running` first, then exactly one terminal event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub phase: String,
    pub source: String,
    pub status: ProgressStatus,
    pub count: usize,
    pub message: String,
}

/// Consumer for progress events.
pub type ProgressSink = Arc<dyn Fn(ProgressUpdate) + Send + Sync>;

// ============= Search Options =============

/// Caller-facing knobs for a single search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOptions {
    pub max_per_source: usize,
    pub expand_citations: bool,
    pub include_preprints: bool,
    pub min_reliability: f64,
    pub year_start: Option<i32>,
    pub year_end: Option<i32>,
    /// Restrict the search to this subset of source identifiers.
    pub sources: Option<Vec<String>>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_per_source: 100,
            expand_citations: true,
            include_preprints: true,
            min_reliability: 0.0,
            year_start: None,
            year_end: None,
            sources: None,
        }
    }
}

// ============= Reasoning Model =============

/// Kind tag for one reasoning pass. Order here is the execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningStepKind {
    Categorization,
    ThemeIdentification,
    ConflictDetection,
    CrossValidation,
    GapIdentification,
    ChronologicalAnalysis,
    CitationAnalysis,
    Synthesis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryBucket {
    pub field: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub term: String,
    pub count: usize,
    pub frequency: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    pub topic: String,
    pub first: String,
    pub second: String,
    pub kind: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedFinding {
    pub claim: String,
    pub source_count: usize,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchGap {
    pub kind: String,
    pub description: String,
    pub importance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub year: i32,
    pub paper_count: usize,
    pub themes: Vec<String>,
    pub emerging_themes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitationAnalysis {
    pub highly_cited: Vec<String>,
    pub foundational: Vec<String>,
    pub rising_stars: Vec<String>,
    pub mean_citations: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Synthesis {
    pub total_papers: usize,
    pub sources_covered: usize,
    pub time_span: String,
    pub confirmed_findings: Vec<(String, String)>,
    pub uncertain_findings: Vec<(String, String)>,
}

/// Typed payload of a reasoning step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum StepResult {
    Categories(Vec<CategoryBucket>),
    Themes(Vec<Theme>),
    Conflicts(Vec<Conflict>),
    Validations(Vec<ValidatedFinding>),
    Gaps(Vec<ResearchGap>),
    Timeline(Vec<TimelineEntry>),
    Citations(CitationAnalysis),
    Synthesis(Synthesis),
    #[default]
    Empty,
}

/// One pass of the multi-turn reasoner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningStep {
    pub step_number: usize,
    pub step_type: ReasoningStepKind,
    pub description: String,
    pub result: StepResult,
    pub confidence: f64,
    pub rationale: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyInsight {
    pub kind: ReasoningStepKind,
    pub content: String,
    pub confidence: f64,
}

/// Full output of the reasoner: eight ordered steps plus aggregates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReasoningResult {
    pub steps: Vec<ReasoningStep>,
    pub total_steps: usize,
    pub confidence_score: f64,
    pub key_insights: Vec<KeyInsight>,
    pub recommended_papers: Vec<Paper>,
}

// ============= Research Result =============

/// Counters accumulated across the phases of one search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchStatistics {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_raw_papers: usize,
    pub total_unique_papers: usize,
    pub duplicates_removed: usize,
    pub sources_queried: usize,
    /// Per-phase raw record counts, in phase order.
    pub phase_results: Vec<(String, usize)>,
    /// Set when the global deadline cut the search short.
    pub partial: bool,
}

impl ResearchStatistics {
    pub fn duration_seconds(&self) -> f64 {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => (end - start).num_milliseconds() as f64 / 1000.0,
            _ => 0.0,
        }
    }
}

/// Complete result of one research query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchResult {
    pub query: String,
    pub papers: Vec<Paper>,
    pub reasoning: ReasoningResult,
    pub stats: ResearchStatistics,
}

impl ResearchResult {
    /// Logical response envelope consumed by presentation layers.
    pub fn summary(&self) -> ResearchSummary {
        let high = self
            .papers
            .iter()
            .filter(|p| p.reliability.total() >= 0.8)
            .count();
        let medium = self
            .papers
            .iter()
            .filter(|p| {
                let s = p.reliability.total();
                (0.5..0.8).contains(&s)
            })
            .count();
        let low = self.papers.len() - high - medium;

        let open = self
            .papers
            .iter()
            .filter(|p| p.access_type == AccessType::Open)
            .count();
        let paywalled = self
            .papers
            .iter()
            .filter(|p| p.access_type == AccessType::Paywalled)
            .count();

        let years: Vec<i32> = self.papers.iter().filter_map(|p| p.year).collect();

        ResearchSummary {
            query: self.query.clone(),
            total_found: self.papers.len(),
            sources_searched: self
                .papers
                .iter()
                .flat_map(|p| p.sources_found_in.iter().cloned())
                .collect::<std::collections::BTreeSet<_>>()
                .into_iter()
                .collect(),
            duplicates_removed: self.stats.duplicates_removed,
            search_time_seconds: self.stats.duration_seconds(),
            reliability: ReliabilityBreakdown { high, medium, low },
            access: AccessBreakdown { open, paywalled },
            timeline: TimelineBounds {
                earliest: years.iter().min().copied(),
                latest: years.iter().max().copied(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityBreakdown {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessBreakdown {
    pub open: usize,
    pub paywalled: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineBounds {
    pub earliest: Option<i32>,
    pub latest: Option<i32>,
}

/// Serialized envelope of a [`ResearchResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchSummary {
    pub query: String,
    pub total_found: usize,
    pub sources_searched: Vec<String>,
    pub duplicates_removed: usize,
    pub search_time_seconds: f64,
    pub reliability: ReliabilityBreakdown,
    pub access: AccessBreakdown,
    pub timeline: TimelineBounds,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Transport(format!("request timed out: {err}"))
        } else {
            AppError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Parse(format!("JSON: {err}"))
    }
}

impl From<quick_xml::DeError> for AppError {
    fn from(err: quick_xml::DeError) -> Self {
        AppError::Parse(format!("XML: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_type_merge_precedence() {
        assert_eq!(
            AccessType::Unknown.merged_with(AccessType::Open),
            AccessType::Open
        );
        assert_eq!(
            AccessType::Paywalled.merged_with(AccessType::Unknown),
            AccessType::Paywalled
        );
        assert_eq!(
            AccessType::Unknown.merged_with(AccessType::Unknown),
            AccessType::Unknown
        );
    }

    #[test]
    fn test_reliability_total_retracted_is_zero() {
        let score = ReliabilityScore {
            peer_review: 0.3,
            journal: 0.2,
            citations: 0.2,
            verification: 0.2,
            recency: 0.1,
            is_retracted: true,
            contradictions: vec![],
        };
        assert_eq!(score.total(), 0.0);
        assert_eq!(score.level(), ReliabilityLevel::Low);
    }

    #[test]
    fn test_reliability_contradiction_penalty_capped() {
        let score = ReliabilityScore {
            peer_review: 0.3,
            journal: 0.2,
            citations: 0.2,
            verification: 0.2,
            recency: 0.1,
            is_retracted: false,
            contradictions: (0..10).map(|i| format!("claim {i}")).collect(),
        };
        // Ten contradictions would subtract 0.50 uncapped; the cap holds it at 0.25.
        assert!((score.total() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_reliability_levels() {
        assert_eq!(ReliabilityLevel::from_score(0.85), ReliabilityLevel::High);
        assert_eq!(ReliabilityLevel::from_score(0.8), ReliabilityLevel::High);
        assert_eq!(ReliabilityLevel::from_score(0.6), ReliabilityLevel::Medium);
        assert_eq!(ReliabilityLevel::from_score(0.2), ReliabilityLevel::Low);
        assert_eq!(ReliabilityLevel::from_score(0.85).color(), "green");
    }

    #[test]
    fn test_paper_identity() {
        let mut paper = Paper::default();
        assert!(!paper.has_identity());

        paper.title = "  ".into();
        assert!(!paper.has_identity());

        paper.doi = Some("10.1000/xyz".into());
        assert!(paper.has_identity());

        let titled = Paper {
            title: "A study".into(),
            ..Default::default()
        };
        assert!(titled.has_identity());
    }

    #[test]
    fn test_paper_url_construction() {
        let mut paper = Paper {
            doi: Some("10.1038/nature12373".into()),
            pmid: Some("23883931".into()),
            arxiv_id: Some("2301.00001".into()),
            ..Default::default()
        };
        paper.build_urls(false);

        assert_eq!(
            paper.urls.get("doi").map(String::as_str),
            Some("https://doi.org/10.1038/nature12373")
        );
        assert!(paper.urls.contains_key("pubmed"));
        assert!(paper.urls.contains_key("arxiv"));
        assert!(!paper.urls.contains_key("scihub"));

        paper.build_urls(true);
        assert!(paper.urls.contains_key("scihub"));
    }

    #[test]
    fn test_add_source_is_idempotent() {
        let mut paper = Paper::default();
        paper.add_source("pubmed");
        paper.add_source("pubmed");
        paper.add_source("crossref");
        assert_eq!(paper.sources_found_in, vec!["pubmed", "crossref"]);
    }

    #[test]
    fn test_summary_breakdowns() {
        let make = |score: f64, access: AccessType, year: i32| Paper {
            title: "t".into(),
            year: Some(year),
            access_type: access,
            reliability: ReliabilityScore {
                peer_review: score,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut high = make(0.3, AccessType::Open, 2020);
        high.reliability.journal = 0.2;
        high.reliability.citations = 0.2;
        high.reliability.verification = 0.2;

        let result = ResearchResult {
            query: "q".into(),
            papers: vec![high, make(0.1, AccessType::Paywalled, 2015)],
            ..Default::default()
        };
        let summary = result.summary();
        assert_eq!(summary.reliability.high, 1);
        assert_eq!(summary.reliability.low, 1);
        assert_eq!(summary.access.open, 1);
        assert_eq!(summary.access.paywalled, 1);
        assert_eq!(summary.timeline.earliest, Some(2015));
        assert_eq!(summary.timeline.latest, Some(2020));
    }
}
