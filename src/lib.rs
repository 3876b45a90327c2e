//! A.R.G.O.S - Academic Research Gathering & Orchestration System
//!
//! A federated academic-literature discovery engine: one query fans out to
//! dozens of scholarly data providers, the returned records are merged into
//! a deduplicated corpus, scored for relevance and reliability, and analyzed
//! by a fixed multi-step reasoner into themes, conflicts, gaps and
//! chronological insights.
//!
//! # Example
//!
//! ```rust,ignore
//! use argos::{search, SearchOptions};
//!
//! let result = search("CRISPR gene therapy", SearchOptions::default(), None).await?;
//! println!("{} unique papers", result.papers.len());
//! for step in &result.reasoning.steps {
//!     println!("step {}: {:?}", step.step_number, step.step_type);
//! }
//! ```

pub mod research;
pub mod sources;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use research::ResearchOrchestrator;
pub use sources::{SourceAdapter, SourceFamily, SourceRegistry};
pub use types::{
    AppError, Paper, ProgressSink, ProgressUpdate, ReasoningResult, ResearchResult, Result,
    SearchOptions,
};
pub use utils::ResearchConfig;

/// One-shot convenience entry point: configuration from the environment,
/// full registry, one search.
pub async fn search(
    query: &str,
    options: SearchOptions,
    progress: Option<ProgressSink>,
) -> Result<ResearchResult> {
    let orchestrator = ResearchOrchestrator::from_env()?;
    orchestrator.search(query, options, progress).await
}
