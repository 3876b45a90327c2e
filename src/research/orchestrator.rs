//! Top-level research orchestrator.
//!
//! Drives thirteen phases in strict sequence: query analysis, six
//! collection fan-outs, citation expansion, a variation deep-dive, then
//! deduplication, ranking, full-text enrichment and multi-turn reasoning.
//! Within a phase every adapter runs concurrently on a bounded worker pool;
//! an adapter failure or timeout contributes an empty list and an error
//! progress event, never a failed search. The call is total: barring an
//! empty query it always returns a `ResearchResult`.

use crate::research::citations::{CitationDirection, CitationNetworkBuilder};
use crate::research::dedup::Deduplicator;
use crate::research::expander::QueryExpander;
use crate::research::fulltext::FullTextResolver;
use crate::research::ranker::RelevanceRanker;
use crate::research::reasoner::MultiTurnReasoner;
use crate::research::reliability::ReliabilityScorer;
use crate::sources::unpaywall::UnpaywallClient;
use crate::sources::{build_http_client, SourceAdapter, SourceFamily, SourceRegistry};
use crate::types::{
    AppError, Paper, ProgressSink, ProgressStatus, ProgressUpdate, ResearchContext,
    ResearchResult, ResearchStatistics, Result, SearchOptions, SourceType,
};
use crate::utils::ResearchConfig;
use chrono::{Datelike, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

pub struct ResearchOrchestrator {
    config: Arc<ResearchConfig>,
    registry: Arc<SourceRegistry>,
    expander: QueryExpander,
    deduplicator: Deduplicator,
    ranker: RelevanceRanker,
    reliability: ReliabilityScorer,
    resolver: FullTextResolver,
}

/// Per-search shared state handed to the fan-out workers.
struct RunState {
    deadline: Instant,
    adapter_timeout: std::time::Duration,
    max_per_source: usize,
    semaphore: Arc<Semaphore>,
    progress: Option<ProgressSink>,
    sources_queried: Arc<AtomicUsize>,
}

impl ResearchOrchestrator {
    /// Orchestrator over the full registry the configuration allows.
    pub fn new(config: ResearchConfig) -> Result<Self> {
        let registry = SourceRegistry::from_config(&config)?;
        Self::with_registry(config, registry)
    }

    /// Orchestrator from process environment configuration.
    pub fn from_env() -> Result<Self> {
        Self::new(ResearchConfig::from_env())
    }

    /// Orchestrator over an explicit registry. Used by tests and embedders.
    pub fn with_registry(config: ResearchConfig, registry: SourceRegistry) -> Result<Self> {
        let client = build_http_client(&config.email, config.adapter_timeout)?;
        let unpaywall = UnpaywallClient::new(
            client,
            config.rate_limit_for("unpaywall"),
            config.email.clone(),
        );
        let resolver = FullTextResolver::new(unpaywall, config.enable_scihub);
        Ok(Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            expander: QueryExpander::new(),
            deduplicator: Deduplicator::new(),
            ranker: RelevanceRanker::new(),
            reliability: ReliabilityScorer::new(),
            resolver,
        })
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Execute a full federated search.
    ///
    /// Returns `Err` only for a blank query; every provider-side condition
    /// is absorbed into the (possibly partial) result.
    pub async fn search(
        &self,
        query: &str,
        options: SearchOptions,
        progress: Option<ProgressSink>,
    ) -> Result<ResearchResult> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidInput("empty query".into()));
        }

        let start_time = Utc::now();
        let current_year = start_time.year();
        let state = RunState {
            deadline: Instant::now() + self.config.search_timeout,
            adapter_timeout: self.config.adapter_timeout,
            max_per_source: options.max_per_source.min(self.config.max_papers_per_source),
            semaphore: Arc::new(Semaphore::new(self.config.parallel_workers.max(1))),
            progress,
            sources_queried: Arc::new(AtomicUsize::new(0)),
        };
        let mut phase_results: Vec<(String, usize)> = Vec::new();
        let collected: Mutex<Vec<Paper>> = Mutex::new(Vec::new());
        let mut partial = false;

        // Phase 1: query analysis and expansion.
        self.notify(&state, "analyze", "", ProgressStatus::Running, 0, "");
        let analysis = self.expander.analyze(query);
        let variations = self
            .expander
            .generate_variations(query, &analysis, current_year);
        let context = ResearchContext::new(query, analysis);
        self.notify(
            &state,
            "analyze",
            "",
            ProgressStatus::Complete,
            variations.len(),
            &format!("Generated {} query variations", variations.len()),
        );

        // Phases 2-9: collection. Skipped wholesale once the deadline fires.
        let phases = self.collection_phases(query, &variations, &options);
        for phase in phases {
            if Instant::now() >= state.deadline {
                partial = true;
                tracing::warn!(phase = phase.name, "global deadline reached, skipping");
                break;
            }
            let added = match phase.work {
                PhaseWork::FanOut(jobs) => {
                    self.run_fan_out(&state, phase.name, jobs, &collected).await
                }
                PhaseWork::CitationExpansion => {
                    self.run_citation_expansion(&state, &collected).await
                }
            };
            phase_results.push((phase.name.to_string(), added));
        }

        // Phase 10: deduplication.
        self.notify(&state, "dedup", "", ProgressStatus::Running, 0, "");
        let raw_papers = std::mem::take(&mut *collected.lock());
        let raw_count = raw_papers.len();
        let mut unique = self.deduplicator.deduplicate(raw_papers);
        let duplicates_removed = raw_count - unique.len();
        self.notify(
            &state,
            "dedup",
            "",
            ProgressStatus::Complete,
            unique.len(),
            &format!("Removed {duplicates_removed} duplicates"),
        );

        // Phase 11: reliability scoring and relevance ranking.
        self.notify(&state, "rank", "", ProgressStatus::Running, 0, "");
        self.reliability.score_all(&mut unique, current_year);
        let mut ranked = self
            .ranker
            .rank(unique, query, &context.analysis, current_year);
        apply_filters(&mut ranked, &options);
        self.notify(
            &state,
            "rank",
            "",
            ProgressStatus::Complete,
            ranked.len(),
            "",
        );

        // Phase 12: open-access enrichment.
        self.notify(&state, "fulltext", "", ProgressStatus::Running, 0, "");
        let resolved = self.enrich_fulltext(&state, &mut ranked).await;
        self.notify(
            &state,
            "fulltext",
            "",
            ProgressStatus::Complete,
            resolved,
            &format!("Resolved {resolved} open access links"),
        );

        // Phase 13: multi-turn reasoning.
        self.notify(&state, "reasoning", "", ProgressStatus::Running, 0, "");
        let reasoner = MultiTurnReasoner::new(current_year);
        let reasoning = reasoner.analyze(&ranked, &context);
        self.notify(
            &state,
            "reasoning",
            "",
            ProgressStatus::Complete,
            reasoning.total_steps,
            "",
        );

        let stats = ResearchStatistics {
            start_time: Some(start_time),
            end_time: Some(Utc::now()),
            total_raw_papers: raw_count,
            total_unique_papers: ranked.len(),
            duplicates_removed,
            sources_queried: state.sources_queried.load(Ordering::Relaxed),
            phase_results,
            partial,
        };

        self.notify(
            &state,
            "complete",
            "",
            ProgressStatus::Complete,
            ranked.len(),
            &format!(
                "Found {} unique papers from {} sources",
                ranked.len(),
                stats.sources_queried
            ),
        );

        Ok(ResearchResult {
            query: query.to_string(),
            papers: ranked,
            reasoning,
            stats,
        })
    }

    /// Build the collection phase plan (phases 2 through 9).
    fn collection_phases(
        &self,
        query: &str,
        variations: &[String],
        options: &SearchOptions,
    ) -> Vec<Phase> {
        let allowed = |adapter: &Arc<dyn SourceAdapter>| -> bool {
            options
                .sources
                .as_ref()
                .map(|list| list.iter().any(|s| s == adapter.id()))
                .unwrap_or(true)
        };
        let jobs_for = |family: SourceFamily| -> Vec<FanOutJob> {
            self.registry
                .by_family(family)
                .into_iter()
                .filter(allowed)
                .map(|adapter| (adapter, query.to_string()))
                .collect()
        };

        let mut phases = vec![
            Phase {
                name: "academic_databases",
                work: PhaseWork::FanOut(jobs_for(SourceFamily::Academic)),
            },
            Phase {
                name: "google_scholar",
                work: PhaseWork::FanOut(jobs_for(SourceFamily::Scholar)),
            },
            Phase {
                name: "citation_databases",
                work: PhaseWork::FanOut(jobs_for(SourceFamily::CitationIndex)),
            },
        ];

        // Phase 5: dozens of publishers through the composite CrossRef
        // adapter, plus any publishers with direct APIs.
        let crossref_allowed = options
            .sources
            .as_ref()
            .map(|list| list.iter().any(|s| s == "crossref"))
            .unwrap_or(true);
        let mut publisher_jobs: Vec<FanOutJob> = Vec::new();
        if crossref_allowed {
            for publisher in crate::sources::descriptor::CROSSREF_PUBLISHERS {
                if let Some(adapter) = self.registry.publisher_adapter(publisher) {
                    publisher_jobs.push((adapter, query.to_string()));
                }
            }
        }
        publisher_jobs.extend(jobs_for(SourceFamily::Publisher));
        phases.push(Phase {
            name: "publishers",
            work: PhaseWork::FanOut(publisher_jobs),
        });

        if options.include_preprints {
            phases.push(Phase {
                name: "preprints",
                work: PhaseWork::FanOut(jobs_for(SourceFamily::Preprint)),
            });
        }

        if options.expand_citations {
            phases.push(Phase {
                name: "citation_network",
                work: PhaseWork::CitationExpansion,
            });
        }

        phases.push(Phase {
            name: "general_search",
            work: PhaseWork::FanOut(jobs_for(SourceFamily::GeneralSearch)),
        });

        // Phase 9: re-issue the top variations against one broad adapter.
        let broad = self
            .registry
            .get("semantic_scholar")
            .filter(allowed)
            .or_else(|| {
                self.registry
                    .by_family(SourceFamily::Academic)
                    .into_iter()
                    .find(allowed)
            });
        if let Some(adapter) = broad {
            let jobs: Vec<FanOutJob> = variations
                .iter()
                .take(5)
                .map(|variation| (adapter.clone(), variation.clone()))
                .collect();
            phases.push(Phase {
                name: "query_variations",
                work: PhaseWork::FanOut(jobs),
            });
        }

        phases
    }

    /// Run one fan-out phase on the bounded pool. Returns the number of
    /// records contributed.
    async fn run_fan_out(
        &self,
        state: &RunState,
        phase: &'static str,
        jobs: Vec<FanOutJob>,
        collected: &Mutex<Vec<Paper>>,
    ) -> usize {
        self.notify(state, phase, "", ProgressStatus::Running, 0, "");

        let mut join_set: JoinSet<Vec<Paper>> = JoinSet::new();
        for (adapter, query) in jobs {
            let semaphore = state.semaphore.clone();
            let progress = state.progress.clone();
            let sources_queried = state.sources_queried.clone();
            let deadline = state.deadline;
            let adapter_timeout = state.adapter_timeout;
            let max_per_source = state.max_per_source;
            let phase_name = phase.to_string();

            join_set.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return Vec::new(),
                };
                emit(
                    &progress,
                    &phase_name,
                    adapter.id(),
                    ProgressStatus::Running,
                    0,
                    "Searching...",
                );

                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    let cancelled = AppError::Cancelled("search deadline exceeded".into());
                    emit(
                        &progress,
                        &phase_name,
                        adapter.id(),
                        ProgressStatus::Error,
                        0,
                        &cancelled.to_string(),
                    );
                    return Vec::new();
                }

                let budget = remaining.min(adapter_timeout);
                match tokio::time::timeout(budget, adapter.search(&query, max_per_source)).await {
                    Ok(Ok(papers)) => {
                        sources_queried.fetch_add(1, Ordering::Relaxed);
                        emit(
                            &progress,
                            &phase_name,
                            adapter.id(),
                            ProgressStatus::Complete,
                            papers.len(),
                            &format!("Found {} papers", papers.len()),
                        );
                        papers
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(source = adapter.id(), error = %e, "adapter search failed");
                        emit(
                            &progress,
                            &phase_name,
                            adapter.id(),
                            ProgressStatus::Error,
                            0,
                            &e.to_string(),
                        );
                        Vec::new()
                    }
                    Err(_) => {
                        tracing::warn!(source = adapter.id(), "adapter search timed out");
                        emit(
                            &progress,
                            &phase_name,
                            adapter.id(),
                            ProgressStatus::Error,
                            0,
                            "timed out",
                        );
                        Vec::new()
                    }
                }
            });
        }

        let mut added = 0;
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(papers) => {
                    added += papers.len();
                    collected.lock().extend(papers);
                }
                Err(e) => tracing::warn!(error = %e, "fan-out worker panicked"),
            }
        }

        self.notify(state, phase, "", ProgressStatus::Complete, added, "");
        added
    }

    /// Phase 7: expand the citation network from the top-cited records
    /// collected so far.
    async fn run_citation_expansion(
        &self,
        state: &RunState,
        collected: &Mutex<Vec<Paper>>,
    ) -> usize {
        self.notify(state, "citation_network", "", ProgressStatus::Running, 0, "");
        let Some(provider) = self.registry.citation_provider() else {
            self.notify(
                state,
                "citation_network",
                "",
                ProgressStatus::Complete,
                0,
                "no citation-capable source available",
            );
            return 0;
        };
        emit(
            &state.progress,
            "citation_network",
            provider.id(),
            ProgressStatus::Running,
            0,
            "Expanding citation network...",
        );

        let seeds = collected.lock().clone();
        let builder = CitationNetworkBuilder::default();
        let per_call = 25usize;
        let expanded = builder
            .expand(&seeds, |direction, identifier| {
                let provider = provider.clone();
                async move {
                    match direction {
                        CitationDirection::CitedBy => {
                            provider.get_references(&identifier, per_call).await
                        }
                        CitationDirection::Citing => {
                            provider.get_citations(&identifier, per_call).await
                        }
                    }
                }
            })
            .await;

        let added = expanded.len();
        emit(
            &state.progress,
            "citation_network",
            provider.id(),
            ProgressStatus::Complete,
            added,
            &format!("Expanded network with {added} papers"),
        );
        collected.lock().extend(expanded);
        self.notify(
            state,
            "citation_network",
            "",
            ProgressStatus::Complete,
            added,
            "",
        );
        added
    }

    /// Phase 12: write open-access locations back onto the ranked records.
    async fn enrich_fulltext(&self, state: &RunState, papers: &mut [Paper]) -> usize {
        let mut resolved = 0;
        for paper in papers.iter_mut() {
            if Instant::now() >= state.deadline {
                break;
            }
            if paper.pdf_url.is_none() {
                let outcome = self.resolver.resolve(paper).await;
                if outcome.found {
                    paper.pdf_url = outcome.pdf_url;
                    paper.access_type = paper.access_type.merged_with(outcome.access_type);
                    resolved += 1;
                }
            }
            paper.build_urls(self.config.enable_scihub);
        }
        resolved
    }

    fn notify(
        &self,
        state: &RunState,
        phase: &str,
        source: &str,
        status: ProgressStatus,
        count: usize,
        message: &str,
    ) {
        emit(&state.progress, phase, source, status, count, message);
    }
}

type FanOutJob = (Arc<dyn SourceAdapter>, String);

struct Phase {
    name: &'static str,
    work: PhaseWork,
}

enum PhaseWork {
    FanOut(Vec<FanOutJob>),
    CitationExpansion,
}

fn emit(
    progress: &Option<ProgressSink>,
    phase: &str,
    source: &str,
    status: ProgressStatus,
    count: usize,
    message: &str,
) {
    if let Some(sink) = progress {
        sink(ProgressUpdate {
            phase: phase.to_string(),
            source: source.to_string(),
            status,
            count,
            message: message.to_string(),
        });
    }
}

fn apply_filters(papers: &mut Vec<Paper>, options: &SearchOptions) {
    if options.min_reliability > 0.0 {
        papers.retain(|p| p.reliability.total() >= options.min_reliability);
    }
    if let Some(start) = options.year_start {
        papers.retain(|p| p.year.is_some_and(|y| y >= start));
    }
    if let Some(end) = options.year_end {
        papers.retain(|p| p.year.is_some_and(|y| y <= end));
    }
    if !options.include_preprints {
        papers.retain(|p| p.source_type != SourceType::Preprint);
    }
}
