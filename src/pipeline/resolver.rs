use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::config::{PipelineConfig, StageKind};
use super::error::{ResolveError, ResolveResult};
use super::stage::{Query, Stage};
use super::stages::{ExactStage, FuzzyStage, KeywordStage, SemanticStage};
use super::types::ResolutionResult;
use crate::bank::{BankCache, EntryFetcher};
use crate::config::ConfigError;
use crate::embedding::Embedder;

/// Runs a query through the configured stages against the current bank.
pub struct Resolver<F: EntryFetcher, E: Embedder> {
    cache: Arc<BankCache<F, E>>,
    stages: Vec<Box<dyn Stage>>,
    config: PipelineConfig,
}

impl<F: EntryFetcher, E: Embedder> std::fmt::Debug for Resolver<F, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("stages", &self.stage_kinds())
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl<F, E> Resolver<F, E>
where
    F: EntryFetcher,
    E: Embedder + 'static,
{
    /// Builds the stage list from `config.stage_order`.
    ///
    /// The semantic stage is left out when the cache has no embedder.
    pub fn new(cache: Arc<BankCache<F, E>>, config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut stages: Vec<Box<dyn Stage>> = Vec::with_capacity(config.stage_order.len());
        for kind in &config.stage_order {
            match kind {
                StageKind::Exact => stages.push(Box::new(ExactStage::new(config.containment_min_len))),
                StageKind::Keyword => stages.push(Box::new(KeywordStage::new(&config))),
                StageKind::Semantic => match cache.embedder() {
                    Some(embedder) => stages.push(Box::new(SemanticStage::new(
                        Arc::clone(embedder),
                        Arc::clone(cache.memo()),
                        config.semantic_floor,
                        config.semantic_direct_floor,
                    ))),
                    None => info!("No embedder configured, semantic stage disabled"),
                },
                StageKind::Fuzzy => stages.push(Box::new(FuzzyStage::new(&config))),
            }
        }

        Ok(Self {
            cache,
            stages,
            config,
        })
    }
}

impl<F: EntryFetcher, E: Embedder> Resolver<F, E> {
    pub fn cache(&self) -> &Arc<BankCache<F, E>> {
        &self.cache
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Active stages, in the order they run.
    pub fn stage_kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(|s| s.kind()).collect()
    }

    /// Answers `query`, or returns the canned reply with `source = none`.
    ///
    /// The budget clock starts on entry, so a cold bank load counts against it.
    #[instrument(skip(self, query), fields(query_len = query.len()))]
    pub async fn resolve(&self, query: &str) -> ResolveResult<ResolutionResult> {
        let started = Instant::now();
        let query = Query::parse(query)?;
        let bank = self.cache.get().await?;

        for (index, stage) in self.stages.iter().enumerate() {
            if index > 0
                && let Some(budget) = self.config.resolve_budget
            {
                let elapsed = started.elapsed();
                if elapsed > budget {
                    warn!(
                        stage = %stage.kind(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Resolution budget exhausted"
                    );
                    return Err(ResolveError::BudgetExceeded {
                        elapsed_ms: elapsed.as_millis() as u64,
                        budget_ms: budget.as_millis() as u64,
                    });
                }
            }

            match stage.try_match(&query, &bank).await {
                Some(candidate) => {
                    info!(
                        source = %candidate.source,
                        id = candidate.entry.id(),
                        score = candidate.score,
                        generation = bank.generation(),
                        "Answer resolved"
                    );
                    return Ok(candidate.into());
                }
                None => debug!(stage = %stage.kind(), "Stage passed"),
            }
        }

        info!(generation = bank.generation(), "No stage accepted");
        Ok(ResolutionResult::no_match(self.config.no_answer_text.clone()))
    }
}
