use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::bank::Bank;
use crate::constants::validate_embedding_dim;
use crate::embedding::{Embedder, EmbeddingMemo, embed_batched};
use crate::pipeline::config::StageKind;
use crate::pipeline::stage::{Query, Stage};
use crate::pipeline::types::{Confidence, MatchCandidate, MatchSource};
use crate::similarity::cosine_similarity;

/// Cosine similarity between the query vector and every entry vector.
///
/// Skipped when the bank generation has no vectors. Query embedding failures
/// are logged and treated as "no match" so the cascade can continue.
pub struct SemanticStage<E: Embedder> {
    embedder: Arc<E>,
    memo: Arc<EmbeddingMemo>,
    floor: f32,
    direct_floor: f32,
}

impl<E: Embedder> std::fmt::Debug for SemanticStage<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticStage")
            .field("floor", &self.floor)
            .field("direct_floor", &self.direct_floor)
            .finish_non_exhaustive()
    }
}

impl<E: Embedder> SemanticStage<E> {
    pub fn new(embedder: Arc<E>, memo: Arc<EmbeddingMemo>, floor: f32, direct_floor: f32) -> Self {
        Self {
            embedder,
            memo,
            floor,
            direct_floor,
        }
    }

    async fn embed_query(&self, normalized: &str) -> Option<Arc<[f32]>> {
        let texts = [normalized.to_string()];
        match embed_batched(self.embedder.as_ref(), &self.memo, &texts, 1).await {
            Ok(mut vectors) => vectors.pop(),
            Err(err) => {
                warn!(error = %err, "Query embedding failed, skipping semantic stage");
                None
            }
        }
    }
}

#[async_trait]
impl<E: Embedder + 'static> Stage for SemanticStage<E> {
    fn kind(&self) -> StageKind {
        StageKind::Semantic
    }

    #[instrument(skip_all, fields(entries = bank.len()))]
    async fn try_match<'b>(&self, query: &Query, bank: &'b Bank) -> Option<MatchCandidate<'b>> {
        let Some(dim) = bank.embedding_dim().filter(|_| bank.has_embeddings()) else {
            debug!(semantic = ?bank.semantic(), "No vectors in this generation");
            return None;
        };

        let vector = self.embed_query(query.normalized()).await?;
        if let Err(err) = validate_embedding_dim(vector.len(), dim) {
            warn!(error = ?err, "Query vector does not match bank dimension, skipping");
            return None;
        }

        let mut best = None;
        let mut best_score = f32::NEG_INFINITY;
        for entry in bank.entries() {
            let Some(embedding) = entry.embedding() else {
                continue;
            };
            let score = cosine_similarity(&vector, embedding);
            if score > best_score {
                best_score = score;
                best = Some(entry);
            }
        }

        let entry = best?;
        if best_score < self.floor {
            debug!(id = entry.id(), score = best_score, floor = self.floor, "Semantic best below floor");
            return None;
        }

        let confidence = if best_score >= self.direct_floor {
            Confidence::High
        } else {
            Confidence::Medium
        };
        debug!(id = entry.id(), score = best_score, ?confidence, "Semantic stage accepted");

        Some(MatchCandidate {
            entry,
            score: best_score,
            source: MatchSource::Semantic,
            confidence,
        })
    }
}
