use std::collections::HashSet;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::bank::Bank;
use crate::normalize::tokenize;
use crate::pipeline::config::{PipelineConfig, StageKind};
use crate::pipeline::stage::{Query, Stage};
use crate::pipeline::types::{Confidence, MatchCandidate, MatchSource};

/// Token overlap with synonym bonuses.
///
/// Score is the number of distinct shared tokens plus `synonym_bonus` for each
/// synonym group with a member on both sides.
#[derive(Debug, Clone)]
pub struct KeywordStage {
    min_token_len: usize,
    min_score: f32,
    synonym_bonus: f32,
    groups: Vec<HashSet<String>>,
    vocabulary: HashSet<String>,
}

impl KeywordStage {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            min_token_len: config.keyword_min_token_len,
            min_score: config.keyword_min_score,
            synonym_bonus: config.synonym_bonus,
            groups: config
                .synonym_groups
                .iter()
                .map(|group| group.iter().cloned().collect())
                .collect(),
            vocabulary: config.synonym_vocabulary(),
        }
    }

    fn tokens(&self, normalized: &str) -> HashSet<String> {
        tokenize(normalized, self.min_token_len, &self.vocabulary)
    }

    fn groups_hit(&self, tokens: &HashSet<String>) -> Vec<bool> {
        self.groups
            .iter()
            .map(|group| tokens.iter().any(|t| group.contains(t)))
            .collect()
    }

    fn score(&self, query: &HashSet<String>, query_groups: &[bool], entry: &HashSet<String>) -> f32 {
        let shared = query.intersection(entry).count() as f32;
        let groups = self
            .groups
            .iter()
            .zip(query_groups)
            .filter(|(group, in_query)| **in_query && entry.iter().any(|t| group.contains(t)))
            .count() as f32;
        shared + groups * self.synonym_bonus
    }
}

#[async_trait]
impl Stage for KeywordStage {
    fn kind(&self) -> StageKind {
        StageKind::Keyword
    }

    #[instrument(skip_all, fields(entries = bank.len()))]
    async fn try_match<'b>(&self, query: &Query, bank: &'b Bank) -> Option<MatchCandidate<'b>> {
        let query_tokens = self.tokens(query.normalized());
        if query_tokens.is_empty() {
            debug!("No keyword tokens in query");
            return None;
        }
        let query_groups = self.groups_hit(&query_tokens);

        let mut best = None;
        let mut best_score = 0.0f32;
        for entry in bank.entries() {
            let entry_tokens = self.tokens(entry.normalized_question());
            let score = self.score(&query_tokens, &query_groups, &entry_tokens);
            if score > best_score {
                best_score = score;
                best = Some(entry);
            }
        }

        let entry = best?;
        if best_score < self.min_score {
            debug!(id = entry.id(), score = best_score, min = self.min_score, "Keyword best below floor");
            return None;
        }

        debug!(id = entry.id(), score = best_score, "Keyword stage accepted");
        Some(MatchCandidate {
            entry,
            score: best_score,
            source: MatchSource::Keyword,
            confidence: Confidence::Medium,
        })
    }
}
