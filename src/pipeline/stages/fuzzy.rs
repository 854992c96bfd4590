use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::bank::{Bank, Entry};
use crate::pipeline::config::{FuzzyMetric, PipelineConfig, StageKind};
use crate::pipeline::stage::{Query, Stage};
use crate::pipeline::types::{Confidence, MatchCandidate, MatchSource};
use crate::similarity::{dice, levenshtein, levenshtein_tolerance};

/// Last-resort string similarity over whole normalized questions.
#[derive(Debug, Clone)]
pub struct FuzzyStage {
    metric: FuzzyMetric,
    floor: f32,
    ratio: f32,
    min_tolerance: usize,
}

impl FuzzyStage {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            metric: config.fuzzy_metric,
            floor: config.fuzzy_floor,
            ratio: config.levenshtein_ratio,
            min_tolerance: config.levenshtein_min_tolerance,
        }
    }

    fn best_dice<'b>(&self, q: &str, bank: &'b Bank) -> Option<(&'b Entry, f32)> {
        let mut best: Option<(&Entry, f32)> = None;
        for entry in bank.entries() {
            let score = dice(q, entry.normalized_question());
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((entry, score));
            }
        }

        let (entry, score) = best?;
        if score < self.floor {
            debug!(id = entry.id(), score, floor = self.floor, "Dice best below floor");
            return None;
        }
        Some((entry, score))
    }

    fn best_levenshtein<'b>(&self, q: &str, bank: &'b Bank) -> Option<(&'b Entry, f32)> {
        let q_len = q.chars().count();
        let tolerance = levenshtein_tolerance(q_len, self.ratio, self.min_tolerance);

        let mut best: Option<(&Entry, usize)> = None;
        for entry in bank.entries() {
            let distance = levenshtein(q, entry.normalized_question());
            if best.is_none_or(|(_, d)| distance < d) {
                best = Some((entry, distance));
            }
        }

        let (entry, distance) = best?;
        if distance > tolerance {
            debug!(id = entry.id(), distance, tolerance, "Levenshtein best outside tolerance");
            return None;
        }

        let max_len = q_len.max(entry.normalized_question().chars().count()).max(1);
        Some((entry, 1.0 - distance as f32 / max_len as f32))
    }
}

#[async_trait]
impl Stage for FuzzyStage {
    fn kind(&self) -> StageKind {
        StageKind::Fuzzy
    }

    #[instrument(skip_all, fields(entries = bank.len(), metric = ?self.metric))]
    async fn try_match<'b>(&self, query: &Query, bank: &'b Bank) -> Option<MatchCandidate<'b>> {
        let (entry, score) = match self.metric {
            FuzzyMetric::Dice => self.best_dice(query.normalized(), bank),
            FuzzyMetric::Levenshtein => self.best_levenshtein(query.normalized(), bank),
        }?;

        debug!(id = entry.id(), score, "Fuzzy stage accepted");
        Some(MatchCandidate {
            entry,
            score,
            source: MatchSource::Fuzzy,
            confidence: Confidence::Low,
        })
    }
}
