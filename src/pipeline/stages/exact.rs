use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::bank::Bank;
use crate::pipeline::config::StageKind;
use crate::pipeline::stage::{Query, Stage};
use crate::pipeline::types::{Confidence, MatchCandidate, MatchSource};
use crate::similarity::{ContainmentMatch, containment};

/// Normalized equality, then containment in either direction.
#[derive(Debug, Clone)]
pub struct ExactStage {
    min_len: usize,
}

impl ExactStage {
    pub fn new(min_len: usize) -> Self {
        Self { min_len }
    }
}

#[async_trait]
impl Stage for ExactStage {
    fn kind(&self) -> StageKind {
        StageKind::Exact
    }

    #[instrument(skip_all, fields(entries = bank.len()))]
    async fn try_match<'b>(&self, query: &Query, bank: &'b Bank) -> Option<MatchCandidate<'b>> {
        let q = query.normalized();

        let hit = bank
            .entries()
            .iter()
            .find(|e| e.normalized_question() == q)
            .map(|entry| (entry, 1.0))
            .or_else(|| {
                // First containment in bank order wins, not the best ratio.
                bank.entries().iter().find_map(|entry| {
                    match containment(q, entry.normalized_question(), self.min_len) {
                        Some(ContainmentMatch::Contains { ratio }) => Some((entry, ratio)),
                        _ => None,
                    }
                })
            });

        let (entry, score) = hit?;
        debug!(id = entry.id(), score, "Exact stage accepted");

        Some(MatchCandidate {
            entry,
            score,
            source: MatchSource::Exact,
            confidence: Confidence::High,
        })
    }
}
