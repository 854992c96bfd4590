use async_trait::async_trait;

use super::config::StageKind;
use super::error::ResolveError;
use super::types::MatchCandidate;
use crate::bank::Bank;
use crate::normalize::normalize;

/// A query as the stages see it: the caller's text and its normalized form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    raw: String,
    normalized: String,
}

impl Query {
    /// Rejects input that is empty after trimming or normalizes to nothing.
    pub fn parse(raw: &str) -> Result<Self, ResolveError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ResolveError::InvalidInput {
                reason: "query is empty".to_string(),
            });
        }

        let normalized = normalize(trimmed);
        if normalized.is_empty() {
            return Err(ResolveError::InvalidInput {
                reason: "query has no matchable text".to_string(),
            });
        }

        Ok(Self {
            raw: trimmed.to_string(),
            normalized,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }
}

/// One step of the cascade.
///
/// Returns the stage's best candidate only when it clears the stage's own
/// acceptance policy; `None` hands the query to the next stage.
#[async_trait]
pub trait Stage: Send + Sync + std::fmt::Debug {
    fn kind(&self) -> StageKind;

    async fn try_match<'b>(&self, query: &Query, bank: &'b Bank) -> Option<MatchCandidate<'b>>;
}
