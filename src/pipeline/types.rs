use std::fmt;

use serde::{Deserialize, Serialize};

use super::config::StageKind;
use crate::bank::Entry;

/// Response header naming the stage that produced the answer.
pub const ANSWER_SOURCE_HEADER: &str = "x-answer-source";

/// Which stage produced a result, or `None` when nothing matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchSource {
    Exact,
    Keyword,
    Semantic,
    Fuzzy,
    None,
}

impl MatchSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchSource::Exact => "exact",
            MatchSource::Keyword => "keyword",
            MatchSource::Semantic => "semantic",
            MatchSource::Fuzzy => "fuzzy",
            MatchSource::None => "none",
        }
    }
}

impl fmt::Display for MatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<StageKind> for MatchSource {
    fn from(kind: StageKind) -> Self {
        match kind {
            StageKind::Exact => MatchSource::Exact,
            StageKind::Keyword => MatchSource::Keyword,
            StageKind::Semantic => MatchSource::Semantic,
            StageKind::Fuzzy => MatchSource::Fuzzy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// A stage's accepted best entry. Borrows from the bank it was matched against.
#[derive(Debug, Clone, Copy)]
pub struct MatchCandidate<'b> {
    pub entry: &'b Entry,
    pub score: f32,
    pub source: MatchSource,
    pub confidence: Confidence,
}

/// Answer plus provenance, as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    pub source: MatchSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
}

impl ResolutionResult {
    /// The canned reply used when no stage accepts.
    pub fn no_match(text: impl Into<String>) -> Self {
        Self {
            answer: text.into(),
            matched_question: None,
            score: None,
            source: MatchSource::None,
            entry_id: None,
            confidence: None,
        }
    }

    pub fn is_match(&self) -> bool {
        self.source != MatchSource::None
    }
}

impl From<MatchCandidate<'_>> for ResolutionResult {
    fn from(candidate: MatchCandidate<'_>) -> Self {
        Self {
            answer: candidate.entry.answer().to_string(),
            matched_question: Some(candidate.entry.question().to_string()),
            score: Some(candidate.score),
            source: candidate.source,
            entry_id: Some(candidate.entry.id().to_string()),
            confidence: Some(candidate.confidence),
        }
    }
}
