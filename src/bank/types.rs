use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::hashing::fingerprint_entries;
use crate::normalize::normalize;

/// A row as delivered by the fetch collaborator, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
}

impl RawRecord {
    pub fn new(id: impl Into<String>, question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            question: Some(question.into()),
            answer: Some(answer.into()),
        }
    }
}

/// Why a [`RawRecord`] did not become an [`Entry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordRejected {
    MissingQuestion,
    MissingAnswer,
}

impl std::fmt::Display for RecordRejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordRejected::MissingQuestion => write!(f, "question is missing or blank"),
            RecordRejected::MissingAnswer => write!(f, "answer is missing or blank"),
        }
    }
}

/// One validated knowledge-bank record. Immutable once the bank is published.
#[derive(Debug, Clone)]
pub struct Entry {
    id: String,
    question: String,
    answer: String,
    normalized_question: String,
    embedding: Option<Arc<[f32]>>,
}

impl Entry {
    /// Builds an entry, trimming both texts and rejecting blank ones.
    pub fn try_new(
        id: impl Into<String>,
        question: &str,
        answer: &str,
    ) -> Result<Self, RecordRejected> {
        let question = question.trim();
        let answer = answer.trim();
        if question.is_empty() {
            return Err(RecordRejected::MissingQuestion);
        }
        if answer.is_empty() {
            return Err(RecordRejected::MissingAnswer);
        }

        let normalized_question = normalize(question);
        if normalized_question.is_empty() {
            return Err(RecordRejected::MissingQuestion);
        }

        Ok(Self {
            id: id.into(),
            question: question.to_string(),
            answer: answer.to_string(),
            normalized_question,
            embedding: None,
        })
    }

    pub fn with_embedding(mut self, embedding: Arc<[f32]>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn normalized_question(&self) -> &str {
        &self.normalized_question
    }

    pub fn embedding(&self) -> Option<&[f32]> {
        self.embedding.as_deref()
    }
}

impl TryFrom<RawRecord> for Entry {
    type Error = RecordRejected;

    fn try_from(record: RawRecord) -> Result<Self, Self::Error> {
        let question = record.question.ok_or(RecordRejected::MissingQuestion)?;
        let answer = record.answer.ok_or(RecordRejected::MissingAnswer)?;
        Entry::try_new(record.id, &question, &answer)
    }
}

/// Whether a bank generation can serve the semantic stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SemanticStatus {
    /// No embedder configured (or nothing to embed).
    Disabled,
    /// Every entry carries a vector of `dim` floats.
    Ready { dim: usize },
    /// Embedding failed for this generation; the semantic stage is skipped.
    Failed { reason: String },
}

impl SemanticStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, SemanticStatus::Ready { .. })
    }
}

/// One generation of the knowledge bank.
#[derive(Debug)]
pub struct Bank {
    entries: Vec<Entry>,
    loaded_at: Instant,
    loaded_at_utc: DateTime<Utc>,
    ttl: Duration,
    generation: u64,
    fingerprint: u64,
    semantic: SemanticStatus,
    skipped_rows: usize,
}

impl Bank {
    pub fn new(
        entries: Vec<Entry>,
        ttl: Duration,
        generation: u64,
        semantic: SemanticStatus,
    ) -> Self {
        let fingerprint = fingerprint_entries(
            entries
                .iter()
                .map(|e| (e.id.as_str(), e.question.as_str(), e.answer.as_str())),
        );

        Self {
            entries,
            loaded_at: Instant::now(),
            loaded_at_utc: Utc::now(),
            ttl,
            generation,
            fingerprint,
            semantic,
            skipped_rows: 0,
        }
    }

    pub(crate) fn with_skipped_rows(mut self, skipped_rows: usize) -> Self {
        self.skipped_rows = skipped_rows;
        self
    }

    #[inline]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn age(&self) -> Duration {
        self.loaded_at.elapsed()
    }

    /// `loaded_at + ttl >= now`.
    pub fn is_fresh(&self) -> bool {
        self.age() <= self.ttl
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at_utc
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    pub fn semantic(&self) -> &SemanticStatus {
        &self.semantic
    }

    /// Rows dropped at load time for failing validation.
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    /// `true` when the semantic stage has vectors to compare against.
    pub fn has_embeddings(&self) -> bool {
        self.semantic.is_ready() && self.entries.iter().any(|e| e.embedding.is_some())
    }

    pub fn embedding_dim(&self) -> Option<usize> {
        match self.semantic {
            SemanticStatus::Ready { dim } => Some(dim),
            _ => None,
        }
    }
}
