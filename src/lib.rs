//! faq-cascade library crate (used by the server binary and integration tests).
//!
//! Answers free-text questions from a small knowledge bank of question/answer
//! pairs by running them through matching stages of increasing tolerance:
//! exact/containment, keyword overlap, embedding similarity, fuzzy string
//! similarity. The first stage that accepts wins.
//!
//! # Public API Surface
//!
//! ## Resolution
//! - [`Resolver`], [`PipelineConfig`], [`ResolutionResult`] - The cascade and its result
//! - [`Stage`], [`StageKind`], [`MatchSource`], [`Confidence`] - Stage plumbing and provenance
//!
//! ## Knowledge Bank
//! - [`BankCache`], [`BankConfig`], [`Bank`], [`Entry`] - TTL cache with atomic swaps
//! - [`EntryFetcher`], [`HttpTableFetcher`], [`FileFetcher`] - Row sources
//!
//! ## Embedding
//! - [`Embedder`], [`HttpEmbedder`], [`EmbeddingMemo`] - Vectors for the semantic stage
//!
//! ## Utilities
//! - [`normalize()`], [`similarity`] - Text canonicalization and string/vector metrics
//! - Hashing functions for memo keys and bank fingerprints
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.
//!
//! ```no_run
//! use std::sync::Arc;
//! use faq_cascade::{BankCache, BankConfig, FileFetcher, HttpEmbedder, PipelineConfig, Resolver};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let cache: BankCache<FileFetcher, HttpEmbedder> =
//!     BankCache::new(FileFetcher::new("faq.json"), None, BankConfig::default())?;
//! let resolver = Resolver::new(Arc::new(cache), PipelineConfig::default())?;
//!
//! let result = resolver.resolve("where is the office?").await?;
//! println!("{} ({})", result.answer, result.source);
//! # Ok(())
//! # }
//! ```

pub mod bank;
pub mod config;
pub mod constants;
pub mod embedding;
pub mod gateway;
pub mod hashing;
pub mod normalize;
pub mod pipeline;
pub mod similarity;

pub use bank::{
    Bank, BankCache, BankConfig, BankError, BankResult, Entry, EntryFetcher, FetchError,
    FileFetcher, HttpTableFetcher, RawRecord, RecordRejected, SemanticStatus, SourceFetcher,
    TableSourceConfig,
};
#[cfg(any(test, feature = "mock"))]
pub use bank::MockFetcher;

pub use config::{Config, ConfigError};
pub use constants::{DimValidationError, validate_embedding_dim};
pub use embedding::{Embedder, EmbeddingConfig, EmbeddingError, EmbeddingMemo, HttpEmbedder};
#[cfg(any(test, feature = "mock"))]
pub use embedding::MockEmbedder;

pub use hashing::{fingerprint_entries, hash_text};
pub use normalize::{normalize, tokenize};
pub use pipeline::{
    ANSWER_SOURCE_HEADER, Confidence, FuzzyMetric, MatchCandidate, MatchSource, PipelineConfig,
    ResolutionResult, ResolveError, ResolveResult, Resolver, Stage, StageKind,
};
