use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::constants::{
    DEFAULT_BANK_TTL_SECS, DEFAULT_EMBED_BATCH_SIZE, DEFAULT_EMBEDDING_MEMO_CAPACITY,
};
use crate::embedding::{Embedder, EmbeddingError, EmbeddingMemo, embed_batched};

use super::error::{BankError, BankResult};
use super::fetch::EntryFetcher;
use super::types::{Bank, Entry, SemanticStatus};

/// Default pause between refresh attempts after a failure, while a stale bank is served.
pub const DEFAULT_REFRESH_BACKOFF_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct BankConfig {
    /// How long a generation stays fresh.
    pub ttl: Duration,
    /// Maximum texts per embedding request.
    pub embed_batch_size: usize,
    /// Serve the last good generation when a refresh fails.
    pub serve_stale_on_error: bool,
    /// While serving stale, wait this long before trying to refresh again.
    pub refresh_backoff: Duration,
    /// Maximum memoized vectors.
    pub memo_capacity: u64,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_BANK_TTL_SECS),
            embed_batch_size: DEFAULT_EMBED_BATCH_SIZE,
            serve_stale_on_error: true,
            refresh_backoff: Duration::from_secs(DEFAULT_REFRESH_BACKOFF_SECS),
            memo_capacity: DEFAULT_EMBEDDING_MEMO_CAPACITY,
        }
    }
}

impl BankConfig {
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn embed_batch_size(mut self, size: usize) -> Self {
        self.embed_batch_size = size;
        self
    }

    pub fn serve_stale_on_error(mut self, serve: bool) -> Self {
        self.serve_stale_on_error = serve;
        self
    }

    pub fn refresh_backoff(mut self, backoff: Duration) -> Self {
        self.refresh_backoff = backoff;
        self
    }

    pub fn memo_capacity(mut self, capacity: u64) -> Self {
        self.memo_capacity = capacity;
        self
    }

    pub fn validate(&self) -> BankResult<()> {
        if self.embed_batch_size == 0 {
            return Err(BankError::Config {
                reason: "embed_batch_size must be > 0".to_string(),
            });
        }
        if self.memo_capacity == 0 {
            return Err(BankError::Config {
                reason: "memo_capacity must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

/// Time-bounded, atomically swapped knowledge bank.
///
/// Readers clone an `Arc<Bank>` under a short read lock; a refresh builds the
/// next generation completely before swapping it in, so a reader never sees a
/// half-built bank. Concurrent refreshes are collapsed by an async mutex.
pub struct BankCache<F: EntryFetcher, E: Embedder> {
    fetcher: F,
    embedder: Option<Arc<E>>,
    memo: Arc<EmbeddingMemo>,
    config: BankConfig,
    current: RwLock<Option<Arc<Bank>>>,
    /// Bumped by every `invalidate`.
    invalidations: AtomicU64,
    /// Value of `invalidations` when the current generation started loading.
    loaded_epoch: AtomicU64,
    generation: AtomicU64,
    last_failure: Mutex<Option<Instant>>,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl<F: EntryFetcher, E: Embedder> std::fmt::Debug for BankCache<F, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BankCache")
            .field("config", &self.config)
            .field("semantic", &self.embedder.is_some())
            .field("generation", &self.generation.load(Ordering::Acquire))
            .field("memo", &self.memo)
            .finish_non_exhaustive()
    }
}

impl<F: EntryFetcher, E: Embedder> BankCache<F, E> {
    /// Creates an empty cache; the first [`get`](Self::get) loads the bank.
    ///
    /// Without an embedder every generation has [`SemanticStatus::Disabled`].
    pub fn new(fetcher: F, embedder: Option<Arc<E>>, config: BankConfig) -> BankResult<Self> {
        config.validate()?;

        Ok(Self {
            fetcher,
            embedder,
            memo: Arc::new(EmbeddingMemo::new(config.memo_capacity)),
            config,
            current: RwLock::new(None),
            invalidations: AtomicU64::new(0),
            loaded_epoch: AtomicU64::new(0),
            generation: AtomicU64::new(0),
            last_failure: Mutex::new(None),
            refresh_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn config(&self) -> &BankConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn embedder(&self) -> Option<&Arc<E>> {
        self.embedder.as_ref()
    }

    /// Vector memo shared by bank loads and query embedding.
    pub fn memo(&self) -> &Arc<EmbeddingMemo> {
        &self.memo
    }

    /// Returns the current generation without refreshing, fresh or not.
    pub fn current(&self) -> Option<Arc<Bank>> {
        self.current.read().clone()
    }

    /// Marks the current generation stale; the next [`get`](Self::get) reloads.
    ///
    /// The old generation stays available as a fallback if that reload fails. A
    /// load already in flight does not clear the mark, since it may have fetched
    /// rows from before the invalidation.
    pub fn invalidate(&self) {
        self.invalidations.fetch_add(1, Ordering::AcqRel);
        *self.last_failure.lock() = None;
        debug!("Bank invalidated");
    }

    fn fresh_bank(&self) -> Option<Arc<Bank>> {
        if self.loaded_epoch.load(Ordering::Acquire) != self.invalidations.load(Ordering::Acquire) {
            return None;
        }
        self.current().filter(|bank| bank.is_fresh())
    }

    fn in_backoff(&self) -> bool {
        self.last_failure
            .lock()
            .is_some_and(|at| at.elapsed() < self.config.refresh_backoff)
    }

    /// Returns a fresh bank, reloading first if the current one is stale.
    ///
    /// If the reload fails and a previous generation exists (and
    /// `serve_stale_on_error` is set), that generation is returned instead.
    #[instrument(skip(self))]
    pub async fn get(&self) -> BankResult<Arc<Bank>> {
        if let Some(bank) = self.fresh_bank() {
            return Ok(bank);
        }

        if self.config.serve_stale_on_error
            && self.in_backoff()
            && let Some(stale) = self.current()
        {
            debug!(generation = stale.generation(), "Serving stale bank during backoff");
            return Ok(stale);
        }

        let _guard = self.refresh_lock.lock().await;
        if let Some(bank) = self.fresh_bank() {
            debug!(generation = bank.generation(), "Bank refreshed by a concurrent request");
            return Ok(bank);
        }

        match self.load().await {
            Ok(bank) => Ok(bank),
            Err(err) => {
                *self.last_failure.lock() = Some(Instant::now());
                match self.current() {
                    Some(stale) if self.config.serve_stale_on_error => {
                        warn!(
                            error = %err,
                            generation = stale.generation(),
                            age_secs = stale.age().as_secs(),
                            "Bank refresh failed, serving last good generation"
                        );
                        Ok(stale)
                    }
                    _ => Err(err),
                }
            }
        }
    }

    /// Forces a reload regardless of freshness. Failures are returned, not masked.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> BankResult<Arc<Bank>> {
        let _guard = self.refresh_lock.lock().await;
        let result = self.load().await;
        if result.is_err() {
            *self.last_failure.lock() = Some(Instant::now());
        }
        result
    }

    async fn load(&self) -> BankResult<Arc<Bank>> {
        let started = Instant::now();
        let epoch = self.invalidations.load(Ordering::Acquire);
        let records = self.fetcher.fetch_entries().await?;
        let total = records.len();

        let mut entries = Vec::with_capacity(total);
        for record in records {
            let id = record.id.clone();
            match Entry::try_from(record) {
                Ok(entry) => entries.push(entry),
                Err(reason) => debug!(id = %id, %reason, "Skipping invalid row"),
            }
        }
        let skipped = total - entries.len();

        let (entries, semantic) = self.attach_embeddings(entries).await;

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let bank = Arc::new(
            Bank::new(entries, self.config.ttl, generation, semantic).with_skipped_rows(skipped),
        );

        *self.current.write() = Some(Arc::clone(&bank));
        self.loaded_epoch.store(epoch, Ordering::Release);
        *self.last_failure.lock() = None;

        info!(
            generation,
            entries = bank.len(),
            skipped,
            fingerprint = %format!("{:016x}", bank.fingerprint()),
            semantic = ?bank.semantic(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Bank loaded"
        );

        Ok(bank)
    }

    async fn attach_embeddings(&self, entries: Vec<Entry>) -> (Vec<Entry>, SemanticStatus) {
        let Some(embedder) = &self.embedder else {
            return (entries, SemanticStatus::Disabled);
        };
        if entries.is_empty() {
            return (entries, SemanticStatus::Disabled);
        }

        let texts: Vec<String> = entries
            .iter()
            .map(|e| e.normalized_question().to_string())
            .collect();

        match embed_batched(
            embedder.as_ref(),
            &self.memo,
            &texts,
            self.config.embed_batch_size,
        )
        .await
        {
            Ok(vectors) => {
                let dim = vectors.first().map_or(0, |v| v.len());
                let entries = entries
                    .into_iter()
                    .zip(vectors)
                    .map(|(entry, vector)| entry.with_embedding(vector))
                    .collect();
                (entries, SemanticStatus::Ready { dim })
            }
            Err(err) => {
                warn!(error = %err, "Embedding failed, semantic stage disabled for this generation");
                if matches!(err, EmbeddingError::Dimension(_)) {
                    self.memo.clear();
                }
                (
                    entries,
                    SemanticStatus::Failed {
                        reason: err.to_string(),
                    },
                )
            }
        }
    }
}
