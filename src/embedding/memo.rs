//! Memo of embedding vectors keyed by the BLAKE3 hash of normalized text.
//!
//! Survives bank refreshes, so a reload only embeds questions that changed.

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;

use crate::hashing::hash_text;

pub struct EmbeddingMemo {
    vectors: Cache<[u8; 32], Arc<[f32]>>,
}

impl EmbeddingMemo {
    const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

    /// Creates a memo holding at most `capacity` vectors, each for at most one day.
    pub fn new(capacity: u64) -> Self {
        Self::with_ttl(capacity, Self::DEFAULT_TTL)
    }

    pub fn with_ttl(capacity: u64, ttl: Duration) -> Self {
        Self {
            vectors: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    #[inline]
    pub fn get(&self, normalized: &str) -> Option<Arc<[f32]>> {
        self.vectors.get(&hash_text(normalized))
    }

    #[inline]
    pub fn insert(&self, normalized: &str, vector: Arc<[f32]>) {
        self.vectors.insert(hash_text(normalized), vector);
    }

    #[inline]
    pub fn contains(&self, normalized: &str) -> bool {
        self.vectors.contains_key(&hash_text(normalized))
    }

    /// Drops every vector (used when the embedding dimension changes).
    #[inline]
    pub fn clear(&self) {
        self.vectors.invalidate_all();
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.vectors.entry_count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vectors.entry_count() == 0
    }

    #[inline]
    pub fn run_pending_tasks(&self) {
        self.vectors.run_pending_tasks();
    }
}

impl Default for EmbeddingMemo {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_EMBEDDING_MEMO_CAPACITY)
    }
}

impl std::fmt::Debug for EmbeddingMemo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingMemo")
            .field("entries", &self.vectors.entry_count())
            .finish()
    }
}
