use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures_util::{StreamExt, TryStreamExt, stream};
use tracing::{debug, instrument};

use crate::constants::validate_embedding_dim;

use super::Embedder;
use super::error::EmbeddingError;
use super::memo::EmbeddingMemo;

/// Batches in flight at once when embedding a whole bank.
const EMBED_CONCURRENCY: usize = 4;

async fn embed_chunk<'a, E: Embedder>(
    embedder: &E,
    chunk: &'a [String],
) -> Result<(&'a [String], Vec<Vec<f32>>), EmbeddingError> {
    let batch = embedder.embed(chunk).await?;
    if batch.len() != chunk.len() {
        return Err(EmbeddingError::CountMismatch {
            expected: chunk.len(),
            actual: batch.len(),
        });
    }
    Ok((chunk, batch))
}

/// Embeds normalized `texts`, serving what it can from `memo`.
///
/// Misses go out in chunks of at most `batch_size` texts and are written back to
/// the memo. Every returned vector (memoized or fresh) must share one dimension.
#[instrument(skip(embedder, memo, texts), fields(text_count = texts.len()))]
pub async fn embed_batched<E: Embedder>(
    embedder: &E,
    memo: &EmbeddingMemo,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<Arc<[f32]>>, EmbeddingError> {
    if batch_size == 0 {
        return Err(EmbeddingError::InvalidConfig {
            reason: "batch_size must be > 0".to_string(),
        });
    }

    let mut vectors: Vec<Option<Arc<[f32]>>> = texts.iter().map(|t| memo.get(t)).collect();

    let mut seen = HashSet::new();
    let mut misses: Vec<String> = Vec::new();
    for (text, vector) in texts.iter().zip(&vectors) {
        if vector.is_none() && seen.insert(text.as_str()) {
            misses.push(text.clone());
        }
    }

    debug!(
        memo_hits = texts.len() - vectors.iter().filter(|v| v.is_none()).count(),
        misses = misses.len(),
        "Embedding memo lookup complete"
    );

    let pending: Vec<_> = misses
        .chunks(batch_size)
        .map(|chunk| embed_chunk(embedder, chunk))
        .collect();
    let fresh: Vec<(&[String], Vec<Vec<f32>>)> = stream::iter(pending)
        .buffered(EMBED_CONCURRENCY)
        .try_collect()
        .await?;

    let mut embedded: HashMap<&str, Arc<[f32]>> = HashMap::with_capacity(misses.len());
    for (chunk, batch) in fresh {
        for (text, vector) in chunk.iter().zip(batch) {
            let vector: Arc<[f32]> = vector.into();
            memo.insert(text, Arc::clone(&vector));
            embedded.insert(text.as_str(), vector);
        }
    }

    for (text, slot) in texts.iter().zip(vectors.iter_mut()) {
        if slot.is_none() {
            *slot = embedded.get(text.as_str()).cloned();
        }
    }

    let vectors: Vec<Arc<[f32]>> = vectors.into_iter().flatten().collect();
    if vectors.len() != texts.len() {
        return Err(EmbeddingError::CountMismatch {
            expected: texts.len(),
            actual: vectors.len(),
        });
    }

    if let Some(first) = vectors.first() {
        let dim = first.len();
        for vector in &vectors {
            validate_embedding_dim(vector.len(), dim)?;
        }
    }

    Ok(vectors)
}
