//! Table-driven embedder for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock};

use super::Embedder;
use super::error::EmbeddingError;
use crate::normalize::normalize;

/// Returns registered vectors for known texts and a zero vector otherwise.
///
/// Lookups go through [`normalize`], so registering `"Office address?"` also
/// answers for `"office   address?"`.
#[derive(Debug)]
pub struct MockEmbedder {
    vectors: RwLock<HashMap<String, Vec<f32>>>,
    dim: usize,
    failing: AtomicBool,
    calls: AtomicUsize,
    embedded: AtomicUsize,
    batch_sizes: Mutex<Vec<usize>>,
}

impl MockEmbedder {
    pub fn new(dim: usize) -> Self {
        Self {
            vectors: RwLock::new(HashMap::new()),
            dim,
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            embedded: AtomicUsize::new(0),
            batch_sizes: Mutex::new(Vec::new()),
        }
    }

    /// Registers `vector` for `text`.
    pub fn with_vector(self, text: &str, vector: Vec<f32>) -> Self {
        self.insert(text, vector);
        self
    }

    pub fn insert(&self, text: &str, vector: Vec<f32>) {
        self.vectors.write().insert(normalize(text), vector);
    }

    /// Makes every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `embed` calls, failed ones included.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of texts embedded successfully.
    pub fn embedded_count(&self) -> usize {
        self.embedded.load(Ordering::SeqCst)
    }

    /// Size of every batch received, in call order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().clone()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }
}

impl Embedder for MockEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.batch_sizes.lock().push(texts.len());

        if self.failing.load(Ordering::SeqCst) {
            return Err(EmbeddingError::Request {
                reason: "mock embedder failure".to_string(),
            });
        }

        let vectors = self.vectors.read();
        let out: Vec<Vec<f32>> = texts
            .iter()
            .map(|text| {
                vectors
                    .get(&normalize(text))
                    .cloned()
                    .unwrap_or_else(|| vec![0.0; self.dim])
            })
            .collect();

        self.embedded.fetch_add(out.len(), Ordering::SeqCst);
        Ok(out)
    }
}
