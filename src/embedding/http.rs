use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::Embedder;
use super::config::EmbeddingConfig;
use super::error::EmbeddingError;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
pub(crate) struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

impl EmbeddingResponse {
    /// Orders vectors by `index` and checks there is exactly one per input.
    pub(crate) fn into_vectors(self, expected: usize) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if self.data.len() != expected {
            return Err(EmbeddingError::CountMismatch {
                expected,
                actual: self.data.len(),
            });
        }

        let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
        for datum in self.data {
            let slot = slots
                .get_mut(datum.index)
                .ok_or_else(|| EmbeddingError::Decode {
                    reason: format!("index {} out of range for {} inputs", datum.index, expected),
                })?;
            if slot.replace(datum.embedding).is_some() {
                return Err(EmbeddingError::Decode {
                    reason: format!("duplicate index {}", datum.index),
                });
            }
        }

        // every slot is filled: `expected` distinct in-range indices were seen
        Ok(slots.into_iter().flatten().collect())
    }
}

/// Client for an OpenAI-compatible embeddings endpoint.
#[derive(Clone)]
pub struct HttpEmbedder {
    client: HttpClient,
    config: EmbeddingConfig,
}

impl std::fmt::Debug for HttpEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEmbedder")
            .field("url", &self.config.url)
            .field("model", &self.config.model)
            .field("has_api_key", &self.config.api_key.is_some())
            .finish()
    }
}

impl HttpEmbedder {
    pub fn new(config: EmbeddingConfig) -> Result<Self, EmbeddingError> {
        config.validate()?;

        let client = HttpClient::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EmbeddingError::InvalidConfig {
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }
}

impl Embedder for HttpEmbedder {
    #[instrument(skip(self, texts), fields(batch = texts.len(), model = %self.config.model))]
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self.client.post(&self.config.url).json(&EmbeddingRequest {
            model: &self.config.model,
            input: texts,
        });
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbeddingResponse = response.json().await?;
        let vectors = parsed.into_vectors(texts.len())?;

        debug!(
            vectors = vectors.len(),
            dim = vectors.first().map(Vec::len),
            "Embedding batch complete"
        );
        Ok(vectors)
    }
}
