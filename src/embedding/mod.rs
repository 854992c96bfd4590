//! Embedding collaborator and vector memoization.
//!
//! - [`Embedder`] is the seam to whatever produces vectors for text.
//! - [`HttpEmbedder`] talks to an OpenAI-compatible `/embeddings` endpoint.
//! - [`EmbeddingMemo`] keeps vectors across bank generations and repeated queries.
//! - [`embed_batched`] combines the two with bounded request sizes.

/// Batched embedding with memo lookups.
pub mod batch;
/// HTTP embedder configuration.
pub mod config;
mod error;
/// OpenAI-compatible HTTP embedder.
pub mod http;
/// BLAKE3-keyed vector memo.
pub mod memo;
#[cfg(any(test, feature = "mock"))]
pub mod mock;


pub use batch::embed_batched;
pub use config::EmbeddingConfig;
pub use error::EmbeddingError;
pub use http::HttpEmbedder;
pub use memo::EmbeddingMemo;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockEmbedder;

/// Produces one vector per input text, in input order.
///
/// Implementations must fail rather than return fewer vectors than texts.
pub trait Embedder: Send + Sync {
    /// Embeds `texts`.
    fn embed(
        &self,
        texts: &[String],
    ) -> impl std::future::Future<Output = Result<Vec<Vec<f32>>, EmbeddingError>> + Send;
}
