//! Cross-cutting, shared constants.
//!
//! Pipeline thresholds live here as defaults only. Every one of them is overridable
//! through [`crate::pipeline::PipelineConfig`]; revisions of the bank tend to need
//! retuning, so nothing below should be treated as load-bearing.

/// Shortest string (in chars) allowed to take part in a containment match.
pub const DEFAULT_CONTAINMENT_MIN_LEN: usize = 4;

/// Tokens shorter than this are ignored by the keyword stage unless they are synonyms.
pub const DEFAULT_KEYWORD_MIN_TOKEN_LEN: usize = 4;

/// Minimum keyword score (overlapping tokens plus synonym bonuses) to accept.
pub const DEFAULT_KEYWORD_MIN_SCORE: f32 = 2.0;

/// Score added for each synonym group present in both query and entry.
pub const DEFAULT_SYNONYM_BONUS: f32 = 2.0;

/// Cosine similarity floor for the semantic stage (inclusive).
pub const DEFAULT_SEMANTIC_FLOOR: f32 = 0.78;

/// Cosine similarity at or above which a semantic hit is reported as high confidence.
pub const DEFAULT_SEMANTIC_DIRECT_FLOOR: f32 = 0.90;

/// Dice similarity floor for the fuzzy stage (inclusive).
pub const DEFAULT_FUZZY_FLOOR: f32 = 0.5;

/// Levenshtein tolerance as a fraction of the query length.
pub const DEFAULT_LEVENSHTEIN_RATIO: f32 = 0.35;

/// Lower bound on the Levenshtein tolerance, regardless of query length.
pub const DEFAULT_LEVENSHTEIN_MIN_TOLERANCE: usize = 2;

/// Answer returned when no stage accepts a candidate.
pub const DEFAULT_NO_ANSWER_TEXT: &str =
    "Sorry, I couldn't find an answer to that. Please try rephrasing your question.";

/// Bank time-to-live before the next request triggers a reload.
pub const DEFAULT_BANK_TTL_SECS: u64 = 300;

/// Maximum number of texts sent to the embedding service in one request.
pub const DEFAULT_EMBED_BATCH_SIZE: usize = 64;

/// Maximum number of memoized embedding vectors.
pub const DEFAULT_EMBEDDING_MEMO_CAPACITY: u64 = 10_000;

/// Timeout applied to every outbound HTTP call (fetch and embed).
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

/// Rows requested per page from the backing store.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Hard stop for cursor pagination.
pub const MAX_FETCH_PAGES: usize = 1_000;

/// Error returned when an embedding vector does not have the dimension of its generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimValidationError {
    /// Embedding dimension cannot be zero.
    ZeroDimension,
    /// Runtime dimension does not match expected dimension.
    DimensionMismatch { expected: usize, actual: usize },
}

impl std::fmt::Display for DimValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroDimension => write!(f, "embedding dimension cannot be zero"),
            Self::DimensionMismatch { expected, actual } => {
                write!(
                    f,
                    "dimension mismatch: expected {}, got {}",
                    expected, actual
                )
            }
        }
    }
}

impl std::error::Error for DimValidationError {}

/// Validates that a runtime embedding dimension matches the expected dimension.
///
/// # Example
///
/// ```
/// use faq_cascade::constants::validate_embedding_dim;
///
/// validate_embedding_dim(1536, 1536).unwrap();
/// assert!(validate_embedding_dim(768, 1536).is_err());
/// ```
pub fn validate_embedding_dim(actual: usize, expected: usize) -> Result<(), DimValidationError> {
    if expected == 0 || actual == 0 {
        return Err(DimValidationError::ZeroDimension);
    }
    if actual != expected {
        return Err(DimValidationError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semantic_floors_are_ordered() {
        assert!(DEFAULT_SEMANTIC_DIRECT_FLOOR >= DEFAULT_SEMANTIC_FLOOR);
    }

    #[test]
    fn test_validate_embedding_dim_match() {
        assert!(validate_embedding_dim(1536, 1536).is_ok());
    }

    #[test]
    fn test_validate_embedding_dim_zero() {
        assert_eq!(
            validate_embedding_dim(0, 1536),
            Err(DimValidationError::ZeroDimension)
        );
    }

    #[test]
    fn test_validate_embedding_dim_mismatch() {
        assert_eq!(
            validate_embedding_dim(768, 1536),
            Err(DimValidationError::DimensionMismatch {
                expected: 1536,
                actual: 768
            })
        );
    }

    #[test]
    fn test_error_display() {
        let err = DimValidationError::DimensionMismatch {
            expected: 1536,
            actual: 768,
        };
        assert!(err.to_string().contains("1536"));
        assert!(err.to_string().contains("768"));
    }
}
