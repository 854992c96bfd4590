use thiserror::Error;

use crate::bank::BankError;

/// Errors surfaced by [`Resolver::resolve`](super::Resolver::resolve).
///
/// Finding no answer is not an error; it resolves to `source = none`.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid query: {reason}")]
    InvalidInput { reason: String },

    /// The bank could not be loaded and no earlier generation was available.
    #[error(transparent)]
    Upstream(#[from] BankError),

    #[error("resolution exceeded its {budget_ms}ms budget after {elapsed_ms}ms")]
    BudgetExceeded { elapsed_ms: u64, budget_ms: u64 },
}

pub type ResolveResult<T> = Result<T, ResolveError>;
