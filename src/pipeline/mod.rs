//! Cascading answer resolution.
//!
//! A [`Resolver`] asks the [`BankCache`](crate::bank::BankCache) for the current
//! bank and hands the query to each [`Stage`] in configured order. The first
//! stage whose best candidate clears its own floor answers; otherwise the
//! configured "no answer" text is returned with [`MatchSource::None`].
//!
//! | Stage    | Score                              | Accepts when             | Confidence    |
//! |----------|------------------------------------|--------------------------|---------------|
//! | exact    | 1.0, or shorter/longer containment | any hit                  | high          |
//! | keyword  | shared tokens + synonym bonuses    | `>= keyword_min_score`   | medium        |
//! | semantic | cosine                             | `>= semantic_floor`      | high / medium |
//! | fuzzy    | Dice, or `1 - d/max_len`           | floor, or edit tolerance | low           |

pub mod config;
pub mod error;
pub mod resolver;
pub mod stage;
pub mod stages;
pub mod types;

#[cfg(test)]
mod tests;

pub use config::{FuzzyMetric, PipelineConfig, StageKind};
pub use error::{ResolveError, ResolveResult};
pub use resolver::Resolver;
pub use stage::{Query, Stage};
pub use types::{ANSWER_SOURCE_HEADER, Confidence, MatchCandidate, MatchSource, ResolutionResult};
