//! The four matching strategies, most precise first.

mod exact;
mod fuzzy;
mod keyword;
mod semantic;

pub use exact::ExactStage;
pub use fuzzy::FuzzyStage;
pub use keyword::KeywordStage;
pub use semantic::SemanticStage;
