use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, env_parse, env_string};
use crate::constants::{
    DEFAULT_CONTAINMENT_MIN_LEN, DEFAULT_FUZZY_FLOOR, DEFAULT_KEYWORD_MIN_SCORE,
    DEFAULT_KEYWORD_MIN_TOKEN_LEN, DEFAULT_LEVENSHTEIN_MIN_TOLERANCE, DEFAULT_LEVENSHTEIN_RATIO,
    DEFAULT_NO_ANSWER_TEXT, DEFAULT_SEMANTIC_DIRECT_FLOOR, DEFAULT_SEMANTIC_FLOOR,
    DEFAULT_SYNONYM_BONUS,
};
use crate::normalize::normalize;

/// A matching strategy in the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Exact,
    Keyword,
    Semantic,
    Fuzzy,
}

impl StageKind {
    /// Most precise first, most tolerant last.
    pub const DEFAULT_ORDER: [StageKind; 4] = [
        StageKind::Exact,
        StageKind::Keyword,
        StageKind::Semantic,
        StageKind::Fuzzy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Exact => "exact",
            StageKind::Keyword => "keyword",
            StageKind::Semantic => "semantic",
            StageKind::Fuzzy => "fuzzy",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(StageKind::Exact),
            "keyword" => Ok(StageKind::Keyword),
            "semantic" => Ok(StageKind::Semantic),
            "fuzzy" => Ok(StageKind::Fuzzy),
            other => Err(format!("unknown stage '{}'", other)),
        }
    }
}

/// String metric used by the fuzzy stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuzzyMetric {
    /// Bigram Dice coefficient, accepted at or above `fuzzy_floor`.
    #[default]
    Dice,
    /// Edit distance, accepted within a length-scaled tolerance.
    Levenshtein,
}

impl FromStr for FuzzyMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dice" => Ok(FuzzyMetric::Dice),
            "levenshtein" => Ok(FuzzyMetric::Levenshtein),
            other => Err(format!("unknown fuzzy metric '{}'", other)),
        }
    }
}

/// Synonym groups shipped by default: contact, recruiting, pricing, hours.
pub fn default_synonym_groups() -> Vec<Vec<String>> {
    let groups: [&[&str]; 4] = [
        &["contact", "email", "mail", "phone", "call", "reach"],
        &["job", "jobs", "career", "careers", "hiring", "vacancy", "vacancies", "apply", "work"],
        &["price", "prices", "pricing", "cost", "costs", "fee", "fees", "charge"],
        &["hours", "open", "opening", "close", "closing", "closed"],
    ];
    groups
        .iter()
        .map(|group| group.iter().map(|word| normalize(word)).collect())
        .collect()
}

/// Thresholds, stage order and canned text for the resolution pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub stage_order: Vec<StageKind>,

    /// Shortest string (chars) allowed in a containment match. Default: `4`.
    pub containment_min_len: usize,

    /// Shortest keyword token unless it is a synonym. Default: `4`.
    pub keyword_min_token_len: usize,

    /// Inclusive acceptance floor for the keyword score. Default: `2.0`.
    pub keyword_min_score: f32,

    /// Added once per synonym group present on both sides. Default: `2.0`.
    pub synonym_bonus: f32,

    /// Normalized synonym groups.
    pub synonym_groups: Vec<Vec<String>>,

    /// Inclusive cosine floor. Default: `0.78`.
    pub semantic_floor: f32,

    /// Cosine at or above which a semantic hit is high confidence. Default: `0.90`.
    pub semantic_direct_floor: f32,

    pub fuzzy_metric: FuzzyMetric,

    /// Inclusive Dice floor. Default: `0.5`.
    pub fuzzy_floor: f32,

    pub levenshtein_ratio: f32,

    pub levenshtein_min_tolerance: usize,

    pub no_answer_text: String,

    /// Wall-clock limit for one resolution, checked between stages.
    pub resolve_budget: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stage_order: StageKind::DEFAULT_ORDER.to_vec(),
            containment_min_len: DEFAULT_CONTAINMENT_MIN_LEN,
            keyword_min_token_len: DEFAULT_KEYWORD_MIN_TOKEN_LEN,
            keyword_min_score: DEFAULT_KEYWORD_MIN_SCORE,
            synonym_bonus: DEFAULT_SYNONYM_BONUS,
            synonym_groups: default_synonym_groups(),
            semantic_floor: DEFAULT_SEMANTIC_FLOOR,
            semantic_direct_floor: DEFAULT_SEMANTIC_DIRECT_FLOOR,
            fuzzy_metric: FuzzyMetric::default(),
            fuzzy_floor: DEFAULT_FUZZY_FLOOR,
            levenshtein_ratio: DEFAULT_LEVENSHTEIN_RATIO,
            levenshtein_min_tolerance: DEFAULT_LEVENSHTEIN_MIN_TOLERANCE,
            no_answer_text: DEFAULT_NO_ANSWER_TEXT.to_string(),
            resolve_budget: None,
        }
    }
}

impl PipelineConfig {
    const ENV_STAGE_ORDER: &'static str = "FAQ_STAGE_ORDER";
    const ENV_CONTAINMENT_MIN_LEN: &'static str = "FAQ_CONTAINMENT_MIN_LEN";
    const ENV_KEYWORD_MIN_TOKEN_LEN: &'static str = "FAQ_KEYWORD_MIN_TOKEN_LEN";
    const ENV_KEYWORD_MIN_SCORE: &'static str = "FAQ_KEYWORD_MIN_SCORE";
    const ENV_SYNONYM_BONUS: &'static str = "FAQ_SYNONYM_BONUS";
    const ENV_SYNONYM_GROUPS: &'static str = "FAQ_SYNONYM_GROUPS";
    const ENV_SEMANTIC_FLOOR: &'static str = "FAQ_SEMANTIC_FLOOR";
    const ENV_SEMANTIC_DIRECT_FLOOR: &'static str = "FAQ_SEMANTIC_DIRECT_FLOOR";
    const ENV_FUZZY_METRIC: &'static str = "FAQ_FUZZY_METRIC";
    const ENV_FUZZY_FLOOR: &'static str = "FAQ_FUZZY_FLOOR";
    const ENV_NO_ANSWER_TEXT: &'static str = "FAQ_NO_ANSWER_TEXT";
    const ENV_RESOLVE_BUDGET_MS: &'static str = "FAQ_RESOLVE_BUDGET_MS";

    /// Loads overrides from `FAQ_*` variables and validates the result.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let stage_order = match env_string(Self::ENV_STAGE_ORDER) {
            Some(value) => parse_stage_order(&value).map_err(|reason| ConfigError::ParseError {
                name: Self::ENV_STAGE_ORDER,
                value,
                reason,
            })?,
            None => defaults.stage_order,
        };
        let synonym_groups = env_string(Self::ENV_SYNONYM_GROUPS)
            .map(|value| parse_synonym_groups(&value))
            .unwrap_or(defaults.synonym_groups);

        let config = Self {
            stage_order,
            containment_min_len: env_parse(Self::ENV_CONTAINMENT_MIN_LEN)?
                .unwrap_or(defaults.containment_min_len),
            keyword_min_token_len: env_parse(Self::ENV_KEYWORD_MIN_TOKEN_LEN)?
                .unwrap_or(defaults.keyword_min_token_len),
            keyword_min_score: env_parse(Self::ENV_KEYWORD_MIN_SCORE)?
                .unwrap_or(defaults.keyword_min_score),
            synonym_bonus: env_parse(Self::ENV_SYNONYM_BONUS)?.unwrap_or(defaults.synonym_bonus),
            synonym_groups,
            semantic_floor: env_parse(Self::ENV_SEMANTIC_FLOOR)?.unwrap_or(defaults.semantic_floor),
            semantic_direct_floor: env_parse(Self::ENV_SEMANTIC_DIRECT_FLOOR)?
                .unwrap_or(defaults.semantic_direct_floor),
            fuzzy_metric: env_parse(Self::ENV_FUZZY_METRIC)?.unwrap_or(defaults.fuzzy_metric),
            fuzzy_floor: env_parse(Self::ENV_FUZZY_FLOOR)?.unwrap_or(defaults.fuzzy_floor),
            levenshtein_ratio: defaults.levenshtein_ratio,
            levenshtein_min_tolerance: defaults.levenshtein_min_tolerance,
            no_answer_text: env_string(Self::ENV_NO_ANSWER_TEXT).unwrap_or(defaults.no_answer_text),
            resolve_budget: env_parse(Self::ENV_RESOLVE_BUDGET_MS)?.map(Duration::from_millis),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stage_order.is_empty() {
            return Err(invalid("stage_order", "at least one stage is required"));
        }
        let mut seen = HashSet::new();
        for stage in &self.stage_order {
            if !seen.insert(stage) {
                return Err(invalid("stage_order", format!("stage '{}' listed twice", stage)));
            }
        }

        check_unit("semantic_floor", self.semantic_floor)?;
        check_unit("semantic_direct_floor", self.semantic_direct_floor)?;
        check_unit("fuzzy_floor", self.fuzzy_floor)?;
        if self.semantic_direct_floor < self.semantic_floor {
            return Err(invalid(
                "semantic_direct_floor",
                "must not be below semantic_floor",
            ));
        }

        if !self.keyword_min_score.is_finite() || self.keyword_min_score <= 0.0 {
            return Err(invalid("keyword_min_score", "must be a positive number"));
        }
        if !self.synonym_bonus.is_finite() || self.synonym_bonus < 0.0 {
            return Err(invalid("synonym_bonus", "must be a non-negative number"));
        }
        if !self.levenshtein_ratio.is_finite() || self.levenshtein_ratio < 0.0 {
            return Err(invalid("levenshtein_ratio", "must be a non-negative number"));
        }
        if self.synonym_groups.iter().any(|group| group.is_empty()) {
            return Err(invalid("synonym_groups", "groups cannot be empty"));
        }
        if self.no_answer_text.trim().is_empty() {
            return Err(invalid("no_answer_text", "cannot be blank"));
        }
        if self.resolve_budget.is_some_and(|budget| budget.is_zero()) {
            return Err(invalid("resolve_budget", "must be > 0 when set"));
        }

        Ok(())
    }

    /// Every synonym, used to keep short tokens such as `job` in the keyword stage.
    pub fn synonym_vocabulary(&self) -> HashSet<String> {
        self.synonym_groups.iter().flatten().cloned().collect()
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.into(),
    }
}

fn check_unit(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, format!("{} is outside [0, 1]", value)))
    }
}

/// Parses `"exact,keyword,fuzzy"`.
pub fn parse_stage_order(value: &str) -> Result<Vec<StageKind>, String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(StageKind::from_str)
        .collect()
}

/// Parses `"email,mail;job,career"` into normalized groups, dropping empty ones.
pub fn parse_synonym_groups(value: &str) -> Vec<Vec<String>> {
    value
        .split(';')
        .map(|group| {
            group
                .split(',')
                .map(normalize)
                .filter(|word| !word.is_empty())
                .collect::<Vec<_>>()
        })
        .filter(|group| !group.is_empty())
        .collect()
}
