use std::env;
use std::sync::Arc;
use std::time::Duration;

use serial_test::serial;

use super::config::{parse_stage_order, parse_synonym_groups};
use super::*;
use crate::bank::{BankCache, BankConfig, BankError, MockFetcher, SemanticStatus};
use crate::config::ConfigError;
use crate::embedding::MockEmbedder;
use crate::similarity::cosine_similarity;

type TestResolver = Resolver<MockFetcher, MockEmbedder>;

const OFFICE_Q: &str = "What is the office address?";
const OFFICE_A: &str = "123 Main St";

fn resolver_with(
    pairs: &[(&str, &str)],
    embedder: Option<Arc<MockEmbedder>>,
    config: PipelineConfig,
) -> TestResolver {
    let cache = BankCache::new(MockFetcher::from_pairs(pairs), embedder, BankConfig::default())
        .expect("valid bank config");
    Resolver::new(Arc::new(cache), config).expect("valid pipeline config")
}

fn resolver(pairs: &[(&str, &str)]) -> TestResolver {
    resolver_with(pairs, None, PipelineConfig::default())
}

fn only(stages: &[StageKind]) -> PipelineConfig {
    PipelineConfig {
        stage_order: stages.to_vec(),
        ..Default::default()
    }
}

fn office_embedder(query: &str, query_vector: Vec<f32>) -> Arc<MockEmbedder> {
    Arc::new(
        MockEmbedder::new(2)
            .with_vector(OFFICE_Q, vec![1.0, 0.0])
            .with_vector(query, query_vector),
    )
}

fn faq() -> Vec<(&'static str, &'static str)> {
    vec![
        (OFFICE_Q, OFFICE_A),
        ("What are your opening hours?", "09:00-17:00 on weekdays"),
        ("How do I apply for a job?", "See the careers page"),
        ("Do you ship internationally?", "Yes, to most countries"),
    ]
}

#[tokio::test]
async fn test_empty_query_is_invalid_input() {
    let resolver = resolver(&faq());

    for query in ["", "   ", "\t\n", "\u{0301}"] {
        let err = resolver.resolve(query).await.unwrap_err();
        assert!(
            matches!(err, ResolveError::InvalidInput { .. }),
            "expected invalid input for {:?}",
            query
        );
    }
    assert_eq!(resolver.cache().fetcher().call_count(), 0);
}

#[tokio::test]
async fn test_every_question_resolves_to_its_own_answer() {
    let pairs = faq();
    let resolver = resolver(&pairs);

    for (index, (question, answer)) in pairs.iter().enumerate() {
        let result = resolver.resolve(question).await.unwrap();
        assert_eq!(result.source, MatchSource::Exact);
        assert_eq!(result.answer, *answer);
        assert_eq!(result.score, Some(1.0));
        assert_eq!(result.entry_id.as_deref(), Some((index + 1).to_string().as_str()));
        assert_eq!(result.confidence, Some(Confidence::High));
    }
}

#[tokio::test]
async fn test_exact_ignores_case_whitespace_and_accents() {
    let resolver = resolver(&faq());
    let result = resolver.resolve("  WHAT is   the öffice address? ").await.unwrap();
    assert_eq!(result.source, MatchSource::Exact);
    assert_eq!(result.answer, OFFICE_A);
}

#[tokio::test]
async fn test_exact_match_skips_later_stages() {
    let embedder = Arc::new(MockEmbedder::new(2));
    let resolver = resolver_with(&faq(), Some(Arc::clone(&embedder)), PipelineConfig::default());

    let result = resolver.resolve(OFFICE_Q).await.unwrap();
    assert_eq!(result.source, MatchSource::Exact);

    // Only the bank load reached the embedder; the query was never embedded.
    assert_eq!(embedder.call_count(), 1);
    assert_eq!(embedder.embedded_count(), faq().len());
}

#[tokio::test]
async fn test_containment_first_in_bank_order_wins() {
    let resolver = resolver(&[
        ("What is the office address?", "first"),
        ("Office address and parking", "second"),
    ]);

    let result = resolver.resolve("office address").await.unwrap();
    assert_eq!(result.source, MatchSource::Exact);
    assert_eq!(result.answer, "first");
    let expected = "office address".len() as f32 / "what is the office address?".len() as f32;
    assert!((result.score.unwrap() - expected).abs() < 1e-6);
}

#[tokio::test]
async fn test_equality_beats_earlier_containment() {
    let resolver = resolver(&[
        ("Office address and parking", "containment"),
        ("Office address", "equal"),
    ]);

    let result = resolver.resolve("office address").await.unwrap();
    assert_eq!(result.answer, "equal");
    assert_eq!(result.score, Some(1.0));
}

#[tokio::test]
async fn test_short_containment_is_ignored() {
    let resolver = resolver_with(&faq(), None, only(&[StageKind::Exact]));
    let result = resolver.resolve("job").await.unwrap();
    assert_eq!(result.source, MatchSource::None);
}

#[tokio::test]
async fn test_keyword_synonym_group_match() {
    let resolver = resolver(&faq());

    let result = resolver.resolve("career opportunities").await.unwrap();
    assert_eq!(result.source, MatchSource::Keyword);
    assert_eq!(result.answer, "See the careers page");
    assert_eq!(result.score, Some(2.0));
    assert_eq!(result.confidence, Some(Confidence::Medium));
}

#[tokio::test]
async fn test_keyword_tie_goes_to_first_entry() {
    let resolver = resolver(&[
        ("Do you have parking spaces?", "first"),
        ("Where are parking spaces located?", "second"),
    ]);

    let result = resolver.resolve("spaces for parking").await.unwrap();
    assert_eq!(result.source, MatchSource::Keyword);
    assert_eq!(result.answer, "first");
}

#[tokio::test]
async fn test_single_shared_keyword_is_not_enough() {
    let resolver = resolver_with(&faq(), None, only(&[StageKind::Exact, StageKind::Keyword]));
    let result = resolver.resolve("where is your office located").await.unwrap();
    assert_eq!(result.source, MatchSource::None);
}

#[tokio::test]
async fn test_office_address_scenario() {
    let located = "where is your office located";
    let embedder = office_embedder(located, vec![0.85, (1.0f32 - 0.85 * 0.85).sqrt()]);
    let resolver = resolver_with(
        &[(OFFICE_Q, OFFICE_A)],
        Some(embedder),
        PipelineConfig::default(),
    );

    let exact = resolver.resolve("office address").await.unwrap();
    assert_eq!(exact.source, MatchSource::Exact);
    assert_eq!(exact.answer, OFFICE_A);

    let semantic = resolver.resolve(located).await.unwrap();
    assert_eq!(semantic.source, MatchSource::Semantic);
    assert_eq!(semantic.answer, OFFICE_A);
    assert!((semantic.score.unwrap() - 0.85).abs() < 1e-4);
    assert_eq!(semantic.confidence, Some(Confidence::Medium));

    let none = resolver.resolve("xyz totally unrelated").await.unwrap();
    assert_eq!(none.source, MatchSource::None);
    assert_eq!(none.answer, PipelineConfig::default().no_answer_text);
    assert!(none.matched_question.is_none());
    assert!(none.score.is_none());
}

#[tokio::test]
async fn test_semantic_floor_is_inclusive() {
    let query = "where is your office located";
    let query_vector = vec![0.6, 0.8];
    let score = cosine_similarity(&query_vector, &[1.0, 0.0]);

    let at_floor = PipelineConfig {
        stage_order: vec![StageKind::Exact, StageKind::Semantic, StageKind::Fuzzy],
        semantic_floor: score,
        semantic_direct_floor: 1.0,
        ..Default::default()
    };
    let resolver = resolver_with(
        &[(OFFICE_Q, OFFICE_A)],
        Some(office_embedder(query, query_vector.clone())),
        at_floor.clone(),
    );
    let result = resolver.resolve(query).await.unwrap();
    assert_eq!(result.source, MatchSource::Semantic);
    assert_eq!(result.score, Some(score));

    let above = PipelineConfig {
        semantic_floor: f32::from_bits(score.to_bits() + 1),
        ..at_floor
    };
    let resolver = resolver_with(
        &[(OFFICE_Q, OFFICE_A)],
        Some(office_embedder(query, query_vector)),
        above,
    );
    let result = resolver.resolve(query).await.unwrap();
    assert_eq!(result.source, MatchSource::Fuzzy);
    assert_eq!(result.answer, OFFICE_A);
}

#[tokio::test]
async fn test_semantic_direct_floor_reports_high_confidence() {
    let query = "office location";
    let resolver = resolver_with(
        &[(OFFICE_Q, OFFICE_A)],
        Some(office_embedder(query, vec![1.0, 0.0])),
        only(&[StageKind::Semantic]),
    );

    let result = resolver.resolve(query).await.unwrap();
    assert_eq!(result.source, MatchSource::Semantic);
    assert_eq!(result.confidence, Some(Confidence::High));
}

#[tokio::test]
async fn test_query_embedding_is_memoized() {
    let query = "where is your office located";
    let embedder = office_embedder(query, vec![0.9, 0.1]);
    let resolver = resolver_with(
        &[(OFFICE_Q, OFFICE_A)],
        Some(Arc::clone(&embedder)),
        only(&[StageKind::Semantic]),
    );

    resolver.resolve(query).await.unwrap();
    let calls = embedder.call_count();
    resolver.resolve("  Where is your OFFICE located ").await.unwrap();
    assert_eq!(embedder.call_count(), calls);
}

#[tokio::test]
async fn test_semantic_skipped_when_bank_embedding_failed() {
    let embedder = Arc::new(MockEmbedder::new(2));
    embedder.set_failing(true);
    let resolver = resolver_with(
        &[(OFFICE_Q, OFFICE_A)],
        Some(Arc::clone(&embedder)),
        only(&[StageKind::Semantic]),
    );

    let result = resolver.resolve("where is your office located").await.unwrap();
    assert_eq!(result.source, MatchSource::None);
    assert!(matches!(
        resolver.cache().current().unwrap().semantic(),
        SemanticStatus::Failed { .. }
    ));
    // The load attempt only; no query embedding against a degraded bank.
    assert_eq!(embedder.call_count(), 1);
}

#[tokio::test]
async fn test_semantic_skipped_on_query_embedding_failure() {
    let query = "where is your office located";
    let embedder = office_embedder(query, vec![1.0, 0.0]);
    let resolver = resolver_with(
        &[(OFFICE_Q, OFFICE_A)],
        Some(Arc::clone(&embedder)),
        PipelineConfig::default(),
    );
    resolver.cache().get().await.unwrap();

    embedder.set_failing(true);
    let result = resolver.resolve(query).await.expect("degrades, not fails");
    assert_ne!(result.source, MatchSource::Semantic);
}

#[tokio::test]
async fn test_semantic_skipped_on_dimension_mismatch() {
    let query = "where is your office located";
    let embedder = office_embedder(query, vec![1.0, 0.0, 0.0]);
    let resolver = resolver_with(
        &[(OFFICE_Q, OFFICE_A)],
        Some(embedder),
        only(&[StageKind::Semantic]),
    );

    let result = resolver.resolve(query).await.unwrap();
    assert_eq!(result.source, MatchSource::None);
}

#[tokio::test]
async fn test_semantic_stage_absent_without_embedder() {
    let resolver = resolver(&faq());
    assert_eq!(
        resolver.stage_kinds(),
        vec![StageKind::Exact, StageKind::Keyword, StageKind::Fuzzy]
    );

    let embedded = resolver_with(&faq(), Some(Arc::new(MockEmbedder::new(2))), PipelineConfig::default());
    assert_eq!(embedded.stage_kinds(), StageKind::DEFAULT_ORDER.to_vec());
}

#[tokio::test]
async fn test_fuzzy_dice_catches_typos() {
    let resolver = resolver_with(&faq(), None, only(&[StageKind::Exact, StageKind::Fuzzy]));

    let result = resolver.resolve("what are you opening hour").await.unwrap();
    assert_eq!(result.source, MatchSource::Fuzzy);
    assert_eq!(result.answer, "09:00-17:00 on weekdays");
    assert_eq!(result.confidence, Some(Confidence::Low));
    assert!(result.score.unwrap() >= PipelineConfig::default().fuzzy_floor);
}

#[tokio::test]
async fn test_fuzzy_levenshtein_tolerance() {
    let config = PipelineConfig {
        stage_order: vec![StageKind::Fuzzy],
        fuzzy_metric: FuzzyMetric::Levenshtein,
        ..Default::default()
    };
    let resolver = resolver_with(&[("Opening hours", "9-17")], None, config);

    let result = resolver.resolve("opening hourz").await.unwrap();
    assert_eq!(result.source, MatchSource::Fuzzy);
    assert!((result.score.unwrap() - (1.0 - 1.0 / 13.0)).abs() < 1e-6);

    let result = resolver.resolve("completely different").await.unwrap();
    assert_eq!(result.source, MatchSource::None);
}

#[tokio::test]
async fn test_nonsense_query_gets_canned_answer() {
    let config = PipelineConfig {
        no_answer_text: "No idea.".to_string(),
        ..Default::default()
    };
    let resolver = resolver_with(&faq(), None, config);

    let result = resolver.resolve("xyz totally unrelated").await.unwrap();
    assert_eq!(result, ResolutionResult::no_match("No idea."));
    assert!(!result.is_match());
}

#[tokio::test]
async fn test_stage_order_is_respected() {
    let resolver = resolver_with(&faq(), None, only(&[StageKind::Fuzzy, StageKind::Exact]));
    let result = resolver.resolve(OFFICE_Q).await.unwrap();
    assert_eq!(result.source, MatchSource::Fuzzy);
    assert_eq!(result.score, Some(1.0));
}

#[tokio::test]
async fn test_empty_bank_resolves_to_none() {
    let resolver = resolver(&[]);
    let result = resolver.resolve(OFFICE_Q).await.unwrap();
    assert_eq!(result.source, MatchSource::None);
}

#[tokio::test]
async fn test_fetch_failure_surfaces_as_upstream() {
    let fetcher = MockFetcher::from_pairs(&faq());
    fetcher.set_failing(true);
    let cache: BankCache<_, MockEmbedder> =
        BankCache::new(fetcher, None, BankConfig::default()).unwrap();
    let resolver = Resolver::new(Arc::new(cache), PipelineConfig::default()).unwrap();

    let err = resolver.resolve(OFFICE_Q).await.unwrap_err();
    assert!(matches!(err, ResolveError::Upstream(BankError::Fetch(_))));
}

#[tokio::test(start_paused = true)]
async fn test_budget_checked_between_stages() {
    let fetcher = MockFetcher::from_pairs(&faq());
    fetcher.set_delay(Some(Duration::from_millis(50)));
    let cache: BankCache<_, MockEmbedder> =
        BankCache::new(fetcher, None, BankConfig::default()).unwrap();
    let config = PipelineConfig {
        resolve_budget: Some(Duration::from_millis(10)),
        ..Default::default()
    };
    let resolver = Resolver::new(Arc::new(cache), config).unwrap();

    // An exact hit answers before the first budget check.
    let cold = resolver.resolve("xyz totally unrelated").await.unwrap_err();
    assert!(matches!(
        cold,
        ResolveError::BudgetExceeded { budget_ms: 10, .. }
    ));

    // Warm bank, no time passes between stages.
    let warm = resolver.resolve("xyz totally unrelated").await.unwrap();
    assert_eq!(warm.source, MatchSource::None);
}

#[test]
fn test_resolution_result_json_shape() {
    let json = serde_json::to_value(ResolutionResult::no_match("n/a")).unwrap();
    assert_eq!(json, serde_json::json!({"answer": "n/a", "source": "none"}));

    let parsed: ResolutionResult = serde_json::from_value(serde_json::json!({
        "answer": "123 Main St",
        "matched_question": OFFICE_Q,
        "score": 0.85,
        "source": "semantic",
        "entry_id": "1",
        "confidence": "medium",
    }))
    .unwrap();
    assert_eq!(parsed.source, MatchSource::Semantic);
    assert_eq!(parsed.confidence, Some(Confidence::Medium));
}

#[test]
fn test_pipeline_config_validation() {
    assert!(PipelineConfig::default().validate().is_ok());

    let invalid = [
        PipelineConfig {
            stage_order: vec![],
            ..Default::default()
        },
        PipelineConfig {
            stage_order: vec![StageKind::Exact, StageKind::Fuzzy, StageKind::Exact],
            ..Default::default()
        },
        PipelineConfig {
            semantic_floor: 1.2,
            ..Default::default()
        },
        PipelineConfig {
            semantic_floor: 0.95,
            semantic_direct_floor: 0.9,
            ..Default::default()
        },
        PipelineConfig {
            fuzzy_floor: f32::NAN,
            ..Default::default()
        },
        PipelineConfig {
            keyword_min_score: 0.0,
            ..Default::default()
        },
        PipelineConfig {
            no_answer_text: "  ".to_string(),
            ..Default::default()
        },
        PipelineConfig {
            resolve_budget: Some(Duration::ZERO),
            ..Default::default()
        },
    ];

    for config in invalid {
        assert!(
            matches!(config.validate(), Err(ConfigError::InvalidValue { .. })),
            "expected rejection of {:?}",
            config
        );
    }
}

#[test]
fn test_parse_stage_order() {
    assert_eq!(
        parse_stage_order("exact, Fuzzy").unwrap(),
        vec![StageKind::Exact, StageKind::Fuzzy]
    );
    assert!(parse_stage_order("exact,telepathy").is_err());
    assert!(parse_stage_order("").unwrap().is_empty());
}

#[test]
fn test_parse_synonym_groups() {
    assert_eq!(
        parse_synonym_groups("E-mail, Mail ;; job,  Jobb ;"),
        vec![
            vec!["e-mail".to_string(), "mail".to_string()],
            vec!["job".to_string(), "jobb".to_string()],
        ]
    );
}

fn with_env_vars<F, R>(vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    // SAFETY: Test code only, serialized with #[serial].
    for (key, value) in vars {
        unsafe { env::set_var(key, value) };
    }

    let result = f();

    // SAFETY: Test code only, serialized with #[serial].
    for (key, _) in vars {
        unsafe { env::remove_var(key) };
    }

    result
}

#[test]
#[serial]
fn test_pipeline_config_from_env() {
    let config = with_env_vars(
        &[
            ("FAQ_STAGE_ORDER", "exact,semantic"),
            ("FAQ_SEMANTIC_FLOOR", "0.7"),
            ("FAQ_FUZZY_METRIC", "levenshtein"),
            ("FAQ_SYNONYM_GROUPS", "refund,return"),
            ("FAQ_RESOLVE_BUDGET_MS", "250"),
            ("FAQ_NO_ANSWER_TEXT", "Ask a human."),
        ],
        PipelineConfig::from_env,
    )
    .unwrap();

    assert_eq!(config.stage_order, vec![StageKind::Exact, StageKind::Semantic]);
    assert_eq!(config.semantic_floor, 0.7);
    assert_eq!(config.fuzzy_metric, FuzzyMetric::Levenshtein);
    assert_eq!(config.synonym_groups, vec![vec!["refund".to_string(), "return".to_string()]]);
    assert_eq!(config.resolve_budget, Some(Duration::from_millis(250)));
    assert_eq!(config.no_answer_text, "Ask a human.");
}

#[test]
#[serial]
fn test_pipeline_config_from_env_defaults() {
    let config = PipelineConfig::from_env().unwrap();
    assert_eq!(config, PipelineConfig::default());
}

#[test]
#[serial]
fn test_pipeline_config_from_env_rejects_bad_values() {
    let result = with_env_vars(&[("FAQ_SEMANTIC_FLOOR", "high")], PipelineConfig::from_env);
    assert!(matches!(result, Err(ConfigError::ParseError { name: "FAQ_SEMANTIC_FLOOR", .. })));

    let result = with_env_vars(&[("FAQ_STAGE_ORDER", "fuzzy,fuzzy")], PipelineConfig::from_env);
    assert!(matches!(result, Err(ConfigError::InvalidValue { field: "stage_order", .. })));

    let result = with_env_vars(&[("FAQ_FUZZY_METRIC", "soundex")], PipelineConfig::from_env);
    assert!(matches!(result, Err(ConfigError::ParseError { .. })));
}
