//! End-to-end grading scenarios through the engine facade

mod common;

use common::{create_test_engine, nested_branches, python, DOCUMENTED, UNDOCUMENTED};
use toasty_core::types::WEIGHT_TOLERANCE;
use toasty_core::{
    EngineConfig, GradeRequest, GraderRegistry, GradingDimension, GradingError, Language, UserId,
};

#[tokio::test]
async fn test_missing_docstring_on_trivial_function() {
    let engine = create_test_engine();
    let outcome = engine.grade(python(UNDOCUMENTED, "alice")).await.unwrap();
    let result = &outcome.per_dimension[&GradingDimension::CodeQuality];

    // one docstring deduction
    assert_eq!(result.breakdown.get("structure"), Some(85.0));
    let structure = result
        .suggestions
        .iter()
        .find(|s| s.category == "structure")
        .expect("structure suggestion");
    assert!(structure.description.contains("'f'"));
    assert!(result.breakdown.line_feedback.get(1).is_some());
}

#[tokio::test]
async fn test_documented_function_scores_higher() {
    let engine = create_test_engine();
    let plain = engine.grade(python(UNDOCUMENTED, "alice")).await.unwrap();
    let documented = engine.grade(python(DOCUMENTED, "alice")).await.unwrap();
    assert!(documented.overall_score > plain.overall_score);
    assert_eq!(
        documented.per_dimension[&GradingDimension::CodeQuality]
            .breakdown
            .get("structure"),
        Some(100.0)
    );
}

#[tokio::test]
async fn test_twelve_nested_branches_exceed_complexity_ceiling() {
    let engine = create_test_engine();
    let outcome = engine.grade(python(&nested_branches(12), "alice")).await.unwrap();
    let result = &outcome.per_dimension[&GradingDimension::CodeQuality];

    let complexity = result.breakdown.get("complexity").unwrap();
    assert!(complexity < 50.0, "complexity sub-metric {}", complexity);
    assert!(result.suggestions.iter().any(|s| s.category == "complexity"));
}

#[tokio::test]
async fn test_grading_is_deterministic() {
    let engine = create_test_engine();
    let source = nested_branches(4);
    let request = python(&source, "alice").with_dimensions([
        GradingDimension::CodeQuality,
        GradingDimension::Readability,
        GradingDimension::Speed,
        GradingDimension::Reliability,
        GradingDimension::Custom("security".to_string()),
    ]);

    let first = engine.grade(request.clone()).await.unwrap();
    let second = engine.grade(request).await.unwrap();
    assert_ne!(first.grading_id, second.grading_id);
    assert_eq!(first.per_dimension, second.per_dimension);
    assert_eq!(first.overall_score.to_bits(), second.overall_score.to_bits());
}

#[tokio::test]
async fn test_overall_is_mean_of_dimensions() {
    let engine = create_test_engine();
    let outcome = engine
        .grade(python(DOCUMENTED, "alice").with_dimensions([
            GradingDimension::CodeQuality,
            GradingDimension::Speed,
        ]))
        .await
        .unwrap();
    let mean = outcome.per_dimension.values().map(|r| r.score).sum::<f64>() / 2.0;
    assert!((outcome.overall_score - mean).abs() < 1e-12);
}

#[tokio::test]
async fn test_empty_input_is_neutral() {
    let engine = create_test_engine();
    let outcome = engine.grade(python("", "alice")).await.unwrap();
    let result = &outcome.per_dimension[&GradingDimension::CodeQuality];
    assert_eq!(result.score, 50.0);
    assert!(result.breakdown.scores.values().all(|s| *s == 50.0));
    assert_eq!(result.suggestions.len(), 1);
    assert_eq!(result.suggestions[0].category, "empty_input");
}

#[tokio::test]
async fn test_typescript_and_javascript() {
    let engine = create_test_engine();
    let ts = r#"
/** Adds two numbers. */
export function add(a: number, b: number): number {
    return a + b;
}
"#;
    let outcome = engine
        .grade(GradeRequest::new(ts, Language::TypeScript, UserId::new("alice")))
        .await
        .unwrap();
    let result = &outcome.per_dimension[&GradingDimension::CodeQuality];
    assert_eq!(result.breakdown.get("structure"), Some(100.0));

    let js = "function run(input) {\n  return eval(input);\n}\n";
    let outcome = engine
        .grade(
            GradeRequest::new(js, Language::JavaScript, UserId::new("alice"))
                .with_dimension(GradingDimension::Custom("security".to_string())),
        )
        .await
        .unwrap();
    let security = &outcome.per_dimension[&GradingDimension::Custom("security".to_string())];
    assert!(security.score < 100.0);
}

#[tokio::test]
async fn test_parse_failure_has_location() {
    let engine = create_test_engine();
    let err = engine
        .grade(python("def ok():\n    return 1\n\ndef broken(:\n    pass\n", "alice"))
        .await
        .unwrap_err();
    match err {
        GradingError::ParseFailure { line, .. } => assert!(line >= 4, "line {}", line),
        other => panic!("expected parse failure, got {}", other),
    }
}

#[test]
fn test_builtin_default_weights_sum_to_one() {
    let registry = GraderRegistry::with_builtin_graders(&EngineConfig::default().grading);
    assert_eq!(registry.len(), 5);
    for grader in registry.graders() {
        let sum = grader.default_weights().sum();
        assert!(
            (sum - 1.0).abs() <= WEIGHT_TOLERANCE,
            "{} weights sum to {}",
            grader.dimension(),
            sum
        );
        assert!(grader.default_thresholds().is_strictly_decreasing());
    }
}
