//! Static performance estimate
//!
//! Without executing anything, flags the two shapes that most often make
//! code slow to run or to read: deeply nested loops and very long functions.

use crate::config::GradingConfig;
use crate::evaluation::LearningStrategy;
use crate::syntax::SyntaxModel;
use crate::types::{GraderResult, GradingDimension, ImprovementSuggestion, ThresholdBands, WeightSet};

use super::aggregate::{MetricOutcome, ScoreAggregator};
use super::Grader;

pub const LOOP_NESTING: &str = "loop_nesting";
pub const FUNCTION_LENGTH: &str = "function_length";

const WEIGHTS: &[(&str, f64)] = &[(LOOP_NESTING, 0.6), (FUNCTION_LENGTH, 0.4)];

const BANDS: &[(&str, f64)] = &[
    ("excellent", 85.0),
    ("good", 70.0),
    ("acceptable", 55.0),
    ("slow", 40.0),
];

/// Deduction per loop level beyond the first
const NESTED_LOOP_PENALTY: f64 = 15.0;

/// Deduction per over-long function, plus a per-line share of the excess
const LONG_FUNCTION_PENALTY: f64 = 10.0;
const EXCESS_LINE_PENALTY: f64 = 0.2;
const MAX_LONG_FUNCTION_PENALTY: f64 = 25.0;

pub struct SpeedGrader {
    config: GradingConfig,
}

impl SpeedGrader {
    pub fn new(config: GradingConfig) -> Self {
        Self { config }
    }

    fn loop_nesting(&self, model: &SyntaxModel) -> MetricOutcome {
        let mut metric = MetricOutcome::new(LOOP_NESTING, 100.0);

        for function in model.functions.iter().filter(|f| f.loop_depth >= 2) {
            metric.deduct(NESTED_LOOP_PENALTY * (function.loop_depth - 1) as f64);
            metric.diagnose(
                function.start_line,
                format!(
                    "Function '{}' nests loops {} deep",
                    function.name, function.loop_depth
                ),
            );
            let priority = if function.loop_depth >= 3 { 1 } else { 2 };
            metric.suggest(
                ImprovementSuggestion::new(
                    LOOP_NESTING,
                    priority,
                    format!(
                        "'{}' runs {} nested loops; consider a lookup table or a single pass",
                        function.name, function.loop_depth
                    ),
                )
                .with_examples(vec![
                    "index = {item.key: item for item in items}".to_string(),
                ]),
            );
        }

        metric
    }

    fn function_length(&self, model: &SyntaxModel) -> MetricOutcome {
        let limit = self.config.max_function_lines;
        let mut metric = MetricOutcome::new(FUNCTION_LENGTH, 100.0);

        for function in model.functions.iter().filter(|f| f.line_span() > limit) {
            let excess = (function.line_span() - limit) as f64;
            let penalty = (LONG_FUNCTION_PENALTY + excess * EXCESS_LINE_PENALTY)
                .min(MAX_LONG_FUNCTION_PENALTY);
            metric.deduct(penalty);
            metric.diagnose(
                function.start_line,
                format!(
                    "Function '{}' spans {} lines (max {})",
                    function.name,
                    function.line_span(),
                    limit
                ),
            );
            metric.suggest(ImprovementSuggestion::new(
                FUNCTION_LENGTH,
                2,
                format!("Split '{}' into smaller functions", function.name),
            ));
        }

        metric
    }
}

impl Grader for SpeedGrader {
    fn dimension(&self) -> GradingDimension {
        GradingDimension::Speed
    }

    fn default_weights(&self) -> WeightSet {
        WeightSet::from_pairs(WEIGHTS)
    }

    fn default_thresholds(&self) -> ThresholdBands {
        ThresholdBands::declared(BANDS)
    }

    fn description(&self) -> &str {
        "Static performance estimate from loop nesting and function length"
    }

    fn grade(&self, model: &SyntaxModel, strategy: &LearningStrategy) -> GraderResult {
        let aggregator = ScoreAggregator::new(self.dimension(), self.default_weights(), strategy);
        if model.is_empty() {
            return aggregator.neutral(model);
        }
        aggregator.aggregate(model, vec![self.loop_nesting(model), self.function_length(model)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{build_model, Language};
    use crate::types::UserId;

    fn grade(source: &str) -> GraderResult {
        let grader = SpeedGrader::new(GradingConfig::default());
        let strategy = LearningStrategy::from_grader(UserId::new("u"), &grader, 0.5);
        let model = build_model(source, Language::Python).unwrap();
        grader.grade(&model, &strategy)
    }

    #[test]
    fn test_nested_loops_penalised() {
        let source = r#"
def pairs(xs, ys, zs):
    for x in xs:
        for y in ys:
            for z in zs:
                print(x, y, z)
"#;
        let result = grade(source);
        assert_eq!(result.breakdown.get(LOOP_NESTING), Some(70.0));
        assert_eq!(result.breakdown.get(FUNCTION_LENGTH), Some(100.0));
        assert_eq!(result.suggestions[0].priority, 1);
    }

    #[test]
    fn test_flat_code_scores_full() {
        let result = grade("def f(xs):\n    return sum(xs)\n");
        assert_eq!(result.score, 100.0);
        assert_eq!(result.rating, "excellent");
        assert!(result.suggestions.is_empty());
    }

    #[test]
    fn test_long_function_penalised() {
        let body: String = (0..60).map(|n| format!("    value_{} = {}\n", n, n)).collect();
        let source = format!("def long_one():\n{}", body);
        let result = grade(&source);
        // 61 lines, 11 over: 10 + 2.2
        let score = result.breakdown.get(FUNCTION_LENGTH).unwrap();
        assert!(score < 90.0 && score > 85.0, "got {}", score);
        assert_eq!(result.suggestions[0].category, FUNCTION_LENGTH);
    }
}
