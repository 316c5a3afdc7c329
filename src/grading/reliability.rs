//! Reliability grader
//!
//! Estimates how well code copes with failure: whether non-trivial functions
//! handle or signal errors, whether handlers are specific, and whether
//! functions that take input guard it before use.

use crate::config::GradingConfig;
use crate::evaluation::LearningStrategy;
use crate::syntax::{FunctionUnit, HandlerKind, Language, SyntaxModel};
use crate::types::{GraderResult, GradingDimension, ImprovementSuggestion, ThresholdBands, WeightSet};

use super::aggregate::{MetricOutcome, ScoreAggregator};
use super::Grader;

pub const ERROR_HANDLING: &str = "error_handling";
pub const INPUT_VALIDATION: &str = "input_validation";

const WEIGHTS: &[(&str, f64)] = &[(ERROR_HANDLING, 0.6), (INPUT_VALIDATION, 0.4)];

const BANDS: &[(&str, f64)] = &[
    ("excellent", 95.0),
    ("good", 85.0),
    ("acceptable", 75.0),
    ("needs_improvement", 60.0),
];

/// Functions at least this long are expected to handle or raise errors
const NONTRIVIAL_LINES: usize = 5;

/// Functions shorter than this are exempt from input guards
const GUARDED_LINES: usize = 3;

/// Score floor for error handling with zero coverage
const UNCOVERED_BASE: f64 = 60.0;

/// Score floor for input validation with zero guards
const UNGUARDED_BASE: f64 = 50.0;

pub struct ReliabilityGrader {
    config: GradingConfig,
}

impl ReliabilityGrader {
    pub fn new(config: GradingConfig) -> Self {
        Self { config }
    }

    fn error_handling(&self, model: &SyntaxModel) -> MetricOutcome {
        let nontrivial: Vec<&FunctionUnit> = model
            .functions
            .iter()
            .filter(|f| f.line_span() >= NONTRIVIAL_LINES)
            .collect();
        let uncovered: Vec<&FunctionUnit> = nontrivial
            .iter()
            .copied()
            .filter(|f| !f.handles_errors && f.raise_count == 0)
            .collect();

        let score = if nontrivial.is_empty() {
            100.0
        } else {
            let coverage = 1.0 - uncovered.len() as f64 / nontrivial.len() as f64;
            UNCOVERED_BASE + (100.0 - UNCOVERED_BASE) * coverage
        };
        let mut metric = MetricOutcome::new(ERROR_HANDLING, score);

        let mut loose = 0;
        for handler in &model.handlers {
            let penalty = match handler.kind {
                HandlerKind::Bare => self.config.bare_except_penalty,
                HandlerKind::Broad => self.config.broad_except_penalty,
                HandlerKind::Specific => continue,
            };
            loose += 1;
            metric.deduct(penalty);
            metric.diagnose(handler.line, "Handler may hide unexpected failures");
        }
        if loose > 0 {
            metric.suggest(ImprovementSuggestion::new(
                ERROR_HANDLING,
                1,
                format!("Catch the specific errors you can recover from ({} handler(s) too broad)", loose),
            ));
        }

        for function in &uncovered {
            metric.diagnose(
                function.start_line,
                format!("Function '{}' neither handles nor signals errors", function.name),
            );
        }
        if !uncovered.is_empty() {
            let names: Vec<String> = uncovered.iter().map(|f| format!("'{}'", f.name)).collect();
            metric.suggest(
                ImprovementSuggestion::new(
                    ERROR_HANDLING,
                    2,
                    format!("Handle or raise errors explicitly in {}", names.join(", ")),
                )
                .with_examples(vec![
                    "try:\n    data = parse(raw)\nexcept ValueError as err:\n    raise ConfigError(str(err)) from err".to_string(),
                ]),
            );
        }

        metric
    }

    fn input_validation(&self, model: &SyntaxModel) -> MetricOutcome {
        // Python methods take their receiver explicitly
        let receiver = |f: &FunctionUnit| {
            usize::from(model.language == Language::Python && f.class_index.is_some())
        };

        let candidates: Vec<&FunctionUnit> = model
            .functions
            .iter()
            .filter(|f| !f.name.starts_with('_') && f.line_span() >= GUARDED_LINES)
            .filter(|f| f.parameter_count > receiver(f))
            .collect();

        if candidates.is_empty() {
            return MetricOutcome::new(INPUT_VALIDATION, 100.0);
        }

        let unguarded: Vec<&FunctionUnit> = candidates
            .iter()
            .copied()
            .filter(|f| !f.validates_input)
            .collect();
        let ratio = 1.0 - unguarded.len() as f64 / candidates.len() as f64;
        let mut metric = MetricOutcome::new(
            INPUT_VALIDATION,
            UNGUARDED_BASE + (100.0 - UNGUARDED_BASE) * ratio,
        );

        for function in &unguarded {
            metric.diagnose(
                function.start_line,
                format!("Function '{}' uses its inputs without checking them", function.name),
            );
        }
        if !unguarded.is_empty() {
            let names: Vec<String> = unguarded.iter().map(|f| format!("'{}'", f.name)).collect();
            metric.suggest(
                ImprovementSuggestion::new(
                    INPUT_VALIDATION,
                    2,
                    format!("Validate arguments early in {}", names.join(", ")),
                )
                .with_examples(vec![
                    "if not items:\n    raise ValueError(\"items must not be empty\")".to_string(),
                ]),
            );
        }

        metric
    }
}

impl Grader for ReliabilityGrader {
    fn dimension(&self) -> GradingDimension {
        GradingDimension::Reliability
    }

    fn default_weights(&self) -> WeightSet {
        WeightSet::from_pairs(WEIGHTS)
    }

    fn default_thresholds(&self) -> ThresholdBands {
        ThresholdBands::declared(BANDS)
    }

    fn description(&self) -> &str {
        "Error handling coverage and input validation"
    }

    fn grade(&self, model: &SyntaxModel, strategy: &LearningStrategy) -> GraderResult {
        let aggregator = ScoreAggregator::new(self.dimension(), self.default_weights(), strategy);
        if model.is_empty() {
            return aggregator.neutral(model);
        }
        aggregator.aggregate(
            model,
            vec![self.error_handling(model), self.input_validation(model)],
        )
    }
}
