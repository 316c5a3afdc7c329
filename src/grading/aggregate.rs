//! Score aggregation
//!
//! Turns the raw sub-metric measurements of one grader into a
//! [`GraderResult`]: weighted overall score, band label, line diagnostics and
//! ranked suggestions, rendered at the strategy's feedback level.

use serde_json::json;
use std::collections::BTreeMap;

use crate::evaluation::LearningStrategy;
use crate::syntax::SyntaxModel;
use crate::types::{
    FeedbackLevel, GraderResult, GradingDimension, ImprovementSuggestion, LineDiagnostics,
    ScoreBreakdown, WeightSet,
};

/// Score given to every sub-metric of a structurally empty input
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Suggestion category for structurally empty input
pub const EMPTY_INPUT: &str = "empty_input";

/// Suggestions kept at `FeedbackLevel::Minimal`
const MINIMAL_SUGGESTIONS: usize = 3;

/// Measurement of one sub-metric
#[derive(Debug, Clone, PartialEq)]
pub struct MetricOutcome {
    pub name: String,
    /// Clamped to [0, 100]
    pub score: f64,
    pub diagnostics: Vec<(usize, String)>,
    pub suggestions: Vec<ImprovementSuggestion>,
}

impl MetricOutcome {
    pub fn new(name: impl Into<String>, score: f64) -> Self {
        Self {
            name: name.into(),
            score: score.clamp(0.0, 100.0),
            diagnostics: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    /// Deduct points, flooring at zero
    pub fn deduct(&mut self, points: f64) {
        self.score = (self.score - points).clamp(0.0, 100.0);
    }

    pub fn diagnose(&mut self, line: usize, message: impl Into<String>) {
        self.diagnostics.push((line, message.into()));
    }

    pub fn suggest(&mut self, suggestion: ImprovementSuggestion) {
        self.suggestions.push(suggestion);
    }
}

/// Combines sub-metrics under one strategy
pub struct ScoreAggregator<'a> {
    dimension: GradingDimension,
    defaults: WeightSet,
    strategy: &'a LearningStrategy,
}

impl<'a> ScoreAggregator<'a> {
    pub fn new(
        dimension: GradingDimension,
        defaults: WeightSet,
        strategy: &'a LearningStrategy,
    ) -> Self {
        Self {
            dimension,
            defaults,
            strategy,
        }
    }

    /// Build the result from metrics listed in evaluation order
    pub fn aggregate(&self, model: &SyntaxModel, metrics: Vec<MetricOutcome>) -> GraderResult {
        let mut scores = BTreeMap::new();
        let mut line_feedback = LineDiagnostics::new();
        let mut suggestions = Vec::new();

        for metric in metrics {
            for (line, message) in metric.diagnostics {
                line_feedback.insert(line, message);
            }
            suggestions.extend(metric.suggestions);
            scores.insert(metric.name, metric.score);
        }

        // Stable: equal priorities keep evaluation order
        suggestions.sort_by_key(|s| s.priority);

        self.finish(model, scores, line_feedback, suggestions)
    }

    /// Neutral result for input with nothing to grade
    pub fn neutral(&self, model: &SyntaxModel) -> GraderResult {
        let scores = self
            .defaults
            .0
            .keys()
            .map(|metric| (metric.clone(), NEUTRAL_SCORE))
            .collect();
        let suggestion = ImprovementSuggestion::new(
            EMPTY_INPUT,
            1,
            "No functions, classes or executable lines were found to grade",
        );
        self.finish(model, scores, LineDiagnostics::new(), vec![suggestion])
    }

    fn weight(&self, metric: &str) -> f64 {
        self.strategy.weight_or(metric, &self.defaults)
    }

    fn finish(
        &self,
        model: &SyntaxModel,
        scores: BTreeMap<String, f64>,
        mut line_feedback: LineDiagnostics,
        mut suggestions: Vec<ImprovementSuggestion>,
    ) -> GraderResult {
        let contributions: BTreeMap<String, f64> = scores
            .iter()
            .map(|(metric, score)| (metric.clone(), self.weight(metric) * score))
            .collect();
        let score = contributions.values().sum::<f64>().clamp(0.0, 100.0);
        let rating = self.strategy.thresholds.rate(score).to_string();
        let level = self.strategy.feedback_level;

        match level {
            FeedbackLevel::Minimal => {
                suggestions.truncate(MINIMAL_SUGGESTIONS);
                suggestions.iter_mut().for_each(|s| s.examples.clear());
                line_feedback.clear();
            }
            FeedbackLevel::Standard => {
                suggestions.iter_mut().for_each(|s| s.examples.clear());
            }
            FeedbackLevel::Detailed | FeedbackLevel::Expert => {}
        }

        let mut metadata = BTreeMap::new();
        metadata.insert("language".to_string(), json!(model.language.as_str()));
        metadata.insert("line_count".to_string(), json!(model.line_count));
        metadata.insert("rating".to_string(), json!(rating));
        metadata.insert("feedback_level".to_string(), json!(level.to_string()));
        if level == FeedbackLevel::Expert {
            metadata.insert("contributions".to_string(), json!(contributions));
            metadata.insert("weights".to_string(), json!(self.strategy.weights));
        }

        GraderResult {
            dimension: self.dimension.clone(),
            score,
            rating,
            breakdown: ScoreBreakdown {
                scores,
                line_feedback,
            },
            suggestions,
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GradingConfig;
    use crate::grading::{Grader, StructuralGrader};
    use crate::syntax::{build_model, Language};
    use crate::types::UserId;

    fn fixture(level: FeedbackLevel) -> (StructuralGrader, LearningStrategy) {
        let grader = StructuralGrader::code_quality(GradingConfig::default());
        let mut strategy = LearningStrategy::from_grader(UserId::new("u"), &grader, 0.5);
        strategy.feedback_level = level;
        (grader, strategy)
    }

    fn metrics() -> Vec<MetricOutcome> {
        let mut structure = MetricOutcome::new("structure", 70.0);
        structure.diagnose(3, "first");
        structure.diagnose(3, "second");
        structure.diagnose(1, "third");
        for (priority, name) in [(2, "a"), (2, "b"), (1, "c")] {
            structure.suggest(
                ImprovementSuggestion::new("structure", priority, name)
                    .with_examples(vec!["example".to_string()]),
            );
        }
        let mut readability = MetricOutcome::new("readability", 90.0);
        readability.suggest(ImprovementSuggestion::new("readability", 1, "d"));
        vec![
            structure,
            readability,
            MetricOutcome::new("best_practices", 100.0),
            MetricOutcome::new("complexity", 100.0),
        ]
    }

    #[test]
    fn test_weighted_sum_and_rating() {
        let (grader, strategy) = fixture(FeedbackLevel::Detailed);
        let model = build_model("x = 1\n", Language::Python).unwrap();
        let aggregator =
            ScoreAggregator::new(grader.dimension(), grader.default_weights(), &strategy);
        let result = aggregator.aggregate(&model, metrics());

        let expected = 0.25 * 70.0 + 0.25 * 90.0 + 0.30 * 100.0 + 0.20 * 100.0;
        assert!((result.score - expected).abs() < 1e-9);
        assert_eq!(result.rating, "excellent");
        assert_eq!(result.metadata["rating"], json!("excellent"));
    }

    #[test]
    fn test_suggestion_order_and_diagnostics() {
        let (grader, strategy) = fixture(FeedbackLevel::Detailed);
        let model = build_model("x = 1\n", Language::Python).unwrap();
        let aggregator =
            ScoreAggregator::new(grader.dimension(), grader.default_weights(), &strategy);
        let result = aggregator.aggregate(&model, metrics());

        let order: Vec<&str> = result
            .suggestions
            .iter()
            .map(|s| s.description.as_str())
            .collect();
        assert_eq!(order, vec!["c", "d", "a", "b"]);

        let lines: Vec<(usize, &str)> = result
            .breakdown
            .line_feedback
            .iter()
            .map(|d| (d.line, d.message.as_str()))
            .collect();
        assert_eq!(lines, vec![(3, "second"), (1, "third")]);
        assert!(!result.suggestions[0].examples.is_empty());
    }

    #[test]
    fn test_minimal_rendering() {
        let (grader, strategy) = fixture(FeedbackLevel::Minimal);
        let model = build_model("x = 1\n", Language::Python).unwrap();
        let aggregator =
            ScoreAggregator::new(grader.dimension(), grader.default_weights(), &strategy);
        let result = aggregator.aggregate(&model, metrics());

        assert_eq!(result.suggestions.len(), 3);
        assert!(result.suggestions.iter().all(|s| s.examples.is_empty()));
        assert!(result.breakdown.line_feedback.is_empty());
    }

    #[test]
    fn test_expert_metadata() {
        let (grader, strategy) = fixture(FeedbackLevel::Expert);
        let model = build_model("x = 1\n", Language::Python).unwrap();
        let aggregator =
            ScoreAggregator::new(grader.dimension(), grader.default_weights(), &strategy);
        let result = aggregator.aggregate(&model, metrics());

        assert!(result.metadata.contains_key("contributions"));
        assert_eq!(result.metadata["feedback_level"], json!("expert"));
    }

    #[test]
    fn test_neutral_result() {
        let (grader, strategy) = fixture(FeedbackLevel::Standard);
        let model = build_model("", Language::Python).unwrap();
        let aggregator =
            ScoreAggregator::new(grader.dimension(), grader.default_weights(), &strategy);
        let result = aggregator.neutral(&model);

        assert!((result.score - NEUTRAL_SCORE).abs() < 1e-9);
        assert_eq!(result.suggestions.len(), 1);
        assert_eq!(result.suggestions[0].category, EMPTY_INPUT);
        assert!(result.breakdown.scores.values().all(|s| *s == NEUTRAL_SCORE));
        assert_eq!(result.breakdown.scores.len(), 4);
    }
}
