//! Structural code-quality grader
//!
//! Scores four sub-metrics from the syntax model:
//!
//! - **structure**: 100 minus a fixed deduction per undocumented function or
//!   class and a per-unit deduction for complexity above the ceiling
//! - **readability**: base 80, plus a comment bonus proportional to the
//!   comment-to-code ratio (capped), minus deductions for long lines and
//!   one-character identifiers (loop counters excluded)
//! - **best_practices**: 100 minus deductions for bare/broad handlers,
//!   wildcard imports and mutable default arguments
//! - **complexity**: 100 for trivial functions, falling linearly to 50 at the
//!   complexity ceiling and to 0 at twice the ceiling
//!
//! The same grader serves `readability` with a readability-heavy weighting.

use crate::config::GradingConfig;
use crate::evaluation::LearningStrategy;
use crate::syntax::{HandlerKind, SyntaxModel};
use crate::types::{GraderResult, GradingDimension, ImprovementSuggestion, ThresholdBands, WeightSet};

use super::aggregate::{MetricOutcome, ScoreAggregator};
use super::Grader;

pub const STRUCTURE: &str = "structure";
pub const READABILITY: &str = "readability";
pub const BEST_PRACTICES: &str = "best_practices";
pub const COMPLEXITY: &str = "complexity";

const CODE_QUALITY_WEIGHTS: &[(&str, f64)] = &[
    (STRUCTURE, 0.25),
    (READABILITY, 0.25),
    (BEST_PRACTICES, 0.30),
    (COMPLEXITY, 0.20),
];

const READABILITY_WEIGHTS: &[(&str, f64)] = &[
    (STRUCTURE, 0.15),
    (READABILITY, 0.55),
    (BEST_PRACTICES, 0.15),
    (COMPLEXITY, 0.15),
];

const BANDS: &[(&str, f64)] = &[
    ("excellent", 85.0),
    ("good", 75.0),
    ("acceptable", 65.0),
    ("needs_improvement", 50.0),
];

/// Readability score before comment bonus and deductions
const READABILITY_BASE: f64 = 80.0;

/// Single-character names that are conventional anywhere
const CONVENTIONAL_SHORT_NAMES: &[&str] = &["i", "j", "k", "_"];

/// Parameter count above which a signature is flagged
const MAX_PARAMETERS: usize = 5;

/// Names listed in one grouped suggestion
const LISTED_NAMES: usize = 5;

pub struct StructuralGrader {
    dimension: GradingDimension,
    weights: &'static [(&'static str, f64)],
    config: GradingConfig,
}

impl StructuralGrader {
    pub fn code_quality(config: GradingConfig) -> Self {
        Self {
            dimension: GradingDimension::CodeQuality,
            weights: CODE_QUALITY_WEIGHTS,
            config,
        }
    }

    pub fn readability(config: GradingConfig) -> Self {
        Self {
            dimension: GradingDimension::Readability,
            weights: READABILITY_WEIGHTS,
            config,
        }
    }

    fn structure(&self, model: &SyntaxModel) -> MetricOutcome {
        let mut metric = MetricOutcome::new(STRUCTURE, 100.0);
        let mut undocumented = Vec::new();

        for function in model.functions.iter().filter(|f| !f.has_docstring) {
            metric.deduct(self.config.docstring_penalty);
            metric.diagnose(
                function.start_line,
                format!("Function '{}' is missing a docstring", function.name),
            );
            undocumented.push(format!("'{}' (line {})", function.name, function.start_line));
        }
        for class in model.classes.iter().filter(|c| !c.has_docstring) {
            metric.deduct(self.config.docstring_penalty);
            metric.diagnose(
                class.start_line,
                format!("Class '{}' is missing a docstring", class.name),
            );
            undocumented.push(format!("'{}' (line {})", class.name, class.start_line));
        }

        let ceiling = self.config.complexity_ceiling;
        for function in model.functions.iter().filter(|f| f.complexity() > ceiling) {
            let excess = function.complexity() - ceiling;
            metric.deduct(excess as f64 * self.config.complexity_excess_penalty);
            metric.diagnose(
                function.start_line,
                format!(
                    "Function '{}' has complexity {} (ceiling {})",
                    function.name,
                    function.complexity(),
                    ceiling
                ),
            );
        }

        if !undocumented.is_empty() {
            let example = match model.functions.iter().find(|f| !f.has_docstring) {
                Some(f) => format!(
                    "def {}(...):\n    \"\"\"Describe what {} does.\"\"\"",
                    f.name, f.name
                ),
                None => "Add a short summary as the first statement of the body".to_string(),
            };
            metric.suggest(
                ImprovementSuggestion::new(
                    STRUCTURE,
                    2,
                    format!("Add docstrings to: {}", list_names(&undocumented)),
                )
                .with_examples(vec![example]),
            );
        }

        metric
    }

    fn readability_metric(&self, model: &SyntaxModel) -> MetricOutcome {
        let config = &self.config;
        let ratio = model.comment_ratio();
        let bonus = (ratio / config.comment_ratio_cap * config.comment_bonus).min(config.comment_bonus);
        let mut metric = MetricOutcome::new(READABILITY, READABILITY_BASE + bonus);

        let mut long_lines = 0;
        for (index, length) in model.line_lengths.iter().enumerate() {
            if *length > config.max_line_length {
                long_lines += 1;
                metric.deduct(config.long_line_penalty);
                metric.diagnose(
                    index + 1,
                    format!("Line is {} characters (max {})", length, config.max_line_length),
                );
            }
        }

        let mut short_names: Vec<&str> = Vec::new();
        for binding in &model.bindings {
            let name = binding.name.as_str();
            if binding.loop_counter
                || name.chars().count() >= 2
                || CONVENTIONAL_SHORT_NAMES.contains(&name)
                || short_names.contains(&name)
            {
                continue;
            }
            short_names.push(name);
            metric.deduct(config.short_identifier_penalty);
            metric.diagnose(binding.line, format!("Identifier '{}' is too short", name));
        }

        if !short_names.is_empty() {
            let names: Vec<String> = short_names.iter().map(|n| format!("'{}'", n)).collect();
            metric.suggest(
                ImprovementSuggestion::new(
                    READABILITY,
                    2,
                    format!("Use descriptive names instead of {}", list_names(&names)),
                )
                .with_examples(vec!["total_price = price * quantity".to_string()]),
            );
        }
        if long_lines > 0 {
            metric.suggest(ImprovementSuggestion::new(
                READABILITY,
                3,
                format!(
                    "Wrap {} line(s) longer than {} characters",
                    long_lines, config.max_line_length
                ),
            ));
        }
        if ratio < config.comment_ratio_cap && !model.functions.is_empty() {
            metric.suggest(
                ImprovementSuggestion::new(
                    READABILITY,
                    3,
                    "Add comments explaining intent for non-obvious logic",
                )
                .with_examples(vec!["# Retry once: the upstream cache is eventually consistent".to_string()]),
            );
        }

        metric
    }

    fn best_practices(&self, model: &SyntaxModel) -> MetricOutcome {
        let config = &self.config;
        let mut metric = MetricOutcome::new(BEST_PRACTICES, 100.0);

        let mut bare = 0;
        let mut broad = 0;
        for handler in &model.handlers {
            match handler.kind {
                HandlerKind::Bare => {
                    bare += 1;
                    metric.deduct(config.bare_except_penalty);
                    metric.diagnose(handler.line, "Bare exception handler catches everything");
                }
                HandlerKind::Broad => {
                    broad += 1;
                    metric.deduct(config.broad_except_penalty);
                    metric.diagnose(handler.line, "Overly broad exception handler");
                }
                HandlerKind::Specific => {}
            }
        }
        if bare > 0 {
            metric.suggest(
                ImprovementSuggestion::new(
                    BEST_PRACTICES,
                    1,
                    format!("Replace {} bare exception handler(s) with specific exception types", bare),
                )
                .with_examples(vec!["except (ValueError, KeyError) as err:".to_string()]),
            );
        }
        if broad > 0 {
            metric.suggest(ImprovementSuggestion::new(
                BEST_PRACTICES,
                2,
                format!("Narrow {} broad exception handler(s) to the errors you expect", broad),
            ));
        }

        let wildcards: Vec<String> = model
            .imports
            .iter()
            .filter(|i| i.wildcard)
            .map(|i| format!("'{}'", i.module))
            .collect();
        for import in model.imports.iter().filter(|i| i.wildcard) {
            metric.deduct(config.wildcard_import_penalty);
            metric.diagnose(import.line, format!("Wildcard import from '{}'", import.module));
        }
        if !wildcards.is_empty() {
            metric.suggest(ImprovementSuggestion::new(
                BEST_PRACTICES,
                2,
                format!("Import names explicitly from {}", list_names(&wildcards)),
            ));
        }

        let mut mutable = Vec::new();
        for function in &model.functions {
            for param in &function.mutable_defaults {
                metric.deduct(config.mutable_default_penalty);
                metric.diagnose(
                    function.start_line,
                    format!("Parameter '{}' of '{}' has a mutable default", param, function.name),
                );
                mutable.push(format!("'{}' in '{}'", param, function.name));
            }
        }
        if !mutable.is_empty() {
            metric.suggest(
                ImprovementSuggestion::new(
                    BEST_PRACTICES,
                    1,
                    format!("Default to None instead of a shared mutable value: {}", list_names(&mutable)),
                )
                .with_examples(vec![
                    "def add(item, items=None):\n    items = [] if items is None else items".to_string(),
                ]),
            );
        }

        let wide: Vec<String> = model
            .functions
            .iter()
            .filter(|f| f.parameter_count > MAX_PARAMETERS)
            .map(|f| format!("'{}' ({} parameters)", f.name, f.parameter_count))
            .collect();
        if !wide.is_empty() {
            metric.suggest(ImprovementSuggestion::new(
                BEST_PRACTICES,
                3,
                format!("Group related parameters into an object: {}", list_names(&wide)),
            ));
        }

        metric
    }

    fn complexity(&self, model: &SyntaxModel) -> MetricOutcome {
        let ceiling = self.config.complexity_ceiling;
        let score = match model.average_complexity() {
            Some(average) => complexity_score(average, ceiling as f64),
            None => 100.0,
        };
        let mut metric = MetricOutcome::new(COMPLEXITY, score);

        let complex: Vec<String> = model
            .functions
            .iter()
            .filter(|f| f.complexity() > ceiling)
            .map(|f| format!("'{}' (complexity {})", f.name, f.complexity()))
            .collect();
        if !complex.is_empty() {
            metric.suggest(
                ImprovementSuggestion::new(
                    COMPLEXITY,
                    1,
                    format!("Reduce complexity in: {}", list_names(&complex)),
                )
                .with_examples(vec![
                    "Extract each branch into a well-named helper function".to_string(),
                    "Replace nested conditionals with early returns".to_string(),
                ]),
            );
        } else if metric.score < 75.0 {
            metric.suggest(ImprovementSuggestion::new(
                COMPLEXITY,
                2,
                "Break long decision chains into smaller functions",
            ));
        }

        metric
    }
}

/// Map average complexity to [0, 100]
///
/// 100 at complexity 1, 50 at the ceiling, 0 at twice the ceiling.
pub fn complexity_score(average: f64, ceiling: f64) -> f64 {
    if average <= 1.0 {
        100.0
    } else if average <= ceiling {
        100.0 - 50.0 * (average - 1.0) / (ceiling - 1.0)
    } else {
        (50.0 - 50.0 * (average - ceiling) / ceiling).max(0.0)
    }
}

/// Comma-separated list, truncated with a count of the rest
fn list_names(names: &[String]) -> String {
    let shown = names
        .iter()
        .take(LISTED_NAMES)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    if names.len() > LISTED_NAMES {
        format!("{} and {} more", shown, names.len() - LISTED_NAMES)
    } else {
        shown
    }
}

impl Grader for StructuralGrader {
    fn dimension(&self) -> GradingDimension {
        self.dimension.clone()
    }

    fn default_weights(&self) -> WeightSet {
        WeightSet::from_pairs(self.weights)
    }

    fn default_thresholds(&self) -> ThresholdBands {
        ThresholdBands::declared(BANDS)
    }

    fn description(&self) -> &str {
        match self.dimension {
            GradingDimension::Readability => "Structural analysis weighted toward naming, line length and comments",
            _ => "Structure, readability, best practices and cyclomatic complexity",
        }
    }

    fn grade(&self, model: &SyntaxModel, strategy: &LearningStrategy) -> GraderResult {
        let aggregator = ScoreAggregator::new(self.dimension(), self.default_weights(), strategy);
        if model.is_empty() {
            return aggregator.neutral(model);
        }

        let metrics = vec![
            self.structure(model),
            self.readability_metric(model),
            self.best_practices(model),
            self.complexity(model),
        ];
        aggregator.aggregate(model, metrics)
    }
}
