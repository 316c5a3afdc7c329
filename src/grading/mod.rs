//! Grader capability and registration table
//!
//! Every scoring strategy implements [`Grader`]. Graders are registered once,
//! keyed by the dimension they serve, before the engine starts handling
//! requests; lookups afterwards are read-only.
//!
//! # Built-in graders
//!
//! | Dimension      | Grader              | Sub-metrics                                         |
//! |----------------|---------------------|-----------------------------------------------------|
//! | `code_quality` | [`StructuralGrader`] | structure, readability, best_practices, complexity |
//! | `readability`  | [`StructuralGrader`] | same, readability-weighted                         |
//! | `speed`        | [`SpeedGrader`]      | loop_nesting, function_length                      |
//! | `reliability`  | [`ReliabilityGrader`]| error_handling, input_validation                   |
//! | `security`     | [`SecurityGrader`]   | dangerous_calls, secrets                           |

pub mod aggregate;
pub mod reliability;
pub mod security;
pub mod speed;
pub mod structural;

pub use aggregate::{MetricOutcome, ScoreAggregator};
pub use reliability::ReliabilityGrader;
pub use security::SecurityGrader;
pub use speed::SpeedGrader;
pub use structural::StructuralGrader;

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::config::GradingConfig;
use crate::error::{GradingError, Result};
use crate::evaluation::LearningStrategy;
use crate::syntax::SyntaxModel;
use crate::types::{GraderResult, GradingDimension, ThresholdBands, WeightSet};

/// Uniform contract every scoring strategy implements
///
/// `grade` must be pure: the same model and strategy always produce the same
/// result.
pub trait Grader: Send + Sync {
    /// Constant identity of this grader
    fn dimension(&self) -> GradingDimension;

    /// Declared weights, summing to 1.0
    fn default_weights(&self) -> WeightSet;

    /// Declared bands, strictly decreasing
    fn default_thresholds(&self) -> ThresholdBands;

    /// One-line description shown by `toasty dimensions`
    fn description(&self) -> &str {
        ""
    }

    fn grade(&self, model: &SyntaxModel, strategy: &LearningStrategy) -> GraderResult;
}

/// Registration table keyed by dimension
#[derive(Default, Clone)]
pub struct GraderRegistry {
    graders: BTreeMap<GradingDimension, Arc<dyn Grader>>,
}

impl GraderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in grader
    pub fn with_builtin_graders(config: &GradingConfig) -> Self {
        let builtins: Vec<Arc<dyn Grader>> = vec![
            Arc::new(StructuralGrader::code_quality(config.clone())),
            Arc::new(StructuralGrader::readability(config.clone())),
            Arc::new(SpeedGrader::new(config.clone())),
            Arc::new(ReliabilityGrader::new(config.clone())),
            Arc::new(SecurityGrader::new()),
        ];

        let mut registry = Self::new();
        for grader in builtins {
            registry.graders.insert(grader.dimension(), grader);
        }
        registry
    }

    /// Register a grader; a dimension can be claimed only once
    pub fn register(&mut self, grader: Arc<dyn Grader>) -> Result<()> {
        let dimension = grader.dimension();
        if self.graders.contains_key(&dimension) {
            return Err(GradingError::DuplicateGrader(dimension.to_string()));
        }
        debug!("Registered grader for dimension {}", dimension);
        self.graders.insert(dimension, grader);
        Ok(())
    }

    pub fn get(&self, dimension: &GradingDimension) -> Option<Arc<dyn Grader>> {
        self.graders.get(dimension).cloned()
    }

    pub fn contains(&self, dimension: &GradingDimension) -> bool {
        self.graders.contains_key(dimension)
    }

    pub fn dimensions(&self) -> Vec<GradingDimension> {
        self.graders.keys().cloned().collect()
    }

    pub fn graders(&self) -> impl Iterator<Item = &Arc<dyn Grader>> {
        self.graders.values()
    }

    pub fn len(&self) -> usize {
        self.graders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graders.is_empty()
    }
}

impl std::fmt::Debug for GraderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraderRegistry")
            .field("dimensions", &self.dimensions())
            .finish()
    }
}
