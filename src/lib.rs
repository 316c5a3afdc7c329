//! ToastyAnalytics - Adaptive Code-Quality Grading Engine
//!
//! Scores source code along pluggable quality dimensions and personalises
//! how it scores each user from their feedback:
//! - Tree-sitter syntax models for Python, JavaScript and TypeScript
//! - Built-in graders for code quality, readability, speed, reliability and security
//! - Weighted sub-metric aggregation with line diagnostics and ranked suggestions
//! - Per-user, per-dimension learning strategies adapted by a meta-learner
//! - Anonymous collective counts of suggestion categories
//!
//! # Architecture
//!
//! - **Syntax**: source text to [`syntax::SyntaxModel`], pure and deterministic
//! - **Grading**: the [`grading::Grader`] capability and its registration table
//! - **Evaluation**: learning strategies and the adaptation rules
//! - **Storage**: collaborator contracts and in-memory implementations
//! - **Engine**: the `grade` / `submit_feedback` facade
//!
//! # Example
//!
//! ```no_run
//! use toasty_core::{EngineConfig, FeedbackRecord, GradeRequest, GradingEngine, Language, UserId};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = GradingEngine::in_memory(EngineConfig::default())?;
//!
//!     let outcome = engine
//!         .grade(GradeRequest::new("def f():\n    pass\n", Language::Python, UserId::new("alice")))
//!         .await?;
//!     println!("{:.1}", outcome.overall_score);
//!
//!     let feedback = FeedbackRecord::new(outcome.grading_id, UserId::new("alice"), 4)
//!         .with_comment("explain more");
//!     let applied = engine.submit_feedback(feedback).await;
//!     assert!(applied.applied);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod evaluation;
pub mod grading;
pub mod storage;
pub mod syntax;
pub mod types;

// Re-export commonly used types
pub use config::{AdaptationConfig, ConfigError, EngineConfig, GradingConfig, StorageConfig};
pub use engine::{BatchOutcome, GradeOutcome, GradeRequest, GradingEngine};
pub use error::{GradingError, Result};
pub use evaluation::{LearningStrategy, MetaLearner, UserProgress};
pub use grading::{Grader, GraderRegistry};
pub use storage::{CollectivePatternStore, EngineSnapshot, FeedbackLedger, StrategyStore};
pub use syntax::{build_model, Language, SyntaxModel};
pub use types::{
    CollectivePattern, FeedbackLevel, FeedbackOutcome, FeedbackRecord, FeedbackRejection,
    GraderResult, GradingDimension, GradingId, ImprovementSuggestion, ScoreBreakdown, UserId,
};
