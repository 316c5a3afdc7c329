//! Adaptive evaluation: per-user learning strategies and the meta-learner
//!
//! Grading only ever reads a [`LearningStrategy`] snapshot. Feedback is the
//! sole input that mutates one, through [`MetaLearner::adapt`], while the
//! engine holds the strategy's key in [`KeyedLocks`].
//!
//! # Hierarchy of state
//!
//! - **Strategy** (per user and dimension): weights, thresholds, detail
//!   preference, improvement rates, skill estimate
//! - **Progress** (per user): how often feedback was positive, summarised
//!   over the user's strategies
//! - **Collective patterns** (global): suggestion category counts, no
//!   identity attached
//!
//! # Usage
//!
//! ```rust,no_run
//! use toasty_core::config::{AdaptationConfig, GradingConfig};
//! use toasty_core::evaluation::{LearningStrategy, MetaLearner};
//! use toasty_core::grading::{Grader, StructuralGrader};
//! use toasty_core::syntax::{build_model, Language};
//! use toasty_core::types::{FeedbackRecord, GradingId, UserId};
//!
//! # fn example() -> toasty_core::Result<()> {
//! let grader = StructuralGrader::code_quality(GradingConfig::default());
//! let mut strategy = LearningStrategy::from_grader(UserId::new("alice"), &grader, 0.5);
//!
//! let model = build_model("def f():\n    pass\n", Language::Python)?;
//! let result = grader.grade(&model, &strategy);
//!
//! let learner = MetaLearner::new(AdaptationConfig::default());
//! let feedback = FeedbackRecord::new(GradingId::new(), UserId::new("alice"), 2)
//!     .with_comment("too detailed");
//! learner.adapt(&mut strategy, &result, &feedback);
//! # Ok(())
//! # }
//! ```

pub mod feedback;
pub mod locks;
pub mod meta_learner;
pub mod progress;
pub mod strategy;

pub use feedback::{read_verbosity, VerbosityReading, VerbositySignal};
pub use locks::{KeyGuards, KeyedLocks};
pub use meta_learner::{AdaptationReport, MetaLearner, ThresholdShift};
pub use progress::{StrategySummary, UserProgress};
pub use strategy::LearningStrategy;
