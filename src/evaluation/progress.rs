//! Per-user learning progress derived from stored strategies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::strategy::LearningStrategy;
use crate::types::{FeedbackLevel, GradingDimension, UserId};

/// One strategy's effectiveness at a glance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySummary {
    pub dimension: GradingDimension,
    pub feedback_level: FeedbackLevel,
    pub times_applied: u64,
    pub success_count: u64,
    pub effectiveness: f64,
    pub skill_estimate: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

impl From<&LearningStrategy> for StrategySummary {
    fn from(strategy: &LearningStrategy) -> Self {
        Self {
            dimension: strategy.key.dimension.clone(),
            feedback_level: strategy.feedback_level,
            times_applied: strategy.sample_count,
            success_count: strategy.success_count,
            effectiveness: strategy.effectiveness(),
            skill_estimate: strategy.skill_estimate,
            updated_at: strategy.updated_at,
        }
    }
}

/// Aggregate over every strategy a user owns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProgress {
    pub user: UserId,
    pub strategies: Vec<StrategySummary>,
    pub total_feedback: u64,
    pub total_successes: u64,
    /// Successes over all applied feedback
    pub effectiveness: f64,
    /// Mean skill estimate over dimensions that have one
    pub skill_estimate: Option<f64>,
}

impl UserProgress {
    pub fn from_strategies(user: UserId, strategies: &[LearningStrategy]) -> Self {
        let summaries: Vec<StrategySummary> = strategies
            .iter()
            .filter(|s| s.key.user == user)
            .map(StrategySummary::from)
            .collect();

        let total_feedback: u64 = summaries.iter().map(|s| s.times_applied).sum();
        let total_successes: u64 = summaries.iter().map(|s| s.success_count).sum();
        let effectiveness = if total_feedback == 0 {
            0.0
        } else {
            total_successes as f64 / total_feedback as f64
        };

        let skills: Vec<f64> = summaries.iter().filter_map(|s| s.skill_estimate).collect();
        let skill_estimate = if skills.is_empty() {
            None
        } else {
            Some(skills.iter().sum::<f64>() / skills.len() as f64)
        };

        Self {
            user,
            strategies: summaries,
            total_feedback,
            total_successes,
            effectiveness,
            skill_estimate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GradingConfig;
    use crate::grading::{ReliabilityGrader, StructuralGrader};

    #[test]
    fn test_progress_aggregates_strategies() {
        let mut quality = LearningStrategy::from_grader(
            UserId::new("alice"),
            &StructuralGrader::code_quality(GradingConfig::default()),
            0.5,
        );
        quality.sample_count = 3;
        quality.success_count = 2;
        quality.skill_estimate = Some(70.0);

        let mut reliability = LearningStrategy::from_grader(
            UserId::new("alice"),
            &ReliabilityGrader::new(GradingConfig::default()),
            0.5,
        );
        reliability.sample_count = 1;
        reliability.skill_estimate = Some(90.0);

        let other = LearningStrategy::from_grader(
            UserId::new("bob"),
            &ReliabilityGrader::new(GradingConfig::default()),
            0.5,
        );

        let progress =
            UserProgress::from_strategies(UserId::new("alice"), &[quality, reliability, other]);
        assert_eq!(progress.strategies.len(), 2);
        assert_eq!(progress.total_feedback, 4);
        assert_eq!(progress.total_successes, 2);
        assert!((progress.effectiveness - 0.5).abs() < 1e-12);
        assert_eq!(progress.skill_estimate, Some(80.0));
    }

    #[test]
    fn test_progress_without_feedback() {
        let progress = UserProgress::from_strategies(UserId::new("carol"), &[]);
        assert!(progress.strategies.is_empty());
        assert_eq!(progress.effectiveness, 0.0);
        assert_eq!(progress.skill_estimate, None);
    }
}
