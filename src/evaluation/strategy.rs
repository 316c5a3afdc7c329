//! Per-(user, dimension) learning strategy
//!
//! A strategy starts from a grader's declared defaults and is mutated only by
//! the meta-learner. It carries everything needed to replay adaptation
//! deterministically: current weights and thresholds, detail preference,
//! rolling improvement rates, the skill estimate, recent verbosity votes and
//! the fingerprints of feedback already applied.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use super::feedback::VerbositySignal;
use crate::error::{GradingError, Result};
use crate::grading::Grader;
use crate::types::{
    FeedbackFingerprint, FeedbackLevel, StrategyKey, ThresholdBands, UserId, WeightSet,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningStrategy {
    pub key: StrategyKey,

    /// Current sub-metric weights (sum to 1.0)
    pub weights: WeightSet,

    /// Current qualitative bands (strictly decreasing)
    pub thresholds: ThresholdBands,

    pub feedback_level: FeedbackLevel,

    /// Rolling improvement-rate estimate per sub-metric, in [0, 1]
    pub improvement_rates: BTreeMap<String, f64>,

    /// EMA of overall scores this user has received
    pub skill_estimate: Option<f64>,

    /// Most recent verbosity votes, oldest first
    #[serde(default)]
    pub verbosity_votes: VecDeque<VerbositySignal>,

    /// Fingerprints of applied feedback, oldest first
    #[serde(default)]
    pub applied_feedback: VecDeque<FeedbackFingerprint>,

    /// Number of feedback events applied
    pub sample_count: u64,

    /// Applied feedback rated above the neutral midpoint
    #[serde(default)]
    pub success_count: u64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LearningStrategy {
    /// Fresh strategy seeded from a grader's declared defaults
    pub fn from_grader(user: UserId, grader: &dyn Grader, initial_rate: f64) -> Self {
        let weights = grader.default_weights();
        let improvement_rates = weights
            .0
            .keys()
            .map(|metric| (metric.clone(), initial_rate))
            .collect();
        let now = Utc::now();

        Self {
            key: StrategyKey::new(user, grader.dimension()),
            weights,
            thresholds: grader.default_thresholds(),
            feedback_level: FeedbackLevel::default(),
            improvement_rates,
            skill_estimate: None,
            verbosity_votes: VecDeque::new(),
            applied_feedback: VecDeque::new(),
            sample_count: 0,
            success_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Weight for `metric`, falling back to `defaults` when absent
    pub fn weight_or(&self, metric: &str, defaults: &WeightSet) -> f64 {
        self.weights
            .get(metric)
            .or_else(|| defaults.get(metric))
            .unwrap_or(0.0)
    }

    /// Share of applied feedback that was positive, 0.0 before any feedback
    pub fn effectiveness(&self) -> f64 {
        if self.sample_count == 0 {
            0.0
        } else {
            self.success_count as f64 / self.sample_count as f64
        }
    }

    pub fn has_applied(&self, fingerprint: &FeedbackFingerprint) -> bool {
        self.applied_feedback.contains(fingerprint)
    }

    /// Remember an applied fingerprint, evicting the oldest beyond `window`
    pub fn remember(&mut self, fingerprint: FeedbackFingerprint, window: usize) {
        self.applied_feedback.push_back(fingerprint);
        while self.applied_feedback.len() > window {
            self.applied_feedback.pop_front();
        }
    }

    /// Check weight and threshold invariants
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;
        if !self.thresholds.is_strictly_decreasing() {
            return Err(GradingError::InvalidStrategy(format!(
                "thresholds for {} are not strictly decreasing",
                self.key
            )));
        }
        if let Some((metric, rate)) = self
            .improvement_rates
            .iter()
            .find(|(_, r)| !(0.0..=1.0).contains(*r))
        {
            return Err(GradingError::InvalidStrategy(format!(
                "improvement rate {} = {} outside [0, 1]",
                metric, rate
            )));
        }
        Ok(())
    }

    /// Same adaptive state, ignoring timestamps
    pub fn same_state(&self, other: &LearningStrategy) -> bool {
        self.key == other.key
            && self.weights == other.weights
            && self.thresholds == other.thresholds
            && self.feedback_level == other.feedback_level
            && self.improvement_rates == other.improvement_rates
            && self.skill_estimate == other.skill_estimate
            && self.verbosity_votes == other.verbosity_votes
            && self.sample_count == other.sample_count
            && self.success_count == other.success_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GradingConfig;
    use crate::grading::StructuralGrader;
    use crate::types::GradingId;

    fn strategy() -> LearningStrategy {
        let grader = StructuralGrader::code_quality(GradingConfig::default());
        LearningStrategy::from_grader(UserId::new("alice"), &grader, 0.5)
    }

    #[test]
    fn test_seeded_from_grader_defaults() {
        let s = strategy();
        assert!(s.validate().is_ok());
        assert_eq!(s.weights.len(), 4);
        assert_eq!(s.improvement_rates.len(), 4);
        assert!(s.improvement_rates.values().all(|r| (*r - 0.5).abs() < 1e-12));
        assert_eq!(s.feedback_level, FeedbackLevel::Standard);
        assert_eq!(s.thresholds.get("good"), Some(75.0));
        assert_eq!(s.sample_count, 0);
    }

    #[test]
    fn test_fingerprint_window_is_bounded() {
        let mut s = strategy();
        let first = FeedbackFingerprint {
            grading_id: GradingId::new(),
            timestamp: Utc::now(),
        };
        s.remember(first, 2);
        for _ in 0..2 {
            s.remember(
                FeedbackFingerprint {
                    grading_id: GradingId::new(),
                    timestamp: Utc::now(),
                },
                2,
            );
        }
        assert_eq!(s.applied_feedback.len(), 2);
        assert!(!s.has_applied(&first));
    }

    #[test]
    fn test_effectiveness_ratio() {
        let mut s = strategy();
        assert_eq!(s.effectiveness(), 0.0);
        s.sample_count = 4;
        s.success_count = 3;
        assert!((s.effectiveness() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_weight_fallback() {
        let mut s = strategy();
        let defaults = s.weights.clone();
        s.weights.0.remove("complexity");
        assert!((s.weight_or("complexity", &defaults) - 0.2).abs() < 1e-12);
        assert_eq!(s.weight_or("unknown", &defaults), 0.0);
    }

    #[test]
    fn test_validate_rejects_bad_rates() {
        let mut s = strategy();
        s.improvement_rates.insert("structure".to_string(), 1.5);
        assert!(matches!(s.validate(), Err(GradingError::InvalidStrategy(_))));
    }
}
