//! Feedback-driven adaptation of learning strategies
//!
//! One feedback event moves a strategy through four updates, in order:
//!
//! 1. **Improvement rates**: each sub-metric gets a signal of 0.0
//!    (under-addressed: negative rating, score below the "good" band) or 1.0
//!    (well-addressed: positive rating, score at or above "good"), folded in
//!    with `rate = rate * (1 - α) + signal * α`. Metrics without a signal keep
//!    their rate.
//! 2. **Weights**: every metric updated this event whose rate is now below
//!    the stagnation threshold gains one weight step, taken from the other
//!    metrics in proportion to their headroom above the floor. No weight
//!    leaves `[floor, ceiling]` and the total stays 1.0.
//! 3. **Thresholds**: the skill estimate (EMA of overall scores, seeded with
//!    the "good" band) pulls every band one step toward it when it sits more
//!    than one step away. Bands stay inside `[band_min, band_max]` and
//!    strictly decreasing.
//! 4. **Feedback level**: a verbosity signal in the comment is recorded and
//!    the majority of the recent window moves the level one step.

use chrono::Utc;
use std::collections::BTreeMap;
use tracing::debug;

use super::feedback::{majority, read_verbosity, VerbosityReading};
use super::strategy::LearningStrategy;
use crate::config::AdaptationConfig;
use crate::error::{GradingError, Result};
use crate::types::{FeedbackRecord, GraderResult, GradingRecord};

/// Which way the bands moved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdShift {
    Raised,
    Lowered,
    Held,
}

/// What one adaptation step changed
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptationReport {
    /// Metrics whose improvement rate received a signal
    pub updated_metrics: Vec<String>,
    /// Metrics that gained weight
    pub boosted_metrics: Vec<String>,
    pub threshold_shift: ThresholdShift,
    pub verbosity: VerbosityReading,
}

/// Applies the adaptation rules configured in `AdaptationConfig`
#[derive(Debug, Clone)]
pub struct MetaLearner {
    config: AdaptationConfig,
}

impl MetaLearner {
    pub fn new(config: AdaptationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AdaptationConfig {
        &self.config
    }

    /// Reject ratings off the scale and feedback from anyone but the requester
    pub fn validate_feedback(&self, feedback: &FeedbackRecord, grading: &GradingRecord) -> Result<()> {
        if feedback.rating < self.config.rating_min || feedback.rating > self.config.rating_max {
            return Err(GradingError::InvalidFeedback(format!(
                "rating {} outside {}..={}",
                feedback.rating, self.config.rating_min, self.config.rating_max
            )));
        }
        if feedback.user_id != grading.requester {
            return Err(GradingError::InvalidFeedback(format!(
                "user {} did not request grading {}",
                feedback.user_id, grading.grading_id
            )));
        }
        Ok(())
    }

    /// Apply one feedback event about `result` to `strategy`
    ///
    /// The caller is responsible for duplicate detection; this always adapts.
    pub fn adapt(
        &self,
        strategy: &mut LearningStrategy,
        result: &GraderResult,
        feedback: &FeedbackRecord,
    ) -> AdaptationReport {
        let updated_metrics = self.update_rates(strategy, result, feedback.rating);
        let boosted_metrics = self.rebalance_weights(strategy, &updated_metrics);
        let threshold_shift = self.shift_thresholds(strategy, result.score);
        let verbosity = self.update_feedback_level(strategy, feedback.comment.as_deref());

        strategy.sample_count += 1;
        if feedback.rating > self.config.rating_midpoint {
            strategy.success_count += 1;
        }
        strategy.remember(feedback.fingerprint(), self.config.duplicate_window);
        strategy.updated_at = Utc::now();

        debug!(
            "Adapted {}: updated={:?}, boosted={:?}, thresholds={:?}, level={}",
            strategy.key, updated_metrics, boosted_metrics, threshold_shift, strategy.feedback_level
        );

        AdaptationReport {
            updated_metrics,
            boosted_metrics,
            threshold_shift,
            verbosity,
        }
    }

    fn update_rates(&self, strategy: &mut LearningStrategy, result: &GraderResult, rating: u8) -> Vec<String> {
        let alpha = self.config.alpha;
        let good = strategy.thresholds.reference_boundary();
        let negative = rating < self.config.rating_midpoint;
        let positive = rating > self.config.rating_midpoint;

        let mut updated = Vec::new();
        for (metric, score) in &result.breakdown.scores {
            let signal = if negative && *score < good {
                0.0
            } else if positive && *score >= good {
                1.0
            } else {
                continue;
            };

            let rate = strategy
                .improvement_rates
                .entry(metric.clone())
                .or_insert(self.config.initial_improvement_rate);
            *rate = (*rate * (1.0 - alpha) + signal * alpha).clamp(0.0, 1.0);
            updated.push(metric.clone());
        }
        updated
    }

    fn rebalance_weights(&self, strategy: &mut LearningStrategy, updated: &[String]) -> Vec<String> {
        let floor = self.config.weight_floor;
        let ceiling = self.config.weight_ceiling;
        let mut boosted = Vec::new();

        for metric in updated {
            let stagnant = strategy
                .improvement_rates
                .get(metric)
                .map(|rate| *rate < self.config.stagnation_threshold)
                .unwrap_or(false);
            let Some(current) = strategy.weights.get(metric).filter(|_| stagnant) else {
                continue;
            };

            let headroom: BTreeMap<String, f64> = strategy
                .weights
                .0
                .iter()
                .filter(|(name, _)| *name != metric)
                .map(|(name, w)| (name.clone(), (w - floor).max(0.0)))
                .collect();
            let available: f64 = headroom.values().sum();

            let gain = self
                .config
                .weight_step
                .min(ceiling - current)
                .min(available);
            if gain <= 0.0 {
                continue;
            }

            for (name, room) in &headroom {
                if let Some(w) = strategy.weights.0.get_mut(name) {
                    *w -= gain * room / available;
                }
            }
            if let Some(w) = strategy.weights.0.get_mut(metric) {
                *w += gain;
            }
            strategy.weights.normalize_weights();
            boosted.push(metric.clone());
        }
        boosted
    }

    fn shift_thresholds(&self, strategy: &mut LearningStrategy, overall: f64) -> ThresholdShift {
        let alpha = self.config.alpha;
        let step = self.config.threshold_step;
        let reference = strategy.thresholds.reference_boundary();

        let previous = strategy.skill_estimate.unwrap_or(reference);
        let skill = previous * (1.0 - alpha) + overall * alpha;
        strategy.skill_estimate = Some(skill);

        let shift = if skill - reference > step {
            ThresholdShift::Raised
        } else if reference - skill > step {
            ThresholdShift::Lowered
        } else {
            return ThresholdShift::Held;
        };

        let old: Vec<f64> = strategy.thresholds.bands().iter().map(|b| b.boundary).collect();
        let moved = move_bands(&old, shift, step, self.config.band_min, self.config.band_max);
        if moved == old {
            return ThresholdShift::Held;
        }
        strategy.thresholds.set_boundaries(&moved);
        if !strategy.thresholds.is_strictly_decreasing() {
            // Only reachable with bands declared outside the global bounds
            strategy.thresholds.set_boundaries(&old);
            return ThresholdShift::Held;
        }
        shift
    }

    fn update_feedback_level(&self, strategy: &mut LearningStrategy, comment: Option<&str>) -> VerbosityReading {
        let reading = comment.map(read_verbosity).unwrap_or_default();
        let Some(signal) = reading.signal else {
            return reading;
        };
        if reading.conflicting {
            debug!(
                "Conflicting verbosity phrases for {}, using last: {}",
                strategy.key, signal
            );
        }

        strategy.verbosity_votes.push_back(signal);
        while strategy.verbosity_votes.len() > self.config.verbosity_window {
            strategy.verbosity_votes.pop_front();
        }
        if let Some(winner) = majority(&strategy.verbosity_votes) {
            strategy.feedback_level = winner.apply(strategy.feedback_level);
        }
        reading
    }
}

/// Move decreasing `bands` one step, keeping them inside the bounds and
/// strictly decreasing
///
/// Rising bands are processed top-down and falling bands bottom-up, so each
/// band is checked against a neighbour that has already moved. A move that
/// would reach that neighbour resolves to the midpoint of the band's two
/// neighbours (bounds stand in at the edges), never against the direction of
/// travel.
pub fn move_bands(bands: &[f64], shift: ThresholdShift, step: f64, min: f64, max: f64) -> Vec<f64> {
    let mut moved = bands.to_vec();
    let n = moved.len();

    match shift {
        ThresholdShift::Held => {}
        ThresholdShift::Raised => {
            for i in 0..n {
                let target = (moved[i] + step).min(max);
                let upper = if i == 0 { None } else { Some(moved[i - 1]) };
                moved[i] = match upper {
                    Some(upper) if target >= upper => {
                        let lower = if i + 1 < n { moved[i + 1] } else { min };
                        moved[i].max((upper + lower) / 2.0)
                    }
                    _ => target.max(moved[i].min(max)),
                };
            }
        }
        ThresholdShift::Lowered => {
            for i in (0..n).rev() {
                let target = (moved[i] - step).max(min);
                let lower = if i + 1 < n { Some(moved[i + 1]) } else { None };
                moved[i] = match lower {
                    Some(lower) if target <= lower => {
                        let upper = if i == 0 { max } else { moved[i - 1] };
                        moved[i].min((upper + lower) / 2.0)
                    }
                    _ => target.min(moved[i].max(min)),
                };
            }
        }
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GradingConfig;
    use crate::grading::{Grader, StructuralGrader};
    use crate::types::{GradingDimension, GradingId, ScoreBreakdown, UserId};

    fn setup() -> (MetaLearner, LearningStrategy) {
        let grader = StructuralGrader::code_quality(GradingConfig::default());
        let strategy = LearningStrategy::from_grader(UserId::new("u"), &grader, 0.5);
        (MetaLearner::new(AdaptationConfig::default()), strategy)
    }

    fn result(scores: &[(&str, f64)], overall: f64) -> GraderResult {
        GraderResult {
            dimension: GradingDimension::CodeQuality,
            score: overall,
            rating: "good".to_string(),
            breakdown: ScoreBreakdown {
                scores: scores.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
                ..Default::default()
            },
            suggestions: Vec::new(),
            metadata: Default::default(),
        }
    }

    fn feedback(rating: u8) -> FeedbackRecord {
        FeedbackRecord::new(GradingId::new(), UserId::new("u"), rating)
    }

    #[test]
    fn test_negative_feedback_lowers_rate_of_weak_metrics() {
        let (learner, mut strategy) = setup();
        let r = result(
            &[("structure", 40.0), ("readability", 90.0), ("best_practices", 80.0), ("complexity", 100.0)],
            70.0,
        );
        let report = learner.adapt(&mut strategy, &r, &feedback(1));

        assert_eq!(report.updated_metrics, vec!["structure".to_string()]);
        assert!((strategy.improvement_rates["structure"] - 0.4).abs() < 1e-12);
        assert!((strategy.improvement_rates["readability"] - 0.5).abs() < 1e-12);
        // 0.4 is not yet below the stagnation threshold
        assert!(report.boosted_metrics.is_empty());
    }

    #[test]
    fn test_stagnant_metric_gains_weight() {
        let (learner, mut strategy) = setup();
        let r = result(
            &[("structure", 40.0), ("readability", 90.0), ("best_practices", 80.0), ("complexity", 100.0)],
            70.0,
        );
        // 0.5 -> 0.4 -> 0.32 -> 0.256
        for _ in 0..3 {
            learner.adapt(&mut strategy, &r, &feedback(1));
        }
        let structure = strategy.weights.get("structure").unwrap();
        assert!((structure - 0.30).abs() < 1e-9, "structure weight {}", structure);
        assert!(strategy.weights.validate().is_ok());
        for w in strategy.weights.0.values() {
            assert!(*w >= 0.05 - 1e-12 && *w <= 0.6 + 1e-12);
        }
    }

    #[test]
    fn test_positive_feedback_on_strong_metrics_keeps_weights() {
        let (learner, mut strategy) = setup();
        let before = strategy.weights.clone();
        let r = result(
            &[("structure", 85.0), ("readability", 90.0), ("best_practices", 100.0), ("complexity", 100.0)],
            94.0,
        );
        for _ in 0..5 {
            learner.adapt(&mut strategy, &r, &feedback(5));
        }
        assert_eq!(strategy.weights, before);
        assert!(strategy.improvement_rates["readability"] > 0.5);
        assert_eq!(strategy.sample_count, 5);
    }

    #[test]
    fn test_success_counts_positive_ratings_only() {
        let (learner, mut strategy) = setup();
        let r = result(&[("structure", 80.0)], 80.0);
        for rating in [5, 3, 1, 4] {
            learner.adapt(&mut strategy, &r, &feedback(rating));
        }
        assert_eq!(strategy.sample_count, 4);
        assert_eq!(strategy.success_count, 2);
        assert!((strategy.effectiveness() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_weight_ceiling_respected() {
        let (learner, mut strategy) = setup();
        let r = result(&[("structure", 10.0)], 10.0);
        for _ in 0..40 {
            learner.adapt(&mut strategy, &r, &feedback(1));
        }
        let structure = strategy.weights.get("structure").unwrap();
        assert!(structure <= 0.6 + 1e-9);
        assert!(strategy.weights.validate().is_ok());
    }

    #[test]
    fn test_thresholds_follow_skill() {
        let (learner, mut strategy) = setup();
        let r = result(&[("structure", 100.0)], 100.0);
        // skill moves from 75 to 80, more than one step above "good"
        learner.adapt(&mut strategy, &r, &feedback(4));
        assert_eq!(strategy.thresholds.get("good"), Some(77.0));
        assert_eq!(strategy.thresholds.get("excellent"), Some(87.0));
        assert!(strategy.thresholds.is_strictly_decreasing());
    }

    #[test]
    fn test_move_bands_midpoint_and_bounds() {
        let raised = move_bands(&[94.0, 93.5, 60.0], ThresholdShift::Raised, 2.0, 30.0, 95.0);
        assert_eq!(raised[0], 95.0);
        // 95.5 would reach 95: midpoint of 95 and 60 is 77.5, which is below 93.5
        assert_eq!(raised[1], 93.5);
        assert_eq!(raised[2], 62.0);

        let lowered = move_bands(&[80.0, 31.0, 30.5], ThresholdShift::Lowered, 2.0, 30.0, 95.0);
        assert_eq!(lowered[2], 30.0);
        // 29 clamps to 30 and would reach 30: midpoint of 80 and 30 is 55, kept at 31
        assert_eq!(lowered[1], 31.0);
        assert_eq!(lowered[0], 78.0);
    }

    #[test]
    fn test_verbosity_majority_moves_level() {
        let (learner, mut strategy) = setup();
        let r = result(&[("structure", 80.0)], 80.0);
        let record = feedback(3).with_comment("Way too verbose");
        let report = learner.adapt(&mut strategy, &r, &record);
        assert_eq!(report.verbosity.signal, Some(crate::evaluation::VerbositySignal::TooDetailed));
        assert_eq!(strategy.feedback_level, crate::types::FeedbackLevel::Minimal);
    }

    #[test]
    fn test_validate_feedback() {
        let (learner, _) = setup();
        let record = GradingRecord {
            grading_id: GradingId::new(),
            requester: UserId::new("u"),
            language: "python".to_string(),
            results: Default::default(),
            issued_at: Utc::now(),
        };
        let mut fb = FeedbackRecord::new(record.grading_id, UserId::new("u"), 4);
        assert!(learner.validate_feedback(&fb, &record).is_ok());
        fb.rating = 9;
        assert!(matches!(
            learner.validate_feedback(&fb, &record),
            Err(GradingError::InvalidFeedback(_))
        ));
        fb.rating = 3;
        fb.user_id = UserId::new("mallory");
        assert!(learner.validate_feedback(&fb, &record).is_err());
    }
}
