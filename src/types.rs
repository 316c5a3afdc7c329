//! Core data types for the grading engine
//!
//! This module defines the fundamental data structures shared by the graders,
//! the score aggregator and the meta-learning layer: identifiers, grading
//! dimensions, weight and threshold mappings, grader results and feedback
//! records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::{GradingError, Result};

/// Tolerance used when checking that weights sum to 1.0
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Unique identifier for a grading call
///
/// Generated by the engine for every `grade` call and used as the join key
/// between issued results and incoming feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GradingId(pub Uuid);

impl GradingId {
    /// Create a new random grading ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a grading ID from a string
    pub fn from_string(s: &str) -> std::result::Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for GradingId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GradingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the user a strategy is personalised for
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Axis of code quality being graded
///
/// Serialized as its snake_case tag; any tag that is not a built-in name
/// becomes `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GradingDimension {
    CodeQuality,
    Readability,
    Speed,
    Reliability,
    Custom(String),
}

impl GradingDimension {
    pub fn as_str(&self) -> &str {
        match self {
            GradingDimension::CodeQuality => "code_quality",
            GradingDimension::Readability => "readability",
            GradingDimension::Speed => "speed",
            GradingDimension::Reliability => "reliability",
            GradingDimension::Custom(name) => name,
        }
    }
}

impl std::fmt::Display for GradingDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for GradingDimension {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "code_quality" => GradingDimension::CodeQuality,
            "readability" => GradingDimension::Readability,
            "speed" => GradingDimension::Speed,
            "reliability" => GradingDimension::Reliability,
            _ => GradingDimension::Custom(tag),
        }
    }
}

impl From<&str> for GradingDimension {
    fn from(tag: &str) -> Self {
        GradingDimension::from(tag.to_string())
    }
}

impl From<GradingDimension> for String {
    fn from(dimension: GradingDimension) -> Self {
        dimension.as_str().to_string()
    }
}

/// Level of detail rendered into a grader result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackLevel {
    /// Top suggestions only
    Minimal,
    /// All suggestions, no examples
    Standard,
    /// Suggestions with examples and line diagnostics
    Detailed,
    /// Everything plus per-metric contributions
    Expert,
}

impl FeedbackLevel {
    /// One level more verbose, saturating at `Expert`
    pub fn more_detailed(self) -> Self {
        match self {
            FeedbackLevel::Minimal => FeedbackLevel::Standard,
            FeedbackLevel::Standard => FeedbackLevel::Detailed,
            FeedbackLevel::Detailed | FeedbackLevel::Expert => FeedbackLevel::Expert,
        }
    }

    /// One level less verbose, saturating at `Minimal`
    pub fn less_detailed(self) -> Self {
        match self {
            FeedbackLevel::Minimal | FeedbackLevel::Standard => FeedbackLevel::Minimal,
            FeedbackLevel::Detailed => FeedbackLevel::Standard,
            FeedbackLevel::Expert => FeedbackLevel::Detailed,
        }
    }
}

impl Default for FeedbackLevel {
    fn default() -> Self {
        FeedbackLevel::Standard
    }
}

impl std::fmt::Display for FeedbackLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedbackLevel::Minimal => write!(f, "minimal"),
            FeedbackLevel::Standard => write!(f, "standard"),
            FeedbackLevel::Detailed => write!(f, "detailed"),
            FeedbackLevel::Expert => write!(f, "expert"),
        }
    }
}

/// Sub-metric weights (sum to 1.0)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightSet(pub BTreeMap<String, f64>);

impl WeightSet {
    pub fn from_pairs(pairs: &[(&str, f64)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(name, weight)| (name.to_string(), *weight))
                .collect(),
        )
    }

    pub fn get(&self, metric: &str) -> Option<f64> {
        self.0.get(metric).copied()
    }

    pub fn sum(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Normalize weights to sum to 1.0
    pub fn normalize_weights(&mut self) {
        let sum = self.sum();
        if sum > 0.0 {
            for weight in self.0.values_mut() {
                *weight /= sum;
            }
        }
    }

    /// Check the sum-to-one and non-negativity invariants
    pub fn validate(&self) -> Result<()> {
        if self.0.is_empty() {
            return Err(GradingError::InvalidStrategy("empty weight set".to_string()));
        }
        if let Some((name, w)) = self.0.iter().find(|(_, w)| !w.is_finite() || **w < 0.0) {
            return Err(GradingError::InvalidStrategy(format!(
                "weight {} = {} is not a non-negative number",
                name, w
            )));
        }
        if (self.sum() - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(GradingError::InvalidStrategy(format!(
                "weights sum to {:.6}, expected 1.0",
                self.sum()
            )));
        }
        Ok(())
    }
}

/// A single qualitative score band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub label: String,
    pub boundary: f64,
}

/// Ordered score bands, strictly decreasing boundaries
///
/// e.g. excellent 85, good 75, acceptable 65, needs_improvement 50
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Band>", into = "Vec<Band>")]
pub struct ThresholdBands(Vec<Band>);

/// Label given to scores below the lowest band
pub const BELOW_ALL_BANDS: &str = "poor";

impl ThresholdBands {
    /// Build bands, rejecting empty or non-decreasing input
    pub fn new(bands: Vec<Band>) -> Result<Self> {
        if bands.is_empty() {
            return Err(GradingError::InvalidStrategy("no threshold bands".to_string()));
        }
        for pair in bands.windows(2) {
            if pair[0].boundary <= pair[1].boundary {
                return Err(GradingError::InvalidStrategy(format!(
                    "band {} ({}) must be above band {} ({})",
                    pair[0].label, pair[0].boundary, pair[1].label, pair[1].boundary
                )));
            }
        }
        Ok(Self(bands))
    }

    /// Build from literal pairs declared by a grader
    pub fn from_pairs(pairs: &[(&str, f64)]) -> Result<Self> {
        Self::new(
            pairs
                .iter()
                .map(|(label, boundary)| Band {
                    label: label.to_string(),
                    boundary: *boundary,
                })
                .collect(),
        )
    }

    /// Build from a grader's literal declaration, already in decreasing order
    pub(crate) fn declared(pairs: &[(&str, f64)]) -> Self {
        debug_assert!(pairs.windows(2).all(|p| p[0].1 > p[1].1));
        Self(
            pairs
                .iter()
                .map(|(label, boundary)| Band {
                    label: label.to_string(),
                    boundary: *boundary,
                })
                .collect(),
        )
    }

    pub fn bands(&self) -> &[Band] {
        &self.0
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.0.iter().find(|b| b.label == label).map(|b| b.boundary)
    }

    /// The "good" band, or the middle band when a grader declares none
    pub fn reference_boundary(&self) -> f64 {
        self.get("good")
            .unwrap_or_else(|| self.0[(self.0.len() - 1) / 2].boundary)
    }

    /// Qualitative label for a score
    pub fn rate(&self, score: f64) -> &str {
        self.0
            .iter()
            .find(|b| score >= b.boundary)
            .map(|b| b.label.as_str())
            .unwrap_or(BELOW_ALL_BANDS)
    }

    pub fn is_strictly_decreasing(&self) -> bool {
        self.0.windows(2).all(|p| p[0].boundary > p[1].boundary)
    }

    /// Replace the boundaries in place; caller guarantees ordering
    pub(crate) fn set_boundaries(&mut self, boundaries: &[f64]) {
        for (band, value) in self.0.iter_mut().zip(boundaries) {
            band.boundary = *value;
        }
    }
}

impl TryFrom<Vec<Band>> for ThresholdBands {
    type Error = GradingError;

    fn try_from(bands: Vec<Band>) -> Result<Self> {
        ThresholdBands::new(bands)
    }
}

impl From<ThresholdBands> for Vec<Band> {
    fn from(bands: ThresholdBands) -> Self {
        bands.0
    }
}

/// Diagnostic attached to a source line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineDiagnostic {
    pub line: usize,
    pub message: String,
}

/// Line-level diagnostics in detection order, one entry per line
///
/// A later detection on the same line replaces the message but keeps the
/// line's original position.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineDiagnostics(Vec<LineDiagnostic>);

impl LineDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, line: usize, message: impl Into<String>) {
        let message = message.into();
        match self.0.iter_mut().find(|d| d.line == line) {
            Some(existing) => existing.message = message,
            None => self.0.push(LineDiagnostic { line, message }),
        }
    }

    pub fn get(&self, line: usize) -> Option<&str> {
        self.0
            .iter()
            .find(|d| d.line == line)
            .map(|d| d.message.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &LineDiagnostic> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

/// Sub-metric scores plus line diagnostics
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Sub-metric name -> score in [0, 100]
    pub scores: BTreeMap<String, f64>,

    /// Line number -> diagnostic message
    pub line_feedback: LineDiagnostics,
}

impl ScoreBreakdown {
    pub fn get(&self, metric: &str) -> Option<f64> {
        self.scores.get(metric).copied()
    }
}

/// A specific improvement suggestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovementSuggestion {
    pub category: String,
    pub description: String,
    /// 1 = highest
    pub priority: u8,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

impl ImprovementSuggestion {
    pub fn new(category: impl Into<String>, priority: u8, description: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            description: description.into(),
            priority,
            examples: Vec::new(),
        }
    }

    pub fn with_examples(mut self, examples: Vec<String>) -> Self {
        self.examples = examples;
        self
    }
}

/// Standardized result from any grader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraderResult {
    pub dimension: GradingDimension,
    /// Weighted score in [0, 100]
    pub score: f64,
    /// Band label for `score` under the strategy's thresholds
    pub rating: String,
    pub breakdown: ScoreBreakdown,
    pub suggestions: Vec<ImprovementSuggestion>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl GraderResult {
    /// Distinct suggestion categories, in suggestion order
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for s in &self.suggestions {
            if !seen.contains(&s.category.as_str()) {
                seen.push(&s.category);
            }
        }
        seen
    }
}

/// Everything issued by one `grade` call, as kept by the feedback ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingRecord {
    pub grading_id: GradingId,
    pub requester: UserId,
    pub language: String,
    pub results: BTreeMap<GradingDimension, GraderResult>,
    pub issued_at: DateTime<Utc>,
}

/// User feedback about a grading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub grading_id: GradingId,
    pub user_id: UserId,
    /// Usefulness rating on the configured scale (1-5 by default)
    pub rating: u8,
    pub comment: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl FeedbackRecord {
    pub fn new(grading_id: GradingId, user_id: UserId, rating: u8) -> Self {
        Self {
            grading_id,
            user_id,
            rating,
            comment: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Duplicate-detection key
    pub fn fingerprint(&self) -> FeedbackFingerprint {
        FeedbackFingerprint {
            grading_id: self.grading_id,
            timestamp: self.timestamp,
        }
    }
}

/// (grading id, timestamp) pair identifying one feedback event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedbackFingerprint {
    pub grading_id: GradingId,
    pub timestamp: DateTime<Utc>,
}

/// Anonymised cross-user suggestion frequency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectivePattern {
    pub dimension: GradingDimension,
    pub category: String,
    pub frequency: u64,
}

/// Key of a learning strategy
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StrategyKey {
    pub user: UserId,
    pub dimension: GradingDimension,
}

impl StrategyKey {
    pub fn new(user: UserId, dimension: GradingDimension) -> Self {
        Self { user, dimension }
    }
}

impl std::fmt::Display for StrategyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.user, self.dimension)
    }
}

/// Why feedback was not applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackRejection {
    StaleFeedback,
    DuplicateFeedback,
    InvalidFeedback,
    AdaptationUnavailable,
    StorageUnavailable,
}

impl std::fmt::Display for FeedbackRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedbackRejection::StaleFeedback => write!(f, "stale_feedback"),
            FeedbackRejection::DuplicateFeedback => write!(f, "duplicate_feedback"),
            FeedbackRejection::InvalidFeedback => write!(f, "invalid_feedback"),
            FeedbackRejection::AdaptationUnavailable => write!(f, "adaptation_unavailable"),
            FeedbackRejection::StorageUnavailable => write!(f, "storage_unavailable"),
        }
    }
}

/// Result of `submit_feedback`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackOutcome {
    pub applied: bool,
    pub reason: Option<FeedbackRejection>,
}

impl FeedbackOutcome {
    pub fn applied() -> Self {
        Self {
            applied: true,
            reason: None,
        }
    }

    pub fn rejected(reason: FeedbackRejection) -> Self {
        Self {
            applied: false,
            reason: Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_tags() {
        assert_eq!(GradingDimension::from("speed"), GradingDimension::Speed);
        assert_eq!(
            GradingDimension::from("security"),
            GradingDimension::Custom("security".to_string())
        );
        assert_eq!(GradingDimension::CodeQuality.to_string(), "code_quality");

        let json = serde_json::to_string(&GradingDimension::Reliability).unwrap();
        assert_eq!(json, "\"reliability\"");
        let back: GradingDimension = serde_json::from_str("\"code_quality\"").unwrap();
        assert_eq!(back, GradingDimension::CodeQuality);
    }

    #[test]
    fn test_feedback_level_steps_saturate() {
        assert_eq!(FeedbackLevel::Minimal.less_detailed(), FeedbackLevel::Minimal);
        assert_eq!(FeedbackLevel::Expert.more_detailed(), FeedbackLevel::Expert);
        assert_eq!(FeedbackLevel::Standard.more_detailed(), FeedbackLevel::Detailed);
        assert_eq!(FeedbackLevel::Detailed.less_detailed(), FeedbackLevel::Standard);
    }

    #[test]
    fn test_weight_normalization() {
        let mut weights = WeightSet::from_pairs(&[("a", 2.0), ("b", 3.0), ("c", 5.0)]);
        weights.normalize_weights();
        assert!((weights.sum() - 1.0).abs() < WEIGHT_TOLERANCE);
        assert!(weights.validate().is_ok());
        assert!((weights.get("c").unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_threshold_bands_reject_unordered() {
        assert!(ThresholdBands::from_pairs(&[("good", 75.0), ("excellent", 85.0)]).is_err());
        assert!(ThresholdBands::from_pairs(&[("a", 75.0), ("b", 75.0)]).is_err());
        assert!(ThresholdBands::from_pairs(&[]).is_err());

        let bad: std::result::Result<ThresholdBands, _> = serde_json::from_str(
            r#"[{"label":"good","boundary":70.0},{"label":"excellent","boundary":90.0}]"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_rating_labels() {
        let bands = ThresholdBands::from_pairs(&[
            ("excellent", 85.0),
            ("good", 75.0),
            ("acceptable", 65.0),
            ("needs_improvement", 50.0),
        ])
        .unwrap();

        assert_eq!(bands.rate(92.0), "excellent");
        assert_eq!(bands.rate(75.0), "good");
        assert_eq!(bands.rate(51.0), "needs_improvement");
        assert_eq!(bands.rate(10.0), BELOW_ALL_BANDS);
        assert!((bands.reference_boundary() - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_line_diagnostics_last_detection_wins() {
        let mut diags = LineDiagnostics::new();
        diags.insert(4, "first");
        diags.insert(2, "other");
        diags.insert(4, "second");

        assert_eq!(diags.len(), 2);
        assert_eq!(diags.get(4), Some("second"));
        let lines: Vec<usize> = diags.iter().map(|d| d.line).collect();
        assert_eq!(lines, vec![4, 2]);
    }
}
