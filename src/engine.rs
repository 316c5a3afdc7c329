//! Grading engine facade
//!
//! Wires the grader registry, the meta-learner and the three collaborators
//! together behind the two core operations, [`GradingEngine::grade`] and
//! [`GradingEngine::submit_feedback`], plus cancellable batch grading and
//! strategy administration.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::error::{GradingError, Result};
use crate::evaluation::{KeyedLocks, LearningStrategy, MetaLearner, UserProgress};
use crate::grading::{Grader, GraderRegistry};
use crate::storage::{
    bounded, CollectivePatternStore, FeedbackLedger, InMemoryLedger, InMemoryPatternStore,
    InMemoryStrategyStore, LedgerEntry, PutOutcome, StrategyStore, StrategyWrite,
};
use crate::syntax::{build_model, Language};
use crate::types::{
    CollectivePattern, FeedbackOutcome, FeedbackRecord, FeedbackRejection, GraderResult,
    GradingDimension, GradingId, GradingRecord, StrategyKey, UserId,
};

/// One `grade` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRequest {
    pub code: String,
    pub language: Language,
    /// Empty means `code_quality` only
    #[serde(default)]
    pub dimensions: BTreeSet<GradingDimension>,
    pub requester: UserId,
}

impl GradeRequest {
    pub fn new(code: impl Into<String>, language: Language, requester: UserId) -> Self {
        Self {
            code: code.into(),
            language,
            dimensions: BTreeSet::new(),
            requester,
        }
    }

    pub fn with_dimension(mut self, dimension: GradingDimension) -> Self {
        self.dimensions.insert(dimension);
        self
    }

    pub fn with_dimensions(mut self, dimensions: impl IntoIterator<Item = GradingDimension>) -> Self {
        self.dimensions.extend(dimensions);
        self
    }
}

/// What `grade` returns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeOutcome {
    pub grading_id: GradingId,
    /// Mean of the graded dimensions' scores
    pub overall_score: f64,
    pub per_dimension: BTreeMap<GradingDimension, GraderResult>,
    /// Requested dimensions with no registered grader
    pub unknown_dimensions: Vec<GradingDimension>,
}

/// What `grade_batch` returns
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// (request index, outcome) in request order
    pub completed: Vec<(usize, GradeOutcome)>,
    /// (request index, error) for requests that failed on their own
    pub failed: Vec<(usize, GradingError)>,
    pub cancelled: bool,
    /// Requests abandoned after cancellation, including one in flight
    pub skipped: usize,
}

pub struct GradingEngine {
    registry: Arc<GraderRegistry>,
    strategies: Arc<dyn StrategyStore>,
    ledger: Arc<dyn FeedbackLedger>,
    patterns: Arc<dyn CollectivePatternStore>,
    learner: MetaLearner,
    locks: KeyedLocks,
    config: EngineConfig,
}

impl GradingEngine {
    /// Build an engine over the given collaborators
    ///
    /// Fails if the configuration is invalid or a grader declares more
    /// metrics than the weight floor allows.
    pub fn new(
        config: EngineConfig,
        registry: GraderRegistry,
        strategies: Arc<dyn StrategyStore>,
        ledger: Arc<dyn FeedbackLedger>,
        patterns: Arc<dyn CollectivePatternStore>,
    ) -> Result<Self> {
        config.validate()?;
        for grader in registry.graders() {
            let metrics = grader.default_weights().len() as f64;
            if metrics * config.adaptation.weight_floor > 1.0 {
                return Err(GradingError::InvalidStrategy(format!(
                    "{} metrics of {} cannot all keep the weight floor {}",
                    metrics,
                    grader.dimension(),
                    config.adaptation.weight_floor
                )));
            }
            grader.default_weights().validate()?;
        }

        info!(
            "Grading engine ready with dimensions {:?}",
            registry.dimensions()
        );
        Ok(Self {
            registry: Arc::new(registry),
            strategies,
            ledger,
            patterns,
            learner: MetaLearner::new(config.adaptation.clone()),
            locks: KeyedLocks::new(),
            config,
        })
    }

    /// Engine with the built-in graders and fresh in-memory collaborators
    pub fn in_memory(config: EngineConfig) -> Result<Self> {
        let registry = GraderRegistry::with_builtin_graders(&config.grading);
        Self::new(
            config,
            registry,
            Arc::new(InMemoryStrategyStore::new()),
            Arc::new(InMemoryLedger::new()),
            Arc::new(InMemoryPatternStore::new()),
        )
    }

    pub fn registry(&self) -> &GraderRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn fresh_strategy(&self, user: &UserId, grader: &dyn Grader) -> LearningStrategy {
        LearningStrategy::from_grader(
            user.clone(),
            grader,
            self.config.adaptation.initial_improvement_rate,
        )
    }

    /// Grade `request.code` along every requested dimension
    pub async fn grade(&self, request: GradeRequest) -> Result<GradeOutcome> {
        let timeout = self.config.storage.timeout;
        let GradeRequest {
            code,
            language,
            dimensions,
            requester,
        } = request;

        let requested = if dimensions.is_empty() {
            BTreeSet::from([GradingDimension::CodeQuality])
        } else {
            dimensions
        };
        let (known, unknown): (Vec<GradingDimension>, Vec<GradingDimension>) = requested
            .into_iter()
            .partition(|d| self.registry.contains(d));

        if known.is_empty() {
            let names: Vec<&str> = unknown.iter().map(|d| d.as_str()).collect();
            return Err(GradingError::UnknownDimension(names.join(", ")));
        }
        for dimension in &unknown {
            warn!("No grader registered for dimension {}", dimension);
        }

        // Snapshot the strategies; grading never writes through them
        let mut graders: Vec<(Arc<dyn Grader>, LearningStrategy)> = Vec::with_capacity(known.len());
        let mut created = Vec::new();
        for dimension in &known {
            let Some(grader) = self.registry.get(dimension) else {
                continue;
            };
            let key = StrategyKey::new(requester.clone(), dimension.clone());
            let strategy = match bounded(timeout, "strategy lookup", self.strategies.get(&key)).await? {
                Some(stored) => stored.strategy,
                None => {
                    let fresh = self.fresh_strategy(&requester, grader.as_ref());
                    created.push(fresh.clone());
                    fresh
                }
            };
            graders.push((grader, strategy));
        }

        let per_dimension = tokio::task::spawn_blocking(move || -> Result<BTreeMap<GradingDimension, GraderResult>> {
            let model = build_model(&code, language)?;
            Ok(graders
                .iter()
                .map(|(grader, strategy)| (grader.dimension(), grader.grade(&model, strategy)))
                .collect())
        })
        .await
        .map_err(|e| {
            error!("Grading task failed: {}", e);
            GradingError::Other(format!("Grading task failed: {}", e))
        })??;

        for strategy in created {
            let key = strategy.key.clone();
            match bounded(
                timeout,
                "strategy create",
                self.strategies.put(vec![StrategyWrite::create(strategy)]),
            )
            .await
            {
                Ok(PutOutcome::Stored) => debug!("Created strategy {}", key),
                Ok(PutOutcome::Conflict(_)) => debug!("Strategy {} created concurrently", key),
                Err(e) => warn!("Could not create strategy {}: {}", key, e),
            }
        }

        let overall_score =
            per_dimension.values().map(|r| r.score).sum::<f64>() / per_dimension.len() as f64;
        let grading_id = GradingId::new();
        let record = GradingRecord {
            grading_id,
            requester: requester.clone(),
            language: language.to_string(),
            results: per_dimension.clone(),
            issued_at: chrono::Utc::now(),
        };
        bounded(timeout, "ledger record", self.ledger.record_grading(&record)).await?;

        info!(
            "Graded {} for {} on {} dimension(s): {:.1}",
            grading_id,
            requester,
            per_dimension.len(),
            overall_score
        );
        Ok(GradeOutcome {
            grading_id,
            overall_score,
            per_dimension,
            unknown_dimensions: unknown,
        })
    }

    /// Grade requests one after another until done or cancelled
    ///
    /// Cancellation abandons the request in flight and every remaining one;
    /// results already completed are kept.
    pub async fn grade_batch(
        &self,
        requests: Vec<GradeRequest>,
        cancel: CancellationToken,
    ) -> BatchOutcome {
        let total = requests.len();
        let mut outcome = BatchOutcome::default();

        for (index, request) in requests.into_iter().enumerate() {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = self.grade(request) => Some(result),
            };
            match result {
                Some(Ok(graded)) => outcome.completed.push((index, graded)),
                Some(Err(e)) => {
                    debug!("Batch item {} failed: {}", index, e);
                    outcome.failed.push((index, e));
                }
                None => {
                    outcome.cancelled = true;
                    outcome.skipped = total - index;
                    info!(
                        "Batch cancelled after {} of {} item(s)",
                        index, total
                    );
                    break;
                }
            }
        }

        outcome
    }

    /// Apply user feedback about an earlier grading
    ///
    /// Never fails: every rejection is reported in the outcome and leaves
    /// stored strategies untouched.
    pub async fn submit_feedback(&self, feedback: FeedbackRecord) -> FeedbackOutcome {
        let grading = match self.resolve_grading(&feedback.grading_id).await {
            Ok(grading) => grading,
            Err(e @ GradingError::StaleFeedback(_)) => {
                warn!("{}", e);
                return self
                    .log_feedback(feedback, FeedbackOutcome::rejected(rejection_for(&e)))
                    .await;
            }
            Err(e) => {
                warn!("Cannot resolve grading {}: {}", feedback.grading_id, e);
                return FeedbackOutcome::rejected(rejection_for(&e));
            }
        };

        if let Err(e) = self.learner.validate_feedback(&feedback, &grading) {
            warn!("Rejected feedback for {}: {}", feedback.grading_id, e);
            return self
                .log_feedback(feedback, FeedbackOutcome::rejected(rejection_for(&e)))
                .await;
        }

        let targets = self.feedback_targets(&grading);
        if targets.is_empty() {
            warn!("No registered grader for grading {}", grading.grading_id);
            return self
                .log_feedback(
                    feedback,
                    FeedbackOutcome::rejected(FeedbackRejection::AdaptationUnavailable),
                )
                .await;
        }

        let keys: BTreeSet<StrategyKey> = targets
            .iter()
            .map(|(grader, _)| StrategyKey::new(feedback.user_id.clone(), grader.dimension()))
            .collect();
        // Held until the outcome is in the ledger, which later duplicates consult
        let _guards = match self.locks.acquire(&keys).await {
            Ok(guards) => guards,
            Err(e) => {
                warn!("Feedback for {} not applied: {}", feedback.grading_id, e);
                return FeedbackOutcome::rejected(rejection_for(&e));
            }
        };

        let outcome = match self.apply_feedback(&feedback, &targets).await {
            Ok(true) => FeedbackOutcome::applied(),
            Ok(false) => {
                info!(
                    "Duplicate feedback for {} at {}",
                    feedback.grading_id, feedback.timestamp
                );
                FeedbackOutcome::rejected(FeedbackRejection::DuplicateFeedback)
            }
            Err(e) => {
                warn!("Feedback for {} not applied: {}", feedback.grading_id, e);
                FeedbackOutcome::rejected(rejection_for(&e))
            }
        };

        if outcome.applied {
            self.record_patterns(&grading).await;
        }
        self.log_feedback(feedback, outcome).await
    }

    async fn resolve_grading(&self, grading_id: &GradingId) -> Result<GradingRecord> {
        bounded(
            self.config.storage.timeout,
            "ledger resolve",
            self.ledger.resolve(grading_id),
        )
        .await?
        .ok_or_else(|| GradingError::StaleFeedback(grading_id.to_string()))
    }

    /// Registered graders for each result in the grading
    fn feedback_targets<'a>(&self, grading: &'a GradingRecord) -> Vec<(Arc<dyn Grader>, &'a GraderResult)> {
        grading
            .results
            .iter()
            .filter_map(|(dimension, result)| match self.registry.get(dimension) {
                Some(grader) => Some((grader, result)),
                None => {
                    debug!("Skipping unregistered dimension {}", dimension);
                    None
                }
            })
            .collect()
    }

    /// Read-modify-write of every targeted strategy; the caller holds their locks
    ///
    /// Returns `Ok(false)` when this feedback was already applied.
    async fn apply_feedback(
        &self,
        feedback: &FeedbackRecord,
        targets: &[(Arc<dyn Grader>, &GraderResult)],
    ) -> Result<bool> {
        let timeout = self.config.storage.timeout;
        let budget = self.config.adaptation.retry_budget;
        let fingerprint = feedback.fingerprint();

        // The ledger keeps every applied fingerprint; the strategy window only
        // the most recent ones
        let history = bounded(
            timeout,
            "ledger history",
            self.ledger.feedback_for(&feedback.grading_id),
        )
        .await?;
        if history
            .iter()
            .any(|entry| entry.outcome.applied && entry.feedback.fingerprint() == fingerprint)
        {
            return Ok(false);
        }

        for attempt in 1..=budget {
            let mut writes = Vec::with_capacity(targets.len());
            for (grader, result) in targets {
                let key = StrategyKey::new(feedback.user_id.clone(), grader.dimension());
                let current = bounded(timeout, "strategy read", self.strategies.get(&key)).await?;
                let (expected_version, mut strategy) = match current {
                    Some(stored) => (Some(stored.version), stored.strategy),
                    None => (None, self.fresh_strategy(&feedback.user_id, grader.as_ref())),
                };
                if strategy.has_applied(&fingerprint) {
                    return Ok(false);
                }

                self.learner.adapt(&mut strategy, result, feedback);
                strategy.validate()?;
                writes.push(StrategyWrite {
                    expected_version,
                    strategy,
                });
            }

            match self.store_writes(writes).await {
                Ok(()) => {
                    debug!("Applied feedback for {}", feedback.grading_id);
                    return Ok(true);
                }
                Err(e @ GradingError::StrategyConflict(_)) => {
                    warn!("{} (attempt {}/{})", e, attempt, budget);
                }
                Err(e) => return Err(e),
            }
        }

        Err(GradingError::AdaptationUnavailable(format!(
            "strategy conflicts persisted after {} attempts",
            budget
        )))
    }

    async fn store_writes(&self, writes: Vec<StrategyWrite>) -> Result<()> {
        match bounded(self.config.storage.timeout, "strategy write", self.strategies.put(writes)).await? {
            PutOutcome::Stored => Ok(()),
            PutOutcome::Conflict(key) => Err(GradingError::StrategyConflict(key.to_string())),
        }
    }

    /// Best-effort: count each suggestion category once per result
    async fn record_patterns(&self, grading: &GradingRecord) {
        let timeout = self.config.storage.timeout;
        for (dimension, result) in &grading.results {
            for category in result.categories() {
                if let Err(e) = bounded(
                    timeout,
                    "pattern increment",
                    self.patterns.increment(dimension, category),
                )
                .await
                {
                    warn!("Dropped pattern {}/{}: {}", dimension, category, e);
                }
            }
        }
    }

    /// Best-effort ledger append; returns `outcome` unchanged
    async fn log_feedback(&self, feedback: FeedbackRecord, outcome: FeedbackOutcome) -> FeedbackOutcome {
        let timeout = self.config.storage.timeout;
        let entry = LedgerEntry::new(feedback, outcome.clone());
        if let Err(e) = bounded(timeout, "ledger append", self.ledger.append_feedback(entry)).await {
            warn!("Feedback not logged: {}", e);
        }
        outcome
    }

    /// Current strategy for (user, dimension), if one exists
    pub async fn strategy_for(
        &self,
        user: &UserId,
        dimension: &GradingDimension,
    ) -> Result<Option<LearningStrategy>> {
        let key = StrategyKey::new(user.clone(), dimension.clone());
        let stored = bounded(self.config.storage.timeout, "strategy lookup", self.strategies.get(&key)).await?;
        Ok(stored.map(|s| s.strategy))
    }

    /// Every stored strategy, optionally for one user
    pub async fn strategies(&self, user: Option<&UserId>) -> Result<Vec<LearningStrategy>> {
        bounded(self.config.storage.timeout, "strategy list", self.strategies.list(user)).await
    }

    /// Effectiveness and skill summary over one user's strategies
    pub async fn user_progress(&self, user: &UserId) -> Result<UserProgress> {
        let strategies = self.strategies(Some(user)).await?;
        Ok(UserProgress::from_strategies(user.clone(), &strategies))
    }

    /// Explicitly delete a strategy; the next grading starts from defaults
    pub async fn delete_strategy(&self, user: &UserId, dimension: &GradingDimension) -> Result<bool> {
        let key = StrategyKey::new(user.clone(), dimension.clone());
        let _guard = self.locks.acquire(&BTreeSet::from([key.clone()])).await?;
        let deleted = bounded(self.config.storage.timeout, "strategy delete", self.strategies.delete(&key)).await?;
        if deleted {
            info!("Deleted strategy {}", key);
        }
        Ok(deleted)
    }

    pub async fn collective_patterns(&self) -> Result<Vec<CollectivePattern>> {
        bounded(self.config.storage.timeout, "pattern snapshot", self.patterns.snapshot()).await
    }

    pub async fn decay_patterns(&self, factor: f64) -> Result<()> {
        bounded(self.config.storage.timeout, "pattern decay", self.patterns.decay(factor)).await
    }

    pub async fn reset_patterns(&self) -> Result<()> {
        bounded(self.config.storage.timeout, "pattern reset", self.patterns.reset()).await
    }

    /// Ledger entries for one grading, oldest first
    pub async fn feedback_history(&self, grading_id: &GradingId) -> Result<Vec<LedgerEntry>> {
        bounded(self.config.storage.timeout, "ledger history", self.ledger.feedback_for(grading_id)).await
    }
}

fn rejection_for(err: &GradingError) -> FeedbackRejection {
    match err {
        GradingError::StorageUnavailable(_) => FeedbackRejection::StorageUnavailable,
        GradingError::InvalidFeedback(_) => FeedbackRejection::InvalidFeedback,
        GradingError::StaleFeedback(_) => FeedbackRejection::StaleFeedback,
        GradingError::StrategyConflict(_) | GradingError::AdaptationUnavailable(_) => {
            FeedbackRejection::AdaptationUnavailable
        }
        _ => FeedbackRejection::AdaptationUnavailable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> GradingEngine {
        GradingEngine::in_memory(EngineConfig::default()).unwrap()
    }

    fn request(code: &str) -> GradeRequest {
        GradeRequest::new(code, Language::Python, UserId::new("alice"))
    }

    #[tokio::test]
    async fn test_default_dimension_is_code_quality() {
        let engine = engine();
        let outcome = engine.grade(request("def f():\n    pass\n")).await.unwrap();
        assert_eq!(outcome.per_dimension.len(), 1);
        assert!(outcome.per_dimension.contains_key(&GradingDimension::CodeQuality));
        assert_eq!(
            outcome.overall_score,
            outcome.per_dimension[&GradingDimension::CodeQuality].score
        );
    }

    #[tokio::test]
    async fn test_unknown_dimension_reported_alongside_known() {
        let engine = engine();
        let outcome = engine
            .grade(
                request("x = 1\n")
                    .with_dimension(GradingDimension::Speed)
                    .with_dimension(GradingDimension::Custom("style".to_string())),
            )
            .await
            .unwrap();
        assert_eq!(outcome.per_dimension.len(), 1);
        assert_eq!(
            outcome.unknown_dimensions,
            vec![GradingDimension::Custom("style".to_string())]
        );
    }

    #[tokio::test]
    async fn test_only_unknown_dimensions_fail_without_record() {
        let engine = engine();
        let result = engine
            .grade(request("x = 1\n").with_dimension(GradingDimension::Custom("style".to_string())))
            .await;
        assert!(matches!(result, Err(GradingError::UnknownDimension(_))));
        assert!(engine.strategies(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_parse_failure_returns_no_result() {
        let engine = engine();
        let result = engine.grade(request("def broken(:\n")).await;
        assert!(matches!(result, Err(GradingError::ParseFailure { .. })));
    }

    #[tokio::test]
    async fn test_grading_creates_strategy_lazily() {
        let engine = engine();
        let user = UserId::new("alice");
        assert!(engine
            .strategy_for(&user, &GradingDimension::CodeQuality)
            .await
            .unwrap()
            .is_none());

        engine.grade(request("x = 1\n")).await.unwrap();
        let strategy = engine
            .strategy_for(&user, &GradingDimension::CodeQuality)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(strategy.sample_count, 0);
    }

    #[tokio::test]
    async fn test_feedback_applies_once() {
        let engine = engine();
        let outcome = engine.grade(request("def f():\n    pass\n")).await.unwrap();
        let feedback = FeedbackRecord::new(outcome.grading_id, UserId::new("alice"), 2);

        assert_eq!(engine.submit_feedback(feedback.clone()).await, FeedbackOutcome::applied());
        assert_eq!(
            engine.submit_feedback(feedback).await,
            FeedbackOutcome::rejected(FeedbackRejection::DuplicateFeedback)
        );

        let strategy = engine
            .strategy_for(&UserId::new("alice"), &GradingDimension::CodeQuality)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(strategy.sample_count, 1);
        assert_eq!(engine.feedback_history(&outcome.grading_id).await.unwrap().len(), 2);
        assert!(!engine.collective_patterns().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_feedback_from_another_user_is_invalid() {
        let engine = engine();
        let outcome = engine.grade(request("x = 1\n")).await.unwrap();
        let feedback = FeedbackRecord::new(outcome.grading_id, UserId::new("mallory"), 5);
        assert_eq!(
            engine.submit_feedback(feedback).await,
            FeedbackOutcome::rejected(FeedbackRejection::InvalidFeedback)
        );
        assert!(engine
            .strategy_for(&UserId::new("mallory"), &GradingDimension::CodeQuality)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_delete_strategy() {
        let engine = engine();
        engine.grade(request("x = 1\n")).await.unwrap();
        let user = UserId::new("alice");
        assert!(engine.delete_strategy(&user, &GradingDimension::CodeQuality).await.unwrap());
        assert!(!engine.delete_strategy(&user, &GradingDimension::CodeQuality).await.unwrap());
    }

    #[tokio::test]
    async fn test_user_progress_tracks_positive_feedback() {
        let engine = engine();
        let user = UserId::new("alice");
        for rating in [5, 1, 4] {
            let outcome = engine.grade(request("def f():\n    pass\n")).await.unwrap();
            let feedback = FeedbackRecord::new(outcome.grading_id, user.clone(), rating);
            assert!(engine.submit_feedback(feedback).await.applied);
        }

        let progress = engine.user_progress(&user).await.unwrap();
        assert_eq!(progress.strategies.len(), 1);
        assert_eq!(progress.total_feedback, 3);
        assert_eq!(progress.total_successes, 2);
        assert!((progress.effectiveness - 2.0 / 3.0).abs() < 1e-12);
        assert!(progress.skill_estimate.is_some());

        let nobody = engine.user_progress(&UserId::new("bob")).await.unwrap();
        assert!(nobody.strategies.is_empty());
    }

    #[test]
    fn test_rejection_for_errors() {
        assert_eq!(
            rejection_for(&GradingError::StaleFeedback("g".to_string())),
            FeedbackRejection::StaleFeedback
        );
        assert_eq!(
            rejection_for(&GradingError::StrategyConflict("alice/speed".to_string())),
            FeedbackRejection::AdaptationUnavailable
        );
        assert_eq!(
            rejection_for(&GradingError::StorageUnavailable("ledger".to_string())),
            FeedbackRejection::StorageUnavailable
        );
        assert_eq!(
            rejection_for(&GradingError::InvalidFeedback("rating".to_string())),
            FeedbackRejection::InvalidFeedback
        );
    }

    #[test]
    fn test_weight_floor_must_fit_metrics() {
        let mut config = EngineConfig::default();
        config.adaptation.weight_floor = 0.3;
        assert!(matches!(
            GradingEngine::in_memory(config),
            Err(GradingError::InvalidStrategy(_))
        ));
    }
}
