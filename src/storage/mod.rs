//! Collaborator contracts for strategy persistence, the feedback ledger and
//! collective patterns
//!
//! The engine never touches disk or network itself; everything that can
//! suspend goes through these traits, and every call is bounded by
//! [`bounded`]. In-process implementations live in [`memory`] and can be
//! persisted between runs with [`snapshot`].

pub mod memory;
pub mod snapshot;

pub use memory::{InMemoryLedger, InMemoryPatternStore, InMemoryStrategyStore};
pub use snapshot::EngineSnapshot;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::{GradingError, Result};
use crate::evaluation::LearningStrategy;
use crate::types::{
    CollectivePattern, FeedbackOutcome, FeedbackRecord, GradingDimension, GradingId,
    GradingRecord, StrategyKey, UserId,
};

/// A strategy together with the store version it was read at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedStrategy {
    pub version: u64,
    pub strategy: LearningStrategy,
}

/// One write in an atomic batch
#[derive(Debug, Clone)]
pub struct StrategyWrite {
    /// `None` creates the strategy only if absent; `Some(v)` replaces it only
    /// if the stored version is still `v`
    pub expected_version: Option<u64>,
    pub strategy: LearningStrategy,
}

impl StrategyWrite {
    pub fn create(strategy: LearningStrategy) -> Self {
        Self {
            expected_version: None,
            strategy,
        }
    }

    pub fn replace(version: u64, strategy: LearningStrategy) -> Self {
        Self {
            expected_version: Some(version),
            strategy,
        }
    }
}

/// Result of a compare-and-swap batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    /// Every write was applied
    Stored,
    /// Nothing was applied; this key's version did not match
    Conflict(StrategyKey),
}

/// Keyed store of learning strategies
#[async_trait]
pub trait StrategyStore: Send + Sync {
    async fn get(&self, key: &StrategyKey) -> Result<Option<VersionedStrategy>>;

    /// Apply every write or none of them
    async fn put(&self, writes: Vec<StrategyWrite>) -> Result<PutOutcome>;

    /// Explicit deletion; returns whether a strategy existed
    async fn delete(&self, key: &StrategyKey) -> Result<bool>;

    /// All strategies, optionally restricted to one user, in key order
    async fn list(&self, user: Option<&UserId>) -> Result<Vec<LearningStrategy>>;
}

/// One feedback submission and what became of it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub feedback: FeedbackRecord,
    pub outcome: FeedbackOutcome,
    pub recorded_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(feedback: FeedbackRecord, outcome: FeedbackOutcome) -> Self {
        Self {
            feedback,
            outcome,
            recorded_at: Utc::now(),
        }
    }
}

/// Append-only record of issued gradings and received feedback
#[async_trait]
pub trait FeedbackLedger: Send + Sync {
    async fn record_grading(&self, record: &GradingRecord) -> Result<()>;

    async fn resolve(&self, grading_id: &GradingId) -> Result<Option<GradingRecord>>;

    async fn append_feedback(&self, entry: LedgerEntry) -> Result<()>;

    /// Entries for one grading, oldest first
    async fn feedback_for(&self, grading_id: &GradingId) -> Result<Vec<LedgerEntry>>;
}

/// Anonymous cross-user counters of suggestion categories
#[async_trait]
pub trait CollectivePatternStore: Send + Sync {
    async fn increment(&self, dimension: &GradingDimension, category: &str) -> Result<()>;

    /// Every counter, sorted by dimension then category
    async fn snapshot(&self) -> Result<Vec<CollectivePattern>>;

    /// Multiply every counter by `factor` (rounded down); zeroed counters are dropped
    async fn decay(&self, factor: f64) -> Result<()>;

    async fn reset(&self) -> Result<()>;
}

/// Run a collaborator call under `timeout`
///
/// Elapsed calls surface as `StorageUnavailable`; the future is dropped, so
/// an implementation must not leave a half-applied write behind.
pub async fn bounded<T, F>(timeout: Duration, operation: &str, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => {
            warn!("{} timed out after {:?}", operation, timeout);
            Err(GradingError::StorageUnavailable(format!(
                "{} timed out after {:?}",
                operation, timeout
            )))
        }
    }
}
