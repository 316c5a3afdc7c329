//! In-process collaborators
//!
//! Suitable for tests, the CLI and single-process deployments. Each store can
//! be exported and rebuilt so state survives between runs through
//! [`EngineSnapshot`](super::EngineSnapshot).

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::debug;

use super::{
    CollectivePatternStore, FeedbackLedger, LedgerEntry, PutOutcome, StrategyStore,
    StrategyWrite, VersionedStrategy,
};
use crate::error::{GradingError, Result};
use crate::evaluation::LearningStrategy;
use crate::types::{CollectivePattern, GradingDimension, GradingId, GradingRecord, StrategyKey, UserId};

fn poisoned(what: &str, e: impl std::fmt::Display) -> GradingError {
    GradingError::Other(format!("Failed to lock {}: {}", what, e))
}

/// Versioned strategy map with all-or-nothing batch writes
#[derive(Default)]
pub struct InMemoryStrategyStore {
    strategies: RwLock<BTreeMap<StrategyKey, VersionedStrategy>>,
}

impl InMemoryStrategyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<VersionedStrategy>) -> Self {
        let strategies = entries
            .into_iter()
            .map(|entry| (entry.strategy.key.clone(), entry))
            .collect();
        Self {
            strategies: RwLock::new(strategies),
        }
    }

    /// Every stored strategy with its version, in key order
    pub fn export(&self) -> Result<Vec<VersionedStrategy>> {
        let strategies = self.strategies.read().map_err(|e| poisoned("strategies", e))?;
        Ok(strategies.values().cloned().collect())
    }
}

#[async_trait]
impl StrategyStore for InMemoryStrategyStore {
    async fn get(&self, key: &StrategyKey) -> Result<Option<VersionedStrategy>> {
        let strategies = self.strategies.read().map_err(|e| poisoned("strategies", e))?;
        Ok(strategies.get(key).cloned())
    }

    async fn put(&self, writes: Vec<StrategyWrite>) -> Result<PutOutcome> {
        let mut strategies = self.strategies.write().map_err(|e| poisoned("strategies", e))?;

        for write in &writes {
            let key = &write.strategy.key;
            let current = strategies.get(key).map(|s| s.version);
            if current != write.expected_version {
                debug!(
                    "Version mismatch for {}: expected {:?}, found {:?}",
                    key, write.expected_version, current
                );
                return Ok(PutOutcome::Conflict(key.clone()));
            }
        }

        for write in writes {
            let version = write.expected_version.map(|v| v + 1).unwrap_or(1);
            strategies.insert(
                write.strategy.key.clone(),
                VersionedStrategy {
                    version,
                    strategy: write.strategy,
                },
            );
        }
        Ok(PutOutcome::Stored)
    }

    async fn delete(&self, key: &StrategyKey) -> Result<bool> {
        let mut strategies = self.strategies.write().map_err(|e| poisoned("strategies", e))?;
        Ok(strategies.remove(key).is_some())
    }

    async fn list(&self, user: Option<&UserId>) -> Result<Vec<LearningStrategy>> {
        let strategies = self.strategies.read().map_err(|e| poisoned("strategies", e))?;
        Ok(strategies
            .values()
            .filter(|s| user.map(|u| &s.strategy.key.user == u).unwrap_or(true))
            .map(|s| s.strategy.clone())
            .collect())
    }
}

/// Gradings by id plus the feedback log in arrival order
#[derive(Default)]
pub struct InMemoryLedger {
    gradings: RwLock<HashMap<GradingId, GradingRecord>>,
    feedback: RwLock<Vec<LedgerEntry>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(gradings: Vec<GradingRecord>, feedback: Vec<LedgerEntry>) -> Self {
        Self {
            gradings: RwLock::new(gradings.into_iter().map(|g| (g.grading_id, g)).collect()),
            feedback: RwLock::new(feedback),
        }
    }

    /// Gradings ordered by issue time, and the full feedback log
    pub fn export(&self) -> Result<(Vec<GradingRecord>, Vec<LedgerEntry>)> {
        let gradings = self.gradings.read().map_err(|e| poisoned("gradings", e))?;
        let feedback = self.feedback.read().map_err(|e| poisoned("feedback", e))?;

        let mut records: Vec<GradingRecord> = gradings.values().cloned().collect();
        records.sort_by(|a, b| {
            a.issued_at
                .cmp(&b.issued_at)
                .then_with(|| a.grading_id.cmp(&b.grading_id))
        });
        Ok((records, feedback.clone()))
    }
}

#[async_trait]
impl FeedbackLedger for InMemoryLedger {
    async fn record_grading(&self, record: &GradingRecord) -> Result<()> {
        let mut gradings = self.gradings.write().map_err(|e| poisoned("gradings", e))?;
        gradings.insert(record.grading_id, record.clone());
        Ok(())
    }

    async fn resolve(&self, grading_id: &GradingId) -> Result<Option<GradingRecord>> {
        let gradings = self.gradings.read().map_err(|e| poisoned("gradings", e))?;
        Ok(gradings.get(grading_id).cloned())
    }

    async fn append_feedback(&self, entry: LedgerEntry) -> Result<()> {
        let mut feedback = self.feedback.write().map_err(|e| poisoned("feedback", e))?;
        feedback.push(entry);
        Ok(())
    }

    async fn feedback_for(&self, grading_id: &GradingId) -> Result<Vec<LedgerEntry>> {
        let feedback = self.feedback.read().map_err(|e| poisoned("feedback", e))?;
        Ok(feedback
            .iter()
            .filter(|e| &e.feedback.grading_id == grading_id)
            .cloned()
            .collect())
    }
}

type PatternKey = (GradingDimension, String);

/// Lock-free counters once a (dimension, category) pair exists
#[derive(Default)]
pub struct InMemoryPatternStore {
    counters: RwLock<HashMap<PatternKey, Arc<AtomicU64>>>,
}

impl InMemoryPatternStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_patterns(patterns: Vec<CollectivePattern>) -> Self {
        let counters = patterns
            .into_iter()
            .map(|p| ((p.dimension, p.category), Arc::new(AtomicU64::new(p.frequency))))
            .collect();
        Self {
            counters: RwLock::new(counters),
        }
    }

    fn collect(&self) -> Result<Vec<CollectivePattern>> {
        let counters = self.counters.read().map_err(|e| poisoned("patterns", e))?;
        let mut patterns: Vec<CollectivePattern> = counters
            .iter()
            .map(|((dimension, category), counter)| CollectivePattern {
                dimension: dimension.clone(),
                category: category.clone(),
                frequency: counter.load(Ordering::Relaxed),
            })
            .collect();
        patterns.sort_by(|a, b| {
            a.dimension
                .cmp(&b.dimension)
                .then_with(|| a.category.cmp(&b.category))
        });
        Ok(patterns)
    }

    pub fn export(&self) -> Result<Vec<CollectivePattern>> {
        self.collect()
    }
}

#[async_trait]
impl CollectivePatternStore for InMemoryPatternStore {
    async fn increment(&self, dimension: &GradingDimension, category: &str) -> Result<()> {
        let key = (dimension.clone(), category.to_string());
        {
            let counters = self.counters.read().map_err(|e| poisoned("patterns", e))?;
            if let Some(counter) = counters.get(&key) {
                counter.fetch_add(1, Ordering::Relaxed);
                return Ok(());
            }
        }

        let mut counters = self.counters.write().map_err(|e| poisoned("patterns", e))?;
        counters
            .entry(key)
            .or_insert_with(|| Arc::new(AtomicU64::new(0)))
            .fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn snapshot(&self) -> Result<Vec<CollectivePattern>> {
        self.collect()
    }

    async fn decay(&self, factor: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&factor) {
            return Err(GradingError::Other(format!(
                "decay factor {} outside [0, 1]",
                factor
            )));
        }
        let mut counters = self.counters.write().map_err(|e| poisoned("patterns", e))?;
        counters.retain(|_, counter| {
            let decayed = (counter.load(Ordering::Relaxed) as f64 * factor).floor() as u64;
            counter.store(decayed, Ordering::Relaxed);
            decayed > 0
        });
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        let mut counters = self.counters.write().map_err(|e| poisoned("patterns", e))?;
        counters.clear();
        Ok(())
    }
}
