//! Common test utilities and helpers
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use toasty_core::evaluation::LearningStrategy;
use toasty_core::storage::{
    InMemoryLedger, InMemoryPatternStore, InMemoryStrategyStore, PutOutcome, StrategyStore,
    StrategyWrite, VersionedStrategy,
};
use toasty_core::types::StrategyKey;
use toasty_core::{
    EngineConfig, GradeRequest, GraderRegistry, GradingEngine, Language, Result, UserId,
};

pub const UNDOCUMENTED: &str = "def f(): pass\n";

pub const DOCUMENTED: &str = r#"
def add(left, right):
    """Return the sum of left and right."""
    return left + right
"#;

/// Documented and commented: readability at its maximum
pub const COMMENTED: &str = r#"
# Arithmetic helpers
def add(left, right):
    """Return the sum of left and right."""
    # plain addition
    return left + right
"#;

/// Engine with built-in graders over fresh in-memory stores
pub fn create_test_engine() -> GradingEngine {
    GradingEngine::in_memory(EngineConfig::default()).expect("Failed to create test engine")
}

/// Engine with built-in graders and a custom configuration
pub fn engine_with_config(config: EngineConfig) -> GradingEngine {
    GradingEngine::in_memory(config).expect("Failed to create test engine")
}

/// Engine over the given strategy store, with a short collaborator timeout
pub fn engine_with_store(store: Arc<dyn StrategyStore>) -> GradingEngine {
    let mut config = EngineConfig::default();
    config.storage.timeout = Duration::from_millis(50);
    let registry = GraderRegistry::with_builtin_graders(&config.grading);
    GradingEngine::new(
        config,
        registry,
        store,
        Arc::new(InMemoryLedger::new()),
        Arc::new(InMemoryPatternStore::new()),
    )
    .expect("Failed to create test engine")
}

pub fn python(code: &str, user: &str) -> GradeRequest {
    GradeRequest::new(code, Language::Python, UserId::new(user))
}

/// Python function with `n` nested `if` branches
pub fn nested_branches(n: usize) -> String {
    let mut source = String::from("def branchy(x):\n    \"\"\"Many branches.\"\"\"\n    total = 0\n");
    for depth in 0..n {
        let indent = "    ".repeat(depth + 1);
        source.push_str(&format!("{}if x > {}:\n", indent, depth));
    }
    source.push_str(&format!("{}total += 1\n", "    ".repeat(n + 1)));
    source.push_str("    return total\n");
    source
}

/// Strategy store whose writes never land before the timeout
///
/// Reads delegate to an in-memory store so grading still works.
#[derive(Default)]
pub struct HangingWriteStore {
    pub inner: InMemoryStrategyStore,
    pub attempted_writes: AtomicUsize,
}

#[async_trait]
impl StrategyStore for HangingWriteStore {
    async fn get(&self, key: &StrategyKey) -> Result<Option<VersionedStrategy>> {
        self.inner.get(key).await
    }

    async fn put(&self, writes: Vec<StrategyWrite>) -> Result<PutOutcome> {
        self.attempted_writes.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(5)).await;
        self.inner.put(writes).await
    }

    async fn delete(&self, key: &StrategyKey) -> Result<bool> {
        self.inner.delete(key).await
    }

    async fn list(&self, user: Option<&UserId>) -> Result<Vec<LearningStrategy>> {
        self.inner.list(user).await
    }
}

/// Strategy store that reports a version conflict on every replace
///
/// Create-if-absent writes still succeed, so grading can seed strategies.
#[derive(Default)]
pub struct AlwaysConflictingStore {
    pub inner: InMemoryStrategyStore,
    pub conflicts: AtomicUsize,
}

#[async_trait]
impl StrategyStore for AlwaysConflictingStore {
    async fn get(&self, key: &StrategyKey) -> Result<Option<VersionedStrategy>> {
        self.inner.get(key).await
    }

    async fn put(&self, writes: Vec<StrategyWrite>) -> Result<PutOutcome> {
        if let Some(write) = writes.iter().find(|w| w.expected_version.is_some()) {
            self.conflicts.fetch_add(1, Ordering::SeqCst);
            return Ok(PutOutcome::Conflict(write.strategy.key.clone()));
        }
        self.inner.put(writes).await
    }

    async fn delete(&self, key: &StrategyKey) -> Result<bool> {
        self.inner.delete(key).await
    }

    async fn list(&self, user: Option<&UserId>) -> Result<Vec<LearningStrategy>> {
        self.inner.list(user).await
    }
}
