//! Per-strategy serialization of feedback
//!
//! Feedback for one (user, dimension) pair is applied one event at a time;
//! different keys proceed concurrently. Locks are acquired in key order so a
//! grading that spans several dimensions cannot deadlock against another.
//! Entries nobody holds or waits on are pruned when a new key arrives, so the
//! table tracks active keys rather than every key ever seen.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::error::{GradingError, Result};
use crate::types::StrategyKey;

#[derive(Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<StrategyKey, Arc<AsyncMutex<()>>>>,
}

/// Guards held for the duration of one read-modify-write
pub struct KeyGuards {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, key: &StrategyKey) -> Result<Arc<AsyncMutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|e| GradingError::Other(format!("Failed to lock strategy locks: {}", e)))?;
        if !locks.contains_key(key) {
            // only the table references an idle lock
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        Ok(locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone())
    }

    /// Lock every key in `keys`, in order
    pub async fn acquire(&self, keys: &BTreeSet<StrategyKey>) -> Result<KeyGuards> {
        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            let handle = self.handle(key)?;
            guards.push(handle.lock_owned().await);
        }
        Ok(KeyGuards { _guards: guards })
    }

    /// Number of keys currently tracked
    pub fn len(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GradingDimension, UserId};
    use std::time::Duration;

    fn key(user: &str, dimension: GradingDimension) -> StrategyKey {
        StrategyKey::new(UserId::new(user), dimension)
    }

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = Arc::new(KeyedLocks::new());
        let keys: BTreeSet<_> = [key("a", GradingDimension::Speed)].into_iter().collect();

        let held = locks.acquire(&keys).await.unwrap();
        let contender = {
            let locks = locks.clone();
            let keys = keys.clone();
            tokio::spawn(async move { locks.acquire(&keys).await.map(|_| ()) })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());
        drop(held);
        contender.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let first: BTreeSet<_> = [key("a", GradingDimension::Speed)].into_iter().collect();
        let second: BTreeSet<_> = [key("b", GradingDimension::Speed)].into_iter().collect();

        let _held = locks.acquire(&first).await.unwrap();
        let other = tokio::time::timeout(Duration::from_millis(100), locks.acquire(&second)).await;
        assert!(other.is_ok());
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_idle_keys_are_pruned() {
        let locks = KeyedLocks::new();
        for user in ["a", "b", "c", "d"] {
            let keys: BTreeSet<_> = [key(user, GradingDimension::Speed)].into_iter().collect();
            drop(locks.acquire(&keys).await.unwrap());
        }
        assert_eq!(locks.len(), 1);

        let held_keys: BTreeSet<_> = [key("e", GradingDimension::Speed)].into_iter().collect();
        let _held = locks.acquire(&held_keys).await.unwrap();
        let next: BTreeSet<_> = [key("f", GradingDimension::Speed)].into_iter().collect();
        drop(locks.acquire(&next).await.unwrap());
        // "e" is still held, "d" was idle
        assert_eq!(locks.len(), 2);
    }
}
