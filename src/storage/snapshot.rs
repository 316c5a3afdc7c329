//! JSON snapshot of the in-memory collaborators

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::memory::{InMemoryLedger, InMemoryPatternStore, InMemoryStrategyStore};
use super::{LedgerEntry, VersionedStrategy};
use crate::error::Result;
use crate::types::{CollectivePattern, GradingRecord};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub saved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub strategies: Vec<VersionedStrategy>,
    #[serde(default)]
    pub gradings: Vec<GradingRecord>,
    #[serde(default)]
    pub feedback: Vec<LedgerEntry>,
    #[serde(default)]
    pub patterns: Vec<CollectivePattern>,
}

impl EngineSnapshot {
    /// Capture the current contents of the stores
    pub fn capture(
        strategies: &InMemoryStrategyStore,
        ledger: &InMemoryLedger,
        patterns: &InMemoryPatternStore,
    ) -> Result<Self> {
        let (gradings, feedback) = ledger.export()?;
        Ok(Self {
            saved_at: Some(Utc::now()),
            strategies: strategies.export()?,
            gradings,
            feedback,
            patterns: patterns.export()?,
        })
    }

    /// Rebuild the stores from this snapshot
    pub fn into_stores(self) -> (InMemoryStrategyStore, InMemoryLedger, InMemoryPatternStore) {
        (
            InMemoryStrategyStore::from_entries(self.strategies),
            InMemoryLedger::from_parts(self.gradings, self.feedback),
            InMemoryPatternStore::from_patterns(self.patterns),
        )
    }

    /// Load a snapshot, or an empty one if `path` does not exist yet
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No state at {}, starting empty", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let snapshot: EngineSnapshot = serde_json::from_str(&contents)?;
        debug!(
            "Loaded {} strategies and {} gradings from {}",
            snapshot.strategies.len(),
            snapshot.gradings.len(),
            path.display()
        );
        Ok(snapshot)
    }

    /// Write the snapshot, creating parent directories as needed
    ///
    /// The JSON goes to a temporary file beside `path` that is then renamed
    /// over it, so an interrupted save leaves the previous state intact.
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)?;

        let mut staged = NamedTempFile::new_in(parent)?;
        serde_json::to_writer_pretty(&mut staged, self)?;
        staged.as_file().sync_all()?;
        staged.persist(path).map_err(|e| e.error)?;

        info!("Saved state to {}", path.display());
        Ok(())
    }
}
