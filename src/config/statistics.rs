//! Usage counters (`spec.md` §4.8): a flat counter map persisted as
//! `statistics.json`, updated with copy-on-write semantics under a mutex.
//!
//! Grounded on the teacher's `settings::io` atomic-write pattern, reused
//! here for a JSON sibling store rather than the YAML settings file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::sync_ext::MutexExt;

use super::io;
use super::paths;

pub const COUNT_APP_START: &str = "countAppStart";
pub const COUNT_PROCESS_START: &str = "countProcessStart";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatisticsSnapshot(pub HashMap<String, u64>);

/// Process-wide statistics store. `spec.md` §9 asks for singletons like this
/// to be dependency-injected rather than ambient globals, so callers hold an
/// `Arc<Statistics>` rather than reaching for a `static`.
pub struct Statistics {
    path: PathBuf,
    counters: Mutex<HashMap<String, u64>>,
}

impl Statistics {
    pub fn load() -> Result<Self> {
        Self::load_from(paths::statistics_path())
    }

    pub fn load_from(path: PathBuf) -> Result<Self> {
        let counters = if path.exists() {
            io::read_json_file::<StatisticsSnapshot>(&path)?.0
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            counters: Mutex::new(counters),
        })
    }

    /// `LoadStatistics`.
    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot(self.counters.lock_unpoisoned().clone())
    }

    /// `UpdateStatistics(updates)`: copy-on-write merge, then persist.
    pub fn update(&self, updates: HashMap<String, u64>) -> Result<()> {
        {
            let mut counters = self.counters.lock_unpoisoned();
            counters.extend(updates);
        }
        self.persist()
    }

    /// `IncrementStatistic(key) -> { newValue }`.
    pub fn increment(&self, key: &str) -> Result<u64> {
        let new_value = {
            let mut counters = self.counters.lock_unpoisoned();
            let entry = counters.entry(key.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };
        self.persist()?;
        Ok(new_value)
    }

    pub fn record_app_start(&self) -> Result<u64> {
        self.increment(COUNT_APP_START)
    }

    pub fn record_process_start(&self) -> Result<u64> {
        self.increment(COUNT_PROCESS_START)
    }

    fn persist(&self) -> Result<()> {
        let snapshot = self.snapshot();
        io::write_json_file(&self.path, &snapshot)
    }

    #[cfg(test)]
    fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let stats = Statistics::load_from(dir.path().join("statistics.json")).unwrap();
        assert!(stats.snapshot().0.is_empty());
    }

    #[test]
    fn increment_persists_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("statistics.json");
        let stats = Statistics::load_from(path.clone()).unwrap();

        assert_eq!(stats.increment(COUNT_APP_START).unwrap(), 1);
        assert_eq!(stats.increment(COUNT_APP_START).unwrap(), 2);

        let reloaded = Statistics::load_from(path).unwrap();
        assert_eq!(reloaded.snapshot().0.get(COUNT_APP_START), Some(&2));
    }

    #[test]
    fn update_merges_rather_than_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let stats = Statistics::load_from(dir.path().join("statistics.json")).unwrap();
        stats.increment("custom_a").unwrap();

        let mut updates = HashMap::new();
        updates.insert("custom_b".to_string(), 5);
        stats.update(updates).unwrap();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.0.get("custom_a"), Some(&1));
        assert_eq!(snapshot.0.get("custom_b"), Some(&5));
    }
}
