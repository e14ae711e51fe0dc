//! Bar registry: the live set of progress bars for in-flight jobs.
//!
//! Grounded on the teacher's `engine::state::EngineState` pattern of a
//! single mutex-guarded map snapshot-read by RPC handlers and the
//! broadcaster's `connected`-event replay, adapted from per-job state to
//! per-bar state.

use std::collections::HashMap;

use crate::domain::{Bar, BarState};
use crate::sync_ext::MutexExt;

use super::allocator;

pub struct BarRegistry {
    bars: std::sync::Mutex<HashMap<String, Bar>>,
}

impl Default for BarRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BarRegistry {
    pub fn new() -> Self {
        Self {
            bars: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Register a new bar, e.g. `"media-bar-{job_id}"`. Idempotent: an
    /// existing bar with the same id is left untouched.
    pub fn register(&self, id: impl Into<String>, total: u64) {
        let id = id.into();
        let mut bars = self.bars.lock_unpoisoned();
        bars.entry(id.clone()).or_insert_with(|| Bar::new(id, total));
    }

    pub fn set_progress(&self, id: &str, current: u64) {
        let mut bars = self.bars.lock_unpoisoned();
        if let Some(bar) = bars.get_mut(id) {
            bar.set_progress(current);
        }
    }

    pub fn set_state(&self, id: &str, state: BarState) {
        let mut bars = self.bars.lock_unpoisoned();
        if let Some(bar) = bars.get_mut(id) {
            bar.set_state(state);
        }
    }

    pub fn get(&self, id: &str) -> Option<Bar> {
        self.bars.lock_unpoisoned().get(id).cloned()
    }

    /// Full snapshot for `connected`-event replay (`spec.md` §4.4).
    pub fn snapshot(&self) -> Vec<Bar> {
        let bars = self.bars.lock_unpoisoned();
        let mut out: Vec<Bar> = bars.values().cloned().collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    /// Drop every bar belonging to a job, once it reaches a terminal state
    /// and its artefacts are finalised.
    pub fn clear_job(&self, job_id: &str) {
        let mut bars = self.bars.lock_unpoisoned();
        bars.retain(|id, _| !id.contains(job_id));
    }

    /// Weighted aggregate percent (0..=100) across every bar belonging to
    /// `job_id` (`spec.md` §4.2). Bar ids are expected to embed the job id,
    /// e.g. `"demucs-process-{job_id}-track0"`.
    pub fn aggregate_percent_for_job(&self, job_id: &str) -> f64 {
        let bars = self.bars.lock_unpoisoned();
        let fractions: HashMap<String, (f64, f64)> = bars
            .values()
            .filter(|bar| bar.id.contains(job_id))
            .map(|bar| {
                let weight = allocator::importance_for(&bar.id);
                (bar.id.clone(), (bar.fraction(), weight))
            })
            .collect();
        allocator::aggregate_percent(&fractions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_idempotent() {
        let registry = BarRegistry::new();
        registry.register("media-bar-job1", 100);
        registry.set_progress("media-bar-job1", 40);
        registry.register("media-bar-job1", 999);
        assert_eq!(registry.get("media-bar-job1").unwrap().current, 40);
    }

    #[test]
    fn clear_job_removes_only_matching_bars() {
        let registry = BarRegistry::new();
        registry.register("media-bar-job1", 10);
        registry.register("media-bar-job2", 10);
        registry.clear_job("job1");
        assert!(registry.get("media-bar-job1").is_none());
        assert!(registry.get("media-bar-job2").is_some());
    }

    #[test]
    fn aggregate_percent_reflects_progress_and_weights() {
        let registry = BarRegistry::new();
        registry.register("media-bar-job1", 10);
        registry.register("check-probe-job1", 10);
        registry.set_progress("media-bar-job1", 10);
        registry.set_progress("check-probe-job1", 0);

        let percent = registry.aggregate_percent_for_job("job1");
        assert!(percent > 50.0 && percent < 100.0);
    }

    #[test]
    fn snapshot_is_sorted_and_complete() {
        let registry = BarRegistry::new();
        registry.register("item-bar-job1", 5);
        registry.register("demucs-process-job1", 5);
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot[0].id < snapshot[1].id);
    }
}
