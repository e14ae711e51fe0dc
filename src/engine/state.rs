//! Shared engine state behind a single `Mutex` + `Condvar`, grounded on the
//! teacher's `engine::state::Inner`/`EngineState` pattern: native worker
//! threads block on the condvar for runnable work instead of polling, and
//! the same lock guards DAG mutation so task selection and completion are
//! atomic (`engine::worker::{selection, handoff}`).
//!
//! Unlike the teacher, which queues many independently-scheduled transcode
//! jobs, `spec.md` §4.1 only ever runs one job at a time (`Start` rejects a
//! second job with `busy`); what parallelises across worker threads here is
//! the one job's per-item, per-feature task DAG instead of a job queue.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex, RwLock};

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::broadcast::Broadcaster;
use crate::config::AppSettings;
use crate::domain::{Bar, BarState, Dag, Feature, Job, LogEntry, SequenceCounter, Task, TaskId};
use crate::error::{LangkitError, UiErrorEnvelope};
use crate::media::IntegrityCache;
use crate::progress::BarRegistry;
use crate::providers::ProviderRegistry;
use crate::throttle::AdaptiveThrottler;

/// One accepted job's mutable run state.
pub struct JobRun {
    pub job: Job,
    pub dag: Dag,
    pub cancel: CancellationToken,
    /// First task error to turn into the job's own terminal error, if any
    /// task ultimately failed (`spec.md` §4.1 failure propagation).
    pub error: Option<LangkitError>,
    /// Artefacts produced by one (item, feature) pair, consumed by
    /// downstream tasks over the same item. Not part of the `domain` data
    /// model: `Item`/`Task` describe inputs, not engine-internal scratch
    /// state, so this stays engine-side.
    pub artifacts: HashMap<(String, Feature), PathBuf>,
}

impl JobRun {
    pub fn artifact(&self, item_id: &str, feature: Feature) -> Option<&PathBuf> {
        self.artifacts.get(&(item_id.to_string(), feature))
    }

    pub fn set_artifact(&mut self, item_id: &str, feature: Feature, path: PathBuf) {
        self.artifacts.insert((item_id.to_string(), feature), path);
    }
}

#[derive(Default)]
pub struct EngineState {
    pub current: Option<JobRun>,
    /// Tasks a worker has claimed and is currently executing, so a second
    /// worker never double-claims the same task.
    pub active_tasks: HashSet<TaskId>,
    /// Per-external-service in-flight counts: the per-service pools
    /// `spec.md` §4.1 calls for, distinct from the global worker-thread cap.
    pub service_inflight: HashMap<&'static str, usize>,
    pub spawned_workers: usize,
}

impl EngineState {
    pub fn is_processing(&self) -> bool {
        self.current.is_some()
    }
}

/// Everything a worker thread needs, shared behind `Arc`. Async
/// collaborators (gate, media probes, provider calls) are invoked from
/// native threads via `runtime.block_on`, the same bridge the teacher uses
/// nowhere (it has no async collaborators) but the natural adaptation of its
/// thread-per-worker design to a crate whose I/O layer is `tokio`-based.
pub struct Inner {
    pub state: Mutex<EngineState>,
    pub cv: Condvar,
    pub settings: Arc<RwLock<AppSettings>>,
    pub bars: Arc<BarRegistry>,
    pub throttler: Arc<AdaptiveThrottler>,
    pub broadcaster: Arc<Broadcaster>,
    pub providers: Arc<ProviderRegistry>,
    pub integrity_cache: Arc<IntegrityCache>,
    pub runtime: Handle,
    pub sequence: SequenceCounter,
    /// Process-wide shutdown signal for the worker pool, distinct from a
    /// single job's own `JobRun::cancel`.
    pub shutdown: CancellationToken,
}

impl Inner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: Arc<RwLock<AppSettings>>,
        bars: Arc<BarRegistry>,
        throttler: Arc<AdaptiveThrottler>,
        broadcaster: Arc<Broadcaster>,
        providers: Arc<ProviderRegistry>,
        integrity_cache: Arc<IntegrityCache>,
        runtime: Handle,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(EngineState::default()),
            cv: Condvar::new(),
            settings,
            bars,
            throttler,
            broadcaster,
            providers,
            integrity_cache,
            runtime,
            sequence: SequenceCounter::new(),
            shutdown: CancellationToken::new(),
        })
    }

    /// Registers a bar in both places that need to know about it: the
    /// registry (source of truth for `connected`-snapshot replay) and,
    /// implicitly, future [`Self::bar_progress`]/[`Self::bar_state`] calls
    /// feed the throttler so a live connection sees the same update.
    pub fn bar_register(&self, id: impl Into<String>, total: u64) {
        self.bars.register(id, total);
    }

    pub fn bar_progress(&self, id: &str, current: u64) {
        self.bars.set_progress(id, current);
        if let Some(bar) = self.bars.get(id) {
            self.throttler.push_bar(bar);
        }
    }

    pub fn bar_state(&self, id: &str, state: BarState) {
        self.bars.set_state(id, state);
        if let Some(bar) = self.bars.get(id) {
            self.throttler.push_bar(bar);
        }
    }

    pub fn push_log(&self, job_id: &str, level: i8, component: &str, operation: &str, message: impl Into<String>) {
        let entry = LogEntry {
            level,
            message: message.into(),
            component: component.to_string(),
            operation: operation.to_string(),
            session_id: job_id.to_string(),
            context: HashMap::new(),
            sequence: self.sequence.next(),
            unix_time_ms: chrono::Utc::now().timestamp_millis(),
        };
        self.throttler.push_log(entry);
    }
}

pub(super) fn task_mut<'a>(state: &'a mut EngineState, id: TaskId) -> Option<&'a mut Task> {
    state.current.as_mut()?.dag.get_mut(id)
}
