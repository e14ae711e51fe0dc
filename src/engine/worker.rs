//! Native worker-thread pool (`spec.md` §4.1 "the engine builds a DAG of
//! tasks and runs it across a small worker pool").
//!
//! Grounded on the teacher's `engine::worker::{selection, handoff, spawner}`
//! condvar-wait pattern: each thread blocks on `Inner::cv` until work is
//! claimable instead of polling, and task selection/claiming happens under
//! the same lock that guards the DAG so two workers never double-claim a
//! task. Execution itself is async (provider calls, subprocess waits), so a
//! claimed task is run via `Inner::runtime.block_on` — the bridge the
//! teacher's purely-synchronous worker has no need for.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::domain::{Dag, Feature, FeatureOptions, Item, JobStatus, LanguageTag, Task, TaskId, TaskStatus};
use crate::error::{LangkitError, UiErrorEnvelope};
use crate::sync_ext::{CondvarExt, MutexExt, RwLockExt};

use super::features;
use super::intermediary;
use super::state::{EngineState, Inner};
use super::tasks::{self, TaskContext};

/// Poll period for a worker's condvar wait: long enough not to spin, short
/// enough that process shutdown (`Inner::shutdown`) is noticed promptly.
/// Not a `spec.md` number — an engineering constant for the native-thread
/// bridge, recorded in `DESIGN.md`.
const WAIT_POLL: Duration = Duration::from_millis(500);

/// Per-external-service concurrency cap, independent of the overall worker
/// thread count (`spec.md` §4.1 "per-service pools"). `spec.md` does not
/// name a number; `DESIGN.md` records this as the Open Question's
/// resolution.
const SERVICE_CONCURRENCY_CAP: usize = 2;

fn service_bucket(feature: Feature) -> Option<&'static str> {
    match feature {
        Feature::VoiceEnhancement => Some("voice-separation"),
        Feature::Dubtitles => Some("stt"),
        Feature::Romanization => Some("romanization"),
        Feature::CardCreation => Some("llm"),
        Feature::SelectiveKanji | Feature::CondensedAudio => None,
    }
}

pub fn spawn_workers(inner: Arc<Inner>, worker_count: usize) -> Vec<JoinHandle<()>> {
    (0..worker_count.max(1))
        .map(|idx| {
            let inner = inner.clone();
            std::thread::Builder::new()
                .name(format!("langkit-worker-{idx}"))
                .spawn(move || worker_loop(inner))
                .expect("failed to spawn worker thread")
        })
        .collect()
}

fn worker_loop(inner: Arc<Inner>) {
    loop {
        if inner.shutdown.is_cancelled() {
            return;
        }

        let claimed = {
            let mut state = inner.state.lock_unpoisoned();
            loop {
                if inner.shutdown.is_cancelled() {
                    return;
                }

                if let Some(job_run) = state.current.as_mut() {
                    if job_run.cancel.is_cancelled() {
                        cancel_pending_tasks(&mut job_run.dag);
                    }
                }

                if let Some(claim) = try_claim(&mut state) {
                    break claim;
                }

                let job_finished = state
                    .current
                    .as_ref()
                    .is_some_and(|job_run| job_run.dag.all_terminal());
                if job_finished {
                    finalize_job(&inner, &mut state);
                    inner.cv.notify_all();
                    continue;
                }

                let (next_state, _timeout) = inner.cv.wait_timeout_unpoisoned(state, WAIT_POLL);
                state = next_state;
            }
        };

        let settings = inner.settings.read_unpoisoned().clone();
        let ctx = TaskContext {
            inner: &inner,
            job_id: &claimed.job_id,
            item: &claimed.item,
            task: &claimed.task,
            target_language: &claimed.target_language,
            native_languages: &claimed.native_languages,
            feature_options: &claimed.feature_options,
            settings: &settings,
            dependencies: &claimed.dependencies,
            cancel: &claimed.cancel,
        };

        let result = inner.runtime.block_on(execute(&ctx));

        complete_claim(
            &inner,
            claimed.task.id,
            claimed.task.feature,
            service_bucket(claimed.task.feature),
            result,
        );
        inner.cv.notify_all();
    }
}

async fn execute(ctx: &TaskContext<'_>) -> Result<PathBuf, LangkitError> {
    match ctx.task.feature {
        Feature::VoiceEnhancement => tasks::run_voice_enhancement(ctx).await,
        Feature::Dubtitles => tasks::run_dubtitles(ctx).await,
        Feature::Romanization => tasks::run_romanization(ctx).await,
        Feature::SelectiveKanji => tasks::run_selective_kanji(ctx).await,
        Feature::CondensedAudio => tasks::run_condensed_audio(ctx).await,
        Feature::CardCreation => tasks::run_card_creation(ctx).await,
    }
}

struct Claim {
    job_id: String,
    task: Task,
    dependencies: HashMap<Feature, PathBuf>,
    item: Item,
    target_language: LanguageTag,
    native_languages: Vec<LanguageTag>,
    feature_options: FeatureOptions,
    cancel: tokio_util::sync::CancellationToken,
}

/// Picks the highest-priority runnable task whose service bucket (if any)
/// is under [`SERVICE_CONCURRENCY_CAP`], marks it `Running`, reserves its
/// bucket slot, and snapshots everything its execution needs. Returns
/// `None` when there is nothing claimable right now (no runnable task, or
/// every runnable task's bucket is saturated).
fn try_claim(state: &mut EngineState) -> Option<Claim> {
    let service_inflight = state.service_inflight.clone();
    let job_run = state.current.as_ref()?;
    let runnable = job_run.dag.runnable();

    let task_id = runnable.into_iter().find(|id| {
        let feature = job_run.dag.get(*id).expect("runnable id exists").feature;
        match service_bucket(feature) {
            Some(bucket) => {
                service_inflight.get(bucket).copied().unwrap_or(0) < SERVICE_CONCURRENCY_CAP
            }
            None => true,
        }
    })?;

    let job_run = state.current.as_mut()?;
    let task = job_run.dag.get_mut(task_id)?;
    task.status = TaskStatus::Running;
    let task = task.clone();

    if let Some(bucket) = service_bucket(task.feature) {
        *state.service_inflight.entry(bucket).or_insert(0) += 1;
    }
    state.active_tasks.insert(task_id);

    let job_run = state.current.as_ref()?;
    let item = job_run
        .job
        .items
        .iter()
        .find(|i| i.id == task.item_id)
        .expect("task references an existing item")
        .clone();

    let mut dependencies = HashMap::new();
    for dep_id in &task.dependencies {
        if let Some(dep_task) = job_run.dag.get(*dep_id) {
            if let Some(path) = job_run.artifact(&task.item_id, dep_task.feature) {
                dependencies.insert(dep_task.feature, path.clone());
            }
        }
    }

    Some(Claim {
        job_id: job_run.job.id.clone(),
        dependencies,
        item,
        target_language: job_run.job.target_language.clone(),
        native_languages: job_run.job.native_languages.clone(),
        feature_options: job_run.job.feature_options.clone(),
        cancel: job_run.cancel.clone(),
        task,
    })
}

fn complete_claim(
    inner: &Inner,
    task_id: TaskId,
    feature: Feature,
    bucket: Option<&'static str>,
    result: Result<PathBuf, LangkitError>,
) {
    let mut state = inner.state.lock_unpoisoned();
    state.active_tasks.remove(&task_id);
    if let Some(bucket) = bucket {
        if let Some(count) = state.service_inflight.get_mut(bucket) {
            *count = count.saturating_sub(1);
        }
    }

    let Some(job_run) = state.current.as_mut() else {
        return;
    };

    match result {
        Ok(path) => {
            let item_id = job_run
                .dag
                .get(task_id)
                .map(|t| t.item_id.clone())
                .unwrap_or_default();
            job_run.set_artifact(&item_id, feature, path);
            if let Some(task) = job_run.dag.get_mut(task_id) {
                task.status = TaskStatus::Done;
            }
        }
        Err(LangkitError::UserCancel) => {
            if let Some(task) = job_run.dag.get_mut(task_id) {
                task.status = TaskStatus::Cancelled;
            }
        }
        Err(err) => {
            if job_run.error.is_none() {
                job_run.error = Some(err);
            }
            if let Some(task) = job_run.dag.get_mut(task_id) {
                task.status = TaskStatus::Failed;
            }
            job_run.dag.propagate_failure(task_id);
        }
    }
}

fn cancel_pending_tasks(dag: &mut Dag) {
    for id in dag.all_ids() {
        if let Some(task) = dag.get_mut(id) {
            if task.status == TaskStatus::Pending {
                task.status = TaskStatus::Cancelled;
            }
        }
    }
}

/// Runs once the whole DAG has reached a terminal state: decides the job's
/// own terminal status, disposes of intermediary artefacts, flushes the
/// integrity cache, and broadcasts the matching `job.*` wire event.
///
/// Disposal happens here rather than incrementally per-task: by the time
/// every task is terminal, every dependent of every artefact has already
/// finished consuming it, so a single finalization pass is equivalent to
/// (and much simpler than) tracking per-artefact reference counts as each
/// dependent completes.
fn finalize_job(inner: &Arc<Inner>, state: &mut EngineState) {
    let Some(job_run) = state.current.take() else {
        return;
    };

    let job_id = job_run.job.id.clone();
    let cancelled = job_run.cancel.is_cancelled();
    let status = if cancelled {
        JobStatus::Cancelled
    } else if job_run.error.is_some() {
        JobStatus::Failed
    } else {
        JobStatus::Completed
    };

    let policy = inner.settings.read_unpoisoned().intermediary_policy;
    let job = job_run.job;
    let artifacts = job_run.artifacts;
    let cancel = job_run.cancel;
    let error = job_run.error;

    inner.runtime.block_on(async {
        for ((_, feature), path) in artifacts.iter() {
            if features::has_selected_dependent(*feature, &job) {
                let _ = intermediary::maybe_dispose(policy, path, &cancel).await;
            }
        }
    });
    let _ = inner.integrity_cache.flush();
    inner.bars.clear_job(&job_id);

    match status {
        JobStatus::Cancelled => inner.broadcaster.broadcast_job_cancelled(job_id.as_str()),
        JobStatus::Completed => inner.broadcaster.broadcast_job_complete(job_id.as_str()),
        JobStatus::Failed => {
            let fallback = LangkitError::Internal("job failed with no recorded error".to_string());
            let envelope =
                UiErrorEnvelope::from_error(format!("job-{job_id}"), error.as_ref().unwrap_or(&fallback));
            inner.broadcaster.broadcast_job_failed(&job_id, &envelope);
        }
        _ => {}
    }
}
