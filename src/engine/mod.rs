//! Processing engine entry point (`spec.md` §4.1): accepts a job, runs the
//! precondition gate, builds the per-item/per-feature task DAG, and hands it
//! to the native worker pool. `state`/`worker`/`features`/`tasks` are the
//! internal machinery; this module is the only thing the RPC layer talks
//! to.
//!
//! Grounded on the teacher's top-level `engine::mod` (`Engine::new`/`start`/
//! `cancel`/`status` over a shared `Arc<Inner>`), generalised from "queue a
//! transcode job" to "gate, then run the one allowed concurrent job" per
//! `spec.md` §4.1's single-job-at-a-time model.

mod features;
mod intermediary;
mod retry;
mod romanization;
pub(crate) mod state;
mod tasks;
mod worker;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};
use std::thread::JoinHandle;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use uuid::Uuid;

use crate::broadcast::Broadcaster;
use crate::config::AppSettings;
use crate::domain::{
    BarState, Feature, FeatureOptions, Item, Job, JobSource, JobStatus, LanguageTag, StreamLayout,
};
use crate::error::{GateFailure, LangkitError, UiErrorEnvelope};
use crate::gate::{self, DecodeIntegrityDepth, GateRequest};
use crate::media::{self, IntegrityCache, IntegrityVerdict};
use crate::progress::BarRegistry;
use crate::providers::ProviderRegistry;
use crate::sync_ext::MutexExt;
use crate::throttle::AdaptiveThrottler;

use state::Inner;

/// Wire shape for `Start` (`spec.md` §6): everything needed to gate and run
/// one job.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingRequest {
    pub source: JobSource,
    pub features: Vec<Feature>,
    #[serde(default)]
    pub feature_options: FeatureOptions,
    pub target_language: String,
    #[serde(default)]
    pub native_languages: Vec<String>,
    #[serde(default)]
    pub audio_track_index: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub is_processing: bool,
    pub job_id: Option<String>,
    pub last_error: Option<UiErrorEnvelope>,
}

/// Process-wide processing engine: one `Arc<Inner>` shared with every
/// worker thread, plus the thread handles needed to join them at shutdown.
pub struct Engine {
    inner: Arc<Inner>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Engine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: Arc<RwLock<AppSettings>>,
        bars: Arc<BarRegistry>,
        throttler: Arc<AdaptiveThrottler>,
        broadcaster: Arc<Broadcaster>,
        providers: Arc<ProviderRegistry>,
        integrity_cache: Arc<IntegrityCache>,
        runtime: Handle,
        worker_count: usize,
    ) -> Arc<Self> {
        let inner = Inner::new(
            settings,
            bars,
            throttler,
            broadcaster,
            providers,
            integrity_cache,
            runtime,
        );
        let workers = worker::spawn_workers(inner.clone(), worker_count);
        Arc::new(Self {
            inner,
            workers: Mutex::new(workers),
        })
    }

    /// `Start` (`spec.md` §6, §4.1): rejects a second concurrent job with
    /// `busy`, otherwise runs the full gate sequence before a job is ever
    /// inserted into `EngineState` — nothing is scheduled on the worker
    /// pool until every precondition has passed.
    pub async fn start(&self, request: ProcessingRequest) -> Result<String, LangkitError> {
        if self.inner.state.lock_unpoisoned().is_processing() {
            return Err(LangkitError::Busy);
        }

        let mut lang_failures = Vec::new();
        let native_languages: Vec<LanguageTag> = request
            .native_languages
            .iter()
            .filter_map(|raw| match LanguageTag::canonicalize(raw) {
                Some(tag) => Some(tag),
                None => {
                    lang_failures.push(GateFailure {
                        check: "language".to_string(),
                        reason: format!("'{raw}' is not a valid native language tag"),
                    });
                    None
                }
            })
            .collect();
        if !lang_failures.is_empty() {
            return Err(LangkitError::Gate(lang_failures));
        }

        let representative_path: PathBuf = match &request.source {
            JobSource::File(path) => path.clone(),
            JobSource::Directory(path) => path.clone(),
        };
        let paths: Vec<PathBuf> = match &request.source {
            JobSource::File(path) => vec![path.clone()],
            JobSource::Directory(dir) => media::list_media_files(dir).map_err(|err| LangkitError::LocalIo {
                path: dir.display().to_string(),
                message: err.to_string(),
            })?,
        };
        if paths.is_empty() {
            return Err(LangkitError::Gate(vec![GateFailure {
                check: "media".to_string(),
                reason: "no processable media files found".to_string(),
            }]));
        }

        let target_language = gate::run_gate(GateRequest {
            target_language: &request.target_language,
            features: &request.features,
            media_path: &representative_path,
            docker_data_root: None,
            decode_integrity_depth: DecodeIntegrityDepth::Sampled,
            integrity_cache: None,
            duration_ms: None,
        })
        .await?;

        let job_id = Uuid::new_v4().to_string();
        let probe_bar = format!("check-probe-{job_id}");
        let decode_bar = format!("check-decode-{job_id}");
        self.inner.bar_register(probe_bar.clone(), paths.len() as u64);
        self.inner.bar_register(decode_bar.clone(), paths.len() as u64);

        let mut items = Vec::with_capacity(paths.len());
        let mut decode_failures = Vec::new();
        for (idx, path) in paths.iter().enumerate() {
            let layout = match media::probe_stream_layout(path).await {
                Ok(layout) => layout,
                Err(err) => {
                    self.inner.bar_state(&probe_bar, BarState::ErroredAll);
                    self.inner.bars.clear_job(&job_id);
                    return Err(LangkitError::LocalIo {
                        path: path.display().to_string(),
                        message: err.to_string(),
                    });
                }
            };
            self.inner.bar_progress(&probe_bar, (idx + 1) as u64);

            let verdict = gate::run_decode_integrity(
                path,
                layout.duration_ms,
                DecodeIntegrityDepth::Sampled,
                &self.inner.integrity_cache,
            )
            .await;
            self.inner.bar_progress(&decode_bar, (idx + 1) as u64);
            if verdict == IntegrityVerdict::Corrupted {
                decode_failures.push(GateFailure {
                    check: "decode-integrity".to_string(),
                    reason: format!("{} failed decode-integrity check", path.display()),
                });
            }

            // Best-effort: a failed language probe never fails the job,
            // it only leaves both flags `false` (`spec.md` §3 "Item").
            let lang_report = media::probe_language_tags(path).await.unwrap_or_default();
            let has_target_language_tag =
                lang_report.has_tag(iso_639_2_prefix(target_language.primary_subtag()));
            let has_native_language_tag = native_languages
                .iter()
                .any(|tag| lang_report.has_tag(iso_639_2_prefix(tag.primary_subtag())));

            items.push(Item {
                id: format!("item-{idx}"),
                path: path.clone(),
                duration_seconds: layout.duration_ms as f64 / 1000.0,
                stream_layout: StreamLayout {
                    audio_streams: layout.audio_stream_count,
                    video_streams: if layout.has_video_stream { 1 } else { 0 },
                    subtitle_streams: 0,
                },
                has_target_language_tag,
                has_native_language_tag,
            });
        }
        self.inner.bar_state(&probe_bar, BarState::Completed);
        if !decode_failures.is_empty() {
            self.inner.bar_state(&decode_bar, BarState::ErroredAll);
            self.inner.bars.clear_job(&job_id);
            return Err(LangkitError::Gate(decode_failures));
        }
        self.inner.bar_state(&decode_bar, BarState::Completed);

        let job = Job {
            id: job_id.clone(),
            source: request.source,
            features: request.features,
            feature_options: request.feature_options,
            target_language,
            native_languages,
            audio_track_index: request.audio_track_index,
            created_at: Utc::now(),
            status: JobStatus::Processing,
            items,
        };
        features::validate_feature_options(&job).map_err(|err| LangkitError::Internal(err.to_string()))?;

        let media_bar = format!("media-bar-{job_id}");
        self.inner.bar_register(media_bar, job.items.len() as u64);

        let dag = features::build_dag(&job);
        {
            let mut state = self.inner.state.lock_unpoisoned();
            if state.is_processing() {
                return Err(LangkitError::Busy);
            }
            state.current = Some(state::JobRun {
                job,
                dag,
                cancel: tokio_util::sync::CancellationToken::new(),
                error: None,
                artifacts: std::collections::HashMap::new(),
            });
        }
        self.inner.cv.notify_all();

        Ok(job_id)
    }

    /// `Cancel` (`spec.md` §6): idempotent — a no-op when nothing is
    /// processing. Workers observe the cancelled token on their next
    /// condvar wake and sweep pending tasks themselves.
    pub fn cancel(&self) {
        let state = self.inner.state.lock_unpoisoned();
        if let Some(job_run) = state.current.as_ref() {
            job_run.cancel.cancel();
        }
        drop(state);
        self.inner.cv.notify_all();
    }

    /// `GetSystemStatus` (`spec.md` §6).
    pub fn status(&self) -> EngineStatus {
        let state = self.inner.state.lock_unpoisoned();
        EngineStatus {
            is_processing: state.is_processing(),
            job_id: state.current.as_ref().map(|job_run| job_run.job.id.clone()),
            last_error: state.last_error.clone(),
        }
    }

    pub fn bars(&self) -> &Arc<BarRegistry> {
        &self.inner.bars
    }

    /// Signals every worker thread to stop after its current task and joins
    /// them, for a clean process exit.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        self.inner.cv.notify_all();
        let mut workers = self.workers.lock_unpoisoned();
        for handle in workers.drain(..) {
            let _ = handle.join();
        }
    }
}

/// MediaInfo reports stream languages as ISO 639-2 (three-letter) codes;
/// `LanguageTag` primary subtags are ISO 639-1 (two-letter). This is a
/// small table for the languages this deployment's gate cares about
/// (`domain::language`'s tokenisation/docker-romanisation sets) plus a
/// handful of other common ones, not a complete 639-1↔639-2 mapping table
/// — an unmapped subtag falls back to itself, which simply never matches
/// a MediaInfo-reported tag (§3's `has_target_language_tag` degrades to
/// `false` rather than erroring).
fn iso_639_2_prefix(primary_subtag: &str) -> &str {
    match primary_subtag {
        "ja" => "jpn",
        "zh" => "chi",
        "th" => "tha",
        "my" => "bur",
        "km" => "khm",
        "lo" => "lao",
        "en" => "eng",
        "es" => "spa",
        "fr" => "fre",
        "de" => "ger",
        "ko" => "kor",
        "ru" => "rus",
        "pt" => "por",
        "it" => "ita",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThrottleSettings;
    use crate::domain::JobSource;

    fn test_engine(runtime: Handle) -> Arc<Engine> {
        let settings = Arc::new(RwLock::new(AppSettings::default()));
        let bars = Arc::new(BarRegistry::new());
        let throttler = Arc::new(AdaptiveThrottler::new(crate::throttle::ThrottleConfig {
            min_interval: std::time::Duration::from_millis(0),
            max_interval: std::time::Duration::from_millis(50),
            max_log_entries: 1000,
        }));
        let broadcaster = Arc::new(Broadcaster::new(bars.clone()));
        let providers = Arc::new(ProviderRegistry::new(vec![], vec![], vec![], Default::default()));
        let dir = tempfile::tempdir().unwrap();
        let integrity_cache = Arc::new(IntegrityCache::load(dir.path().join("cache.json")).unwrap());
        let _ = ThrottleSettings::default();
        Engine::new(
            settings,
            bars,
            throttler,
            broadcaster,
            providers,
            integrity_cache,
            runtime,
            1,
        )
    }

    #[tokio::test]
    async fn rejects_start_with_unknown_source_directory() {
        let engine = test_engine(Handle::current());
        let request = ProcessingRequest {
            source: JobSource::Directory(PathBuf::from("/nonexistent/dir/for/test")),
            features: vec![],
            feature_options: Default::default(),
            target_language: "en".to_string(),
            native_languages: vec![],
            audio_track_index: None,
        };
        let result = engine.start(request).await;
        assert!(result.is_err());
        engine.shutdown();
    }

    #[tokio::test]
    async fn invalid_native_language_is_rejected_before_gating() {
        let engine = test_engine(Handle::current());
        let request = ProcessingRequest {
            source: JobSource::File(PathBuf::from("/tmp/does-not-matter.mp4")),
            features: vec![],
            feature_options: Default::default(),
            target_language: "en".to_string(),
            native_languages: vec!["en--US".to_string()],
            audio_track_index: None,
        };
        let result = engine.start(request).await;
        match result {
            Err(LangkitError::Gate(failures)) => {
                assert!(failures.iter().any(|f| f.check == "language"));
            }
            other => panic!("expected a Gate error, got {other:?}"),
        }
        engine.shutdown();
    }

    #[tokio::test]
    async fn status_reports_idle_with_no_job_id_initially() {
        let engine = test_engine(Handle::current());
        let status = engine.status();
        assert!(!status.is_processing);
        assert!(status.job_id.is_none());
        engine.shutdown();
    }

    #[test]
    fn cancel_with_no_job_running_is_a_harmless_no_op() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let engine = test_engine(runtime.handle().clone());
        engine.cancel();
        engine.shutdown();
    }

    #[test]
    fn iso_639_2_prefix_maps_known_languages_and_passes_through_unknown() {
        assert_eq!(iso_639_2_prefix("ja"), "jpn");
        assert_eq!(iso_639_2_prefix("en"), "eng");
        assert_eq!(iso_639_2_prefix("xx"), "xx");
    }
}
