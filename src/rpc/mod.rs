//! RPC layer (`spec.md` §6): a single `POST /rpc/:method` route dispatches
//! by method name to one of the handlers below, each taking the shared
//! [`AppState`] and a JSON request body and returning a JSON response or an
//! [`RpcError`].
//!
//! Grounded on the teacher's `#[tauri::command]` surface (`commands/mod.rs`)
//! generalised from Tauri's compile-time command registration to a runtime
//! string dispatch, since this crate talks to its front-end over HTTP
//! instead of Tauri's IPC bridge (`SPEC_FULL.md` §6).

mod dependencies;
mod dryrun;
mod error;
mod language;
mod logging;
mod media;
mod models;
mod processing;
mod settings;
mod state;
mod system;

pub use error::RpcError;
pub use state::{AppState, DryRunState};

use serde_json::Value;

/// Dispatches an RPC method name (matched verbatim against `spec.md` §6's
/// literal names) to its handler. An unrecognised method is a client error,
/// not a server fault: `RpcError::BadRequest` rather than `Unsupported`,
/// which is reserved for methods this backend recognises but deliberately
/// does not serve.
pub async fn dispatch(state: &AppState, method: &str, body: Value) -> Result<Value, RpcError> {
    match method {
        "SendProcessingRequest" => processing::send_processing_request(state, body).await,
        "CancelProcessing" => processing::cancel_processing(state, body).await,
        "GetProcessingStatus" => processing::get_processing_status(state, body).await,

        "OpenVideoDialog" => media::open_video_dialog(state, body).await,
        "OpenDirectoryDialog" => media::open_directory_dialog(state, body).await,
        "OpenExecutableDialog" => media::open_executable_dialog(state, body).await,
        "GetVideosInDirectory" => media::get_videos_in_directory(state, body).await,
        "CheckMediaLanguageTags" => media::check_media_language_tags(state, body).await,

        "ValidateLanguage" => language::validate_language(state, body).await,
        "GetLanguageRequirements" => language::get_language_requirements(state, body).await,
        "NeedsTokenization" => language::needs_tokenization(state, body).await,
        "GetRomanizationStyles" => language::get_romanization_styles(state, body).await,

        "GetAvailableSTTModelsForUI" => models::get_available_stt_models_for_ui(state, body).await,
        "RefreshSTTModelsAfterSettingsUpdate" => {
            models::refresh_stt_models_after_settings_update(state, body).await
        }
        "GetAvailableSummaryProviders" => models::get_available_summary_providers(state, body).await,
        "GetAvailableSummaryModels" => models::get_available_summary_models(state, body).await,

        "InitSettings" | "LoadSettings" => settings::load_settings(state, body).await,
        "SaveSettings" => settings::save_settings(state, body).await,
        "LoadStatistics" => settings::load_statistics(state, body).await,
        "UpdateStatistics" => settings::update_statistics(state, body).await,
        "IncrementStatistic" => settings::increment_statistic(state, body).await,

        "GetSystemInfo" => system::get_system_info(state, body).await,
        "GetVersion" => system::get_version(state, body).await,
        "CheckForUpdate" => system::check_for_update(state, body).await,
        "OpenURL" => system::open_url(state, body).await,

        "CheckDockerAvailability" => dependencies::check_docker_availability(state, body).await,
        "CheckInternetConnectivity" => dependencies::check_internet_connectivity(state, body).await,
        "CheckFFmpegAvailability" => dependencies::check_ffmpeg_availability(state, body).await,
        "CheckMediaInfoAvailability" => dependencies::check_mediainfo_availability(state, body).await,
        "DownloadFFmpeg" => dependencies::download_ffmpeg(state, body).await,
        "DownloadMediaInfo" => dependencies::download_mediainfo(state, body).await,

        "BackendLogger" => logging::backend_logger(state, body).await,
        "BackendLoggerBatch" => logging::backend_logger_batch(state, body).await,
        "SetTraceLogs" => logging::set_trace_logs(state, body).await,
        "GetTraceLogs" => logging::get_trace_logs(state, body).await,
        "RecordWasmState" => logging::record_wasm_state(state, body).await,
        "RequestWasmState" => logging::request_wasm_state(state, body).await,
        "ExportDebugReport" => logging::export_debug_report(state, body).await,
        "SetEventThrottling" => logging::set_event_throttling(state, body).await,
        "GetEventThrottlingStatus" => logging::get_event_throttling_status(state, body).await,

        "SetConfig" => dryrun::set_config(state, body).await,
        "InjectError" => dryrun::inject_error(state, body).await,
        "GetStatus" => dryrun::get_status(state, body).await,

        other => Err(RpcError::BadRequest(format!("unknown RPC method '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::Broadcaster;
    use crate::config::AppSettings;
    use crate::media::IntegrityCache;
    use crate::progress::BarRegistry;
    use crate::providers::ProviderRegistry;
    use crate::throttle::{AdaptiveThrottler, ThrottleConfig};
    use std::sync::atomic::AtomicBool;
    use std::sync::{Arc, RwLock};

    fn test_state(runtime: tokio::runtime::Handle) -> AppState {
        let settings = Arc::new(RwLock::new(AppSettings::default()));
        let bars = Arc::new(BarRegistry::new());
        let throttler = Arc::new(AdaptiveThrottler::new(ThrottleConfig::default()));
        let broadcaster = Arc::new(Broadcaster::new(bars.clone()));
        let providers = Arc::new(ProviderRegistry::new(vec![], vec![], vec![], Default::default()));
        let dir = tempfile::tempdir().unwrap();
        let integrity_cache = Arc::new(IntegrityCache::load(dir.path().join("cache.json")).unwrap());
        let statistics =
            Arc::new(crate::config::Statistics::load_from(dir.path().join("stats.json")).unwrap());
        let engine = crate::engine::Engine::new(
            settings.clone(),
            bars.clone(),
            throttler.clone(),
            broadcaster.clone(),
            providers.clone(),
            integrity_cache.clone(),
            runtime,
            1,
        );
        AppState {
            engine,
            settings,
            statistics,
            providers,
            broadcaster,
            throttler,
            integrity_cache,
            bars,
            trace_logs: AtomicBool::new(false),
            event_throttling_enabled: AtomicBool::new(true),
            listen_port: 0,
            log_sequence: crate::domain::SequenceCounter::new(),
            wasm_state: std::sync::Mutex::new(None),
            dry_run: std::sync::Mutex::new(DryRunState::default()),
        }
    }

    #[tokio::test]
    async fn dispatches_get_version_by_name() {
        let state = test_state(tokio::runtime::Handle::current());
        let value = dispatch(&state, "GetVersion", Value::Null).await.unwrap();
        assert!(value.get("version").is_some());
        state.engine.shutdown();
    }

    #[tokio::test]
    async fn unknown_method_is_a_bad_request() {
        let state = test_state(tokio::runtime::Handle::current());
        let err = dispatch(&state, "NoSuchMethod", Value::Null).await.unwrap_err();
        assert!(matches!(err, RpcError::BadRequest(_)));
        state.engine.shutdown();
    }

    #[tokio::test]
    async fn init_and_load_settings_are_aliases() {
        let state = test_state(tokio::runtime::Handle::current());
        let a = dispatch(&state, "InitSettings", Value::Null).await.unwrap();
        let b = dispatch(&state, "LoadSettings", Value::Null).await.unwrap();
        assert_eq!(a, b);
        state.engine.shutdown();
    }

    #[tokio::test]
    async fn out_of_scope_method_is_unsupported_not_bad_request() {
        let state = test_state(tokio::runtime::Handle::current());
        let err = dispatch(&state, "OpenURL", serde_json::json!({"url": "https://x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::Unsupported(_)));
        state.engine.shutdown();
    }
}
