//! *System* RPC service (`spec.md` §6): version/build info and the two
//! host-UI-only methods (update checking, URL opening) stubbed as
//! [`RpcError::Unsupported`] per `spec.md` §1.

use serde_json::Value;

use crate::sync_ext::RwLockExt;

use super::error::RpcError;
use super::state::AppState;

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct SystemInfoResponse {
    os: String,
    arch: String,
    worker_count: usize,
    listen_port: u16,
}

/// `GetSystemInfo` (`spec.md` §6, §4.4): also reports the bound RPC/WS port,
/// the "single-port RPC" discovery channel `spec.md` §4.4 describes as an
/// alternative to a config file.
pub async fn get_system_info(state: &AppState, _body: Value) -> Result<Value, RpcError> {
    Ok(serde_json::to_value(SystemInfoResponse {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        worker_count: state.settings.read_unpoisoned().queue.worker_count,
        listen_port: state.listen_port,
    })
    .expect("serializable"))
}

#[derive(serde::Serialize)]
struct VersionResponse {
    version: String,
}

/// `GetVersion` (`spec.md` §6).
pub async fn get_version(_state: &AppState, _body: Value) -> Result<Value, RpcError> {
    Ok(serde_json::to_value(VersionResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
    .expect("serializable"))
}

/// `CheckForUpdate` (`spec.md` §6): changelog-fetch-and-parse is a host-UI
/// concern this backend doesn't own.
pub async fn check_for_update(_state: &AppState, _body: Value) -> Result<Value, RpcError> {
    Err(RpcError::Unsupported("CheckForUpdate"))
}

/// `OpenURL(url)` (`spec.md` §6): opening a browser window is a host-UI
/// action this backend has no window to act from.
pub async fn open_url(_state: &AppState, _body: Value) -> Result<Value, RpcError> {
    Err(RpcError::Unsupported("OpenURL"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::Broadcaster;
    use crate::config::AppSettings;
    use crate::media::IntegrityCache;
    use crate::progress::BarRegistry;
    use crate::providers::ProviderRegistry;
    use crate::sync_ext::RwLockExt;
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
            dry_run: std::sync::Mutex::new(crate::rpc::state::DryRunState::default()),
        }
    }

    #[tokio::test]
    async fn system_info_reports_configured_worker_count() {
        let state = test_state(tokio::runtime::Handle::current());
        let value = get_system_info(&state, Value::Null).await.unwrap();
        assert_eq!(value["workerCount"], 2);
        state.engine.shutdown();
    }

    #[tokio::test]
    async fn open_url_is_explicitly_unsupported() {
        let state = test_state(tokio::runtime::Handle::current());
        let err = open_url(&state, Value::Null).await.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::NOT_IMPLEMENTED);
        state.engine.shutdown();
    }
}
