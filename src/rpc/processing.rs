//! *Processing* RPC service (`spec.md` §6): `SendProcessingRequest`,
//! `CancelProcessing`, `GetProcessingStatus`.

use serde_json::Value;

use crate::engine::{EngineStatus, ProcessingRequest};

use super::error::RpcError;
use super::state::AppState;

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct SendProcessingResponse {
    job_id: String,
}

pub async fn send_processing_request(state: &AppState, body: Value) -> Result<Value, RpcError> {
    let request: ProcessingRequest =
        serde_json::from_value(body).map_err(|err| RpcError::BadRequest(err.to_string()))?;
    let job_id = state.engine.start(request).await?;
    state
        .statistics
        .record_process_start()
        .map_err(|err| RpcError::Engine(crate::error::LangkitError::Internal(err.to_string())))?;
    Ok(serde_json::to_value(SendProcessingResponse { job_id }).expect("serializable"))
}

pub async fn cancel_processing(state: &AppState, _body: Value) -> Result<Value, RpcError> {
    state.engine.cancel();
    Ok(Value::Null)
}

pub async fn get_processing_status(state: &AppState, _body: Value) -> Result<Value, RpcError> {
    let status: EngineStatus = state.engine.status();
    Ok(serde_json::to_value(status).expect("serializable"))
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
            dry_run: std::sync::Mutex::new(crate::rpc::state::DryRunState::default()),
        }
    }

    #[tokio::test]
    async fn status_reports_idle_before_any_job() {
        let state = test_state(tokio::runtime::Handle::current());
        let value = get_processing_status(&state, Value::Null).await.unwrap();
        assert_eq!(value["isProcessing"], false);
        state.engine.shutdown();
    }

    #[tokio::test]
    async fn malformed_send_request_is_a_bad_request() {
        let state = test_state(tokio::runtime::Handle::current());
        let err = send_processing_request(&state, serde_json::json!({"nonsense": true}))
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::BadRequest(_)));
        state.engine.shutdown();
    }

    #[tokio::test]
    async fn cancel_with_nothing_running_is_harmless() {
        let state = test_state(tokio::runtime::Handle::current());
        cancel_processing(&state, Value::Null).await.unwrap();
        state.engine.shutdown();
    }
}
