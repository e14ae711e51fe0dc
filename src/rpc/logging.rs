//! *Logging* and diagnostics RPC service (`spec.md` §6): front-end log
//! ingestion, trace-level and event-throttling toggles, WASM state
//! mirroring, and a debug-report export.

use std::collections::HashMap;
use std::sync::atomic::Ordering;

use serde::Deserialize;
use serde_json::Value;

use crate::domain::{LogEntry, LogLevel};
use crate::sync_ext::MutexExt;

use super::error::RpcError;
use super::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackendLoggerRequest {
    component: String,
    log_json: LogJson,
}

/// The subset of `LogEntry` a front-end caller supplies; `sequence` and
/// `session_id` are this backend's to assign, not the caller's.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogJson {
    level: LogLevel,
    message: String,
    #[serde(default)]
    operation: String,
    #[serde(default)]
    context: HashMap<String, Value>,
}

fn mint_entry(state: &AppState, component: String, log: LogJson) -> LogEntry {
    LogEntry {
        level: log.level,
        message: log.message,
        component,
        operation: log.operation,
        session_id: "frontend".to_string(),
        context: log.context,
        sequence: state.log_sequence.next(),
        unix_time_ms: chrono::Utc::now().timestamp_millis(),
    }
}

/// `BackendLogger(component, logJson)` (`spec.md` §6): front-end logs join
/// the same throttled pipe as engine logs, so they interleave correctly by
/// `(unix_time, sequence)` on the wire.
pub async fn backend_logger(state: &AppState, body: Value) -> Result<Value, RpcError> {
    let req: BackendLoggerRequest =
        serde_json::from_value(body).map_err(|err| RpcError::BadRequest(err.to_string()))?;
    state
        .throttler
        .push_log(mint_entry(state, req.component, req.log_json));
    Ok(Value::Null)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackendLoggerBatchRequest {
    component: String,
    entries: Vec<LogJson>,
}

/// `BackendLoggerBatch` (`spec.md` §6): same as [`backend_logger`] but for a
/// caller batching several entries into one RPC round trip.
pub async fn backend_logger_batch(state: &AppState, body: Value) -> Result<Value, RpcError> {
    let req: BackendLoggerBatchRequest =
        serde_json::from_value(body).map_err(|err| RpcError::BadRequest(err.to_string()))?;
    for entry in req.entries {
        state
            .throttler
            .push_log(mint_entry(state, req.component.clone(), entry));
    }
    Ok(Value::Null)
}

#[derive(Deserialize)]
struct SetTraceLogsRequest {
    enable: bool,
}

/// `SetTraceLogs(enable)` (`spec.md` §6).
pub async fn set_trace_logs(state: &AppState, body: Value) -> Result<Value, RpcError> {
    let req: SetTraceLogsRequest =
        serde_json::from_value(body).map_err(|err| RpcError::BadRequest(err.to_string()))?;
    state.trace_logs.store(req.enable, Ordering::Relaxed);
    Ok(Value::Null)
}

#[derive(serde::Serialize)]
struct EnabledResponse {
    enabled: bool,
}

/// `GetTraceLogs` (`spec.md` §6).
pub async fn get_trace_logs(state: &AppState, _body: Value) -> Result<Value, RpcError> {
    Ok(serde_json::to_value(EnabledResponse {
        enabled: state.trace_logs.load(Ordering::Relaxed),
    })
    .expect("serializable"))
}

#[derive(Deserialize)]
struct SetEventThrottlingRequest {
    enabled: bool,
}

/// `SetEventThrottling(enabled)` (`spec.md` §6). Disabling does not stop the
/// throttler's tick loop (still needed to actually deliver batches); it
/// clamps the interval to the minimum so flushes are effectively immediate.
pub async fn set_event_throttling(state: &AppState, body: Value) -> Result<Value, RpcError> {
    let req: SetEventThrottlingRequest =
        serde_json::from_value(body).map_err(|err| RpcError::BadRequest(err.to_string()))?;
    state
        .event_throttling_enabled
        .store(req.enabled, Ordering::Relaxed);
    if !req.enabled {
        state.throttler.reconfigure(
            std::time::Duration::from_millis(0),
            std::time::Duration::from_millis(0),
            crate::throttle::ThrottleConfig::default().max_log_entries,
        );
    }
    Ok(Value::Null)
}

/// `GetEventThrottlingStatus` (`spec.md` §6).
pub async fn get_event_throttling_status(state: &AppState, _body: Value) -> Result<Value, RpcError> {
    Ok(serde_json::to_value(EnabledResponse {
        enabled: state.event_throttling_enabled.load(Ordering::Relaxed),
    })
    .expect("serializable"))
}

/// `RecordWasmState(json)` (`spec.md` §6): mirrors the front-end's WASM
/// state so a reconnecting UI (or `RequestWasmState`) can recover it without
/// the WASM side replaying work.
pub async fn record_wasm_state(state: &AppState, body: Value) -> Result<Value, RpcError> {
    *state.wasm_state.lock_unpoisoned() = Some(body.clone());
    state.broadcaster.broadcast_state_wasm(body);
    Ok(Value::Null)
}

/// `RequestWasmState` (`spec.md` §6): returns `null` if nothing has been
/// recorded yet rather than erroring, since "no state yet" is a normal
/// startup condition, not a fault.
pub async fn request_wasm_state(state: &AppState, _body: Value) -> Result<Value, RpcError> {
    Ok(state.wasm_state.lock_unpoisoned().clone().unwrap_or(Value::Null))
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct DebugReport {
    engine_status: crate::engine::EngineStatus,
    trace_logs_enabled: bool,
    event_throttling_enabled: bool,
    throttle_interval_ms: u64,
    statistics: crate::config::StatisticsSnapshot,
}

/// `ExportDebugReport` (`spec.md` §6): a point-in-time snapshot useful for
/// bug reports, assembled from state already held rather than re-probing
/// anything.
pub async fn export_debug_report(state: &AppState, _body: Value) -> Result<Value, RpcError> {
    Ok(serde_json::to_value(DebugReport {
        engine_status: state.engine.status(),
        trace_logs_enabled: state.trace_logs.load(Ordering::Relaxed),
        event_throttling_enabled: state.event_throttling_enabled.load(Ordering::Relaxed),
        throttle_interval_ms: state.throttler.current_interval().as_millis() as u64,
        statistics: state.statistics.snapshot(),
    })
    .expect("serializable"))
}
