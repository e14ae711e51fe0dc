//! *Settings* and *statistics* RPC service (`spec.md` §6, §4.8): load/save
//! the persisted settings file and the usage counters, with the
//! save-triggered side effects the spec calls out explicitly (throttler
//! reconfiguration, provider-cache invalidation).

use serde::Deserialize;
use serde_json::Value;

use crate::config::AppSettings;
use crate::sync_ext::RwLockExt;
use crate::throttle::ThrottleConfig;

use super::error::RpcError;
use super::state::AppState;

/// `InitSettings`/`LoadSettings` (`spec.md` §6) are the same read from this
/// service's point of view: the settings file is loaded once at startup
/// into `AppState::settings`, and both methods just hand back the current
/// in-memory copy.
pub async fn load_settings(state: &AppState, _body: Value) -> Result<Value, RpcError> {
    let settings = state.settings.read_unpoisoned().clone();
    Ok(serde_json::to_value(settings).expect("serializable"))
}

/// `SaveSettings(settings)` (`spec.md` §6, §4.8): persists to disk, then
/// reconfigures the throttler's interval bounds and marks the provider
/// registry stale so the next model query refetches, both in the same
/// request rather than on the next poll.
pub async fn save_settings(state: &AppState, body: Value) -> Result<Value, RpcError> {
    let new_settings: AppSettings =
        serde_json::from_value(body).map_err(|err| RpcError::BadRequest(err.to_string()))?;

    new_settings
        .save()
        .map_err(|err| RpcError::Engine(crate::error::LangkitError::LocalIo {
            path: "settings".to_string(),
            message: err.to_string(),
        }))?;

    state.throttler.reconfigure(
        std::time::Duration::from_millis(new_settings.throttle.min_interval_ms),
        std::time::Duration::from_millis(new_settings.throttle.max_interval_ms),
        ThrottleConfig::default().max_log_entries,
    );
    state.providers.mark_stale();

    *state.settings.write_unpoisoned() = new_settings;
    Ok(Value::Null)
}

/// `LoadStatistics` (`spec.md` §6).
pub async fn load_statistics(state: &AppState, _body: Value) -> Result<Value, RpcError> {
    Ok(serde_json::to_value(state.statistics.snapshot()).expect("serializable"))
}

#[derive(Deserialize)]
struct UpdateStatisticsRequest {
    updates: std::collections::HashMap<String, u64>,
}

/// `UpdateStatistics(updates)` (`spec.md` §6): sets each named counter to
/// the given absolute value, persisting once after all are applied.
pub async fn update_statistics(state: &AppState, body: Value) -> Result<Value, RpcError> {
    let req: UpdateStatisticsRequest =
        serde_json::from_value(body).map_err(|err| RpcError::BadRequest(err.to_string()))?;
    state
        .statistics
        .update(req.updates)
        .map_err(|err| RpcError::Engine(crate::error::LangkitError::Internal(err.to_string())))?;
    Ok(Value::Null)
}

#[derive(Deserialize)]
struct IncrementStatisticRequest {
    key: String,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct IncrementStatisticResponse {
    new_value: u64,
}

/// `IncrementStatistic(key)` (`spec.md` §6).
pub async fn increment_statistic(state: &AppState, body: Value) -> Result<Value, RpcError> {
    let req: IncrementStatisticRequest =
        serde_json::from_value(body).map_err(|err| RpcError::BadRequest(err.to_string()))?;
    let new_value = state
        .statistics
        .increment(&req.key)
        .map_err(|err| RpcError::Engine(crate::error::LangkitError::Internal(err.to_string())))?;
    Ok(serde_json::to_value(IncrementStatisticResponse { new_value }).expect("serializable"))
}
