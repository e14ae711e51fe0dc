//! *DryRun* RPC service (`spec.md` §6): a test-harness surface, not used by
//! the production front-end. `SetConfig`/`InjectError` let an integration
//! test steer otherwise-nondeterministic behaviour (which provider call
//! fails, with what) without reaching into process internals; `GetStatus`
//! reads the harness's own state back for assertions.

use serde::Deserialize;
use serde_json::Value;

use crate::sync_ext::MutexExt;

use super::error::RpcError;
use super::state::AppState;

#[derive(Deserialize)]
struct SetConfigRequest {
    config: Value,
}

/// `SetConfig(cfg)` (`spec.md` §6): stores an opaque config blob a test
/// fixture can later read via `GetStatus`. This backend attaches no
/// behaviour to its contents — interpretation is the test harness's job.
pub async fn set_config(state: &AppState, body: Value) -> Result<Value, RpcError> {
    let req: SetConfigRequest =
        serde_json::from_value(body).map_err(|err| RpcError::BadRequest(err.to_string()))?;
    state.dry_run.lock_unpoisoned().config = Some(req.config);
    Ok(Value::Null)
}

#[derive(Deserialize)]
struct InjectErrorRequest {
    #[serde(rename = "type")]
    kind: String,
}

/// `InjectError(type)` (`spec.md` §6): records a one-shot error kind for
/// `GetStatus` to report; a real call site that wants to honour it must
/// explicitly check `dry_run` state, since nothing in the engine consumes
/// this implicitly.
pub async fn inject_error(state: &AppState, body: Value) -> Result<Value, RpcError> {
    let req: InjectErrorRequest =
        serde_json::from_value(body).map_err(|err| RpcError::BadRequest(err.to_string()))?;
    state.dry_run.lock_unpoisoned().injected_error = Some(req.kind);
    Ok(Value::Null)
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct DryRunStatusResponse {
    config: Option<Value>,
    injected_error: Option<String>,
}

/// `GetStatus` (`spec.md` §6).
pub async fn get_status(state: &AppState, _body: Value) -> Result<Value, RpcError> {
    let dry_run = state.dry_run.lock_unpoisoned().clone();
    Ok(serde_json::to_value(DryRunStatusResponse {
        config: dry_run.config,
        injected_error: dry_run.injected_error,
    })
    .expect("serializable"))
}
