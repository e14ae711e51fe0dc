//! Wire shapes sent to front-end WebSocket clients (`spec.md` §4.4, §6).
//!
//! Variant tags match the WebSocket event set named in `spec.md` §6
//! verbatim (`log.batch`, `progress.update`, ...) rather than the default
//! camelCase variant-name rendering, since several of those names contain a
//! dot.

use serde::Serialize;

use crate::domain::{Bar, LogEntry};
use crate::error::UiErrorEnvelope;

/// One dependency/connectivity check result, as surfaced by `dependency.status`
/// (`spec.md` §6, §4.7).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyCheck {
    pub name: String,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
#[allow(clippy::large_enum_variant)]
pub enum ServerEvent {
    /// Sent once, immediately on upgrade, so a reconnecting UI can re-derive
    /// state without replaying history (`spec.md` §4.4).
    Connected { bars: Vec<Bar> },
    /// Sent just before a connection is torn down server-side (saturated
    /// queue, job teardown mid-stream).
    Disconnected,
    #[serde(rename = "log.batch")]
    LogBatch { entries: Vec<LogEntry> },
    /// Non-terminal progress for one throttle flush (`spec.md` §4.3
    /// invariant (c): same-bar updates within a window collapse to the
    /// last value).
    #[serde(rename = "progress.update")]
    ProgressUpdate { bars: Vec<Bar> },
    /// Terminal bar states, split out of the same flush so the UI can treat
    /// them specially (never collapsed, always delivered) per `spec.md`
    /// §4.3 invariant (c) and §5 ordering guarantee (d).
    #[serde(rename = "progress.terminal")]
    ProgressTerminal { bars: Vec<Bar> },
    #[serde(rename = "state.llm")]
    StateLlm { job_id: String, text: String },
    #[serde(rename = "state.wasm")]
    StateWasm { payload: serde_json::Value },
    #[serde(rename = "dependency.status")]
    DependencyStatus { checks: Vec<DependencyCheck> },
    #[serde(rename = "job.complete")]
    JobComplete { job_id: String },
    #[serde(rename = "job.cancelled")]
    JobCancelled { job_id: String },
    #[serde(rename = "job.failed")]
    JobFailed {
        job_id: String,
        error: UiErrorEnvelope,
    },
}

impl ServerEvent {
    pub fn is_log(&self) -> bool {
        matches!(self, ServerEvent::LogBatch { .. })
    }
}
