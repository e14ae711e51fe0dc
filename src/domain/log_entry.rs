use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Level scale from `spec.md` §3 ("level (-1...5)"): -1 = trace,
/// 0 = debug, 1 = info, 2 = warn, 3 = error, 4 = fatal, 5 = panic.
pub type LogLevel = i8;

pub const LEVEL_TRACE: LogLevel = -1;
pub const LEVEL_DEBUG: LogLevel = 0;
pub const LEVEL_INFO: LogLevel = 1;
pub const LEVEL_WARN: LogLevel = 2;
pub const LEVEL_ERROR: LogLevel = 3;
pub const LEVEL_FATAL: LogLevel = 4;
pub const LEVEL_PANIC: LogLevel = 5;

/// `spec.md` §3 "LogEntry". Ordering invariant: consumers must see entries
/// in non-decreasing unix time, ties broken by `sequence`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub component: String,
    pub operation: String,
    pub session_id: String,
    #[serde(default)]
    pub context: HashMap<String, Value>,
    pub sequence: u64,
    pub unix_time_ms: i64,
}

impl LogEntry {
    pub fn sort_key(&self) -> (i64, u64) {
        (self.unix_time_ms, self.sequence)
    }
}

/// Monotonic sequence-number generator shared by every `LogEntry` producer
/// in a session, so the `(unix_time, sequence)` tie-break in `spec.md` §3/§5
/// is globally well-ordered rather than merely per-producer.
#[derive(Debug, Default)]
pub struct SequenceCounter(std::sync::atomic::AtomicU64);

impl SequenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
    }
}
