//! Shared application state handed to every RPC handler and to the
//! WebSocket upgrade route (`spec.md` §9 "Global state": settings,
//! registry, and caches are constructed once in `main` and passed in as
//! dependency-injected collaborators rather than ambient globals).

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, RwLock};

use serde_json::Value;

use crate::broadcast::Broadcaster;
use crate::config::{AppSettings, Statistics};
use crate::domain::SequenceCounter;
use crate::engine::Engine;
use crate::media::IntegrityCache;
use crate::progress::BarRegistry;
use crate::providers::ProviderRegistry;
use crate::throttle::AdaptiveThrottler;

pub struct AppState {
    pub engine: Arc<Engine>,
    pub settings: Arc<RwLock<AppSettings>>,
    pub statistics: Arc<Statistics>,
    pub providers: Arc<ProviderRegistry>,
    pub broadcaster: Arc<Broadcaster>,
    pub throttler: Arc<AdaptiveThrottler>,
    pub integrity_cache: Arc<IntegrityCache>,
    pub bars: Arc<BarRegistry>,
    /// `SetTraceLogs`/`GetTraceLogs` (`spec.md` §6).
    pub trace_logs: AtomicBool,
    /// `SetEventThrottling`/`GetEventThrottlingStatus` (`spec.md` §6):
    /// whether adaptive throttling is active at all, independent of the
    /// interval bounds themselves.
    pub event_throttling_enabled: AtomicBool,
    /// Port the WebSocket/RPC listener bound to, reported by
    /// `GetSystemInfo` so the front-end can discover it without a second
    /// channel (`spec.md` §4.4 "reported ... via a single-port RPC or a
    /// config file").
    pub listen_port: u16,
    /// Sequence source for `LogEntry`s minted directly by `BackendLogger`
    /// calls, separate from the engine's own counter so RPC-originated and
    /// job-originated logs never collide on a sequence number.
    pub log_sequence: SequenceCounter,
    /// `RecordWasmState`/`RequestWasmState` (`spec.md` §6): the front-end's
    /// last-reported WASM-side state blob, opaque to this backend.
    pub wasm_state: Mutex<Option<Value>>,
    /// `DryRun` service state (`spec.md` §6): test-harness-only config and a
    /// one-shot injected error, both opaque to the rest of the backend.
    pub dry_run: Mutex<DryRunState>,
}

#[derive(Debug, Clone, Default)]
pub struct DryRunState {
    pub config: Option<Value>,
    pub injected_error: Option<String>,
}
