//! Integration test for `spec.md` §8 scenario 5 ("Provider fallback"):
//! when the configured default STT provider is unreachable,
//! `GetAvailableSTTModelsForUI` must report `available=false` and suggest a
//! live alternative instead.
//!
//! Grounded on the teacher pack's own preference for exercising fallback
//! logic against small in-test provider stubs rather than real network
//! calls (mirrors `ffui_mock_ffmpeg` standing in for a real subprocess).

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use langkit_lib::broadcast::Broadcaster;
use langkit_lib::config::AppSettings;
use langkit_lib::domain::{Capability, ProviderCapabilities, ProviderKind};
use langkit_lib::engine::Engine;
use langkit_lib::media::IntegrityCache;
use langkit_lib::progress::BarRegistry;
use langkit_lib::providers::{ModelInfo, ProviderMeta, ProviderRegistry, SttProvider};
use langkit_lib::rpc::{dispatch, AppState, DryRunState};
use langkit_lib::throttle::{AdaptiveThrottler, ThrottleConfig};

struct StubStt {
    name: &'static str,
    reachable: bool,
}

#[async_trait]
impl ProviderMeta for StubStt {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.name
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Stt
    }

    fn requires_api_key(&self) -> bool {
        false
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            capabilities: vec![Capability::Streaming],
        }
    }

    async fn probe_reachable(&self, _api_key: Option<&str>) -> bool {
        self.reachable
    }

    async fn available_models(&self, _api_key: Option<&str>) -> anyhow::Result<Vec<ModelInfo>> {
        Ok(vec![])
    }
}

#[async_trait]
impl SttProvider for StubStt {
    async fn transcribe(
        &self,
        _audio_path: &std::path::Path,
        _model: &str,
        _language: Option<&str>,
        _api_key: &str,
    ) -> Result<Vec<langkit_lib::providers::TranscriptSegment>, langkit_lib::LangkitError> {
        unimplemented!("not exercised by this scenario")
    }
}

fn test_state(runtime: tokio::runtime::Handle, settings: AppSettings) -> AppState {
    let settings = Arc::new(RwLock::new(settings));
    let bars = Arc::new(BarRegistry::new());
    let throttler = Arc::new(AdaptiveThrottler::new(ThrottleConfig::default()));
    let broadcaster = Arc::new(Broadcaster::new(bars.clone()));
    let providers = Arc::new(ProviderRegistry::new(
        vec![
            Arc::new(StubStt {
                name: "primary",
                reachable: false,
            }),
            Arc::new(StubStt {
                name: "backup",
                reachable: true,
            }),
        ],
        vec![],
        vec![],
        Default::default(),
    ));
    let dir = tempfile::tempdir().unwrap();
    let integrity_cache = Arc::new(IntegrityCache::load(dir.path().join("cache.json")).unwrap());
    let statistics =
        Arc::new(langkit_lib::config::Statistics::load_from(dir.path().join("stats.json")).unwrap());
    let engine = Engine::new(
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
        log_sequence: langkit_lib::domain::SequenceCounter::new(),
        wasm_state: std::sync::Mutex::new(None),
        dry_run: std::sync::Mutex::new(DryRunState::default()),
    }
}

#[tokio::test]
async fn unreachable_default_provider_yields_a_live_suggestion() {
    let mut settings = AppSettings::default();
    settings.default_stt_provider = Some("primary".to_string());
    let state = test_state(tokio::runtime::Handle::current(), settings);

    let value = dispatch(&state, "GetAvailableSTTModelsForUI", serde_json::Value::Null)
        .await
        .unwrap();

    assert_eq!(value["available"], false);
    assert_eq!(value["suggested"], "backup");

    state.engine.shutdown();
}

#[tokio::test]
async fn no_other_provider_configured_yields_an_empty_suggestion() {
    let mut settings = AppSettings::default();
    settings.default_stt_provider = Some("primary".to_string());
    let state = test_state(tokio::runtime::Handle::current(), settings);
    // Only the unreachable default is registered in this variant.
    let providers = Arc::new(ProviderRegistry::new(
        vec![Arc::new(StubStt {
            name: "primary",
            reachable: false,
        })],
        vec![],
        vec![],
        Default::default(),
    ));
    let state = AppState {
        providers,
        ..state
    };

    let value = dispatch(&state, "GetAvailableSTTModelsForUI", serde_json::Value::Null)
        .await
        .unwrap();

    assert_eq!(value["available"], false);
    assert_eq!(value["suggested"], "");

    state.engine.shutdown();
}
