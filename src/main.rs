//! Langkit server entry point (`spec.md` §6, §9 "AMBIENT RPC transport"):
//! loads settings and persisted state, wires the provider registry and
//! processing engine, spawns the throttler's tick loop, and serves the
//! `axum` router built in [`langkit_lib::server`].
//!
//! Grounded on the `sem_os_server` example crate's `main.rs` in this pack
//! (env-driven config, `tracing_subscriber::fmt` init, construct-then-bind
//! shape) — this crate's own teacher (`muyuanjin-ffui`) is a Tauri app with
//! no standalone binary entry point of its own to imitate here.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, RwLock};

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use langkit_lib::broadcast::Broadcaster;
use langkit_lib::config::{self, AppSettings, Statistics};
use langkit_lib::domain::SequenceCounter;
use langkit_lib::engine::Engine;
use langkit_lib::media::IntegrityCache;
use langkit_lib::progress::BarRegistry;
use langkit_lib::providers::adapters::{
    AssemblyAiStt, DemucsDocker, ElevenLabsVoiceSeparation, GoogleLlm, OpenAiStt, OpenRouterLlm,
    ReplicateVoiceSeparation,
};
use langkit_lib::providers::{ProviderMeta, ProviderRegistry};
use langkit_lib::rpc::{AppState, DryRunState};
use langkit_lib::server;
use langkit_lib::throttle::{AdaptiveThrottler, ThrottleConfig};

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:0";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,langkit=debug".into()),
        )
        .init();

    if let Err(err) = run().await {
        tracing::error!(error = %err, "startup failed");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    maybe_start_profiling();

    let settings = AppSettings::load()?;
    let statistics = Arc::new(Statistics::load()?);
    statistics.record_app_start()?;

    let integrity_cache = Arc::new(IntegrityCache::load(config::decode_integrity_cache_path())?);

    let api_keys = collect_api_keys(&settings);
    let providers = Arc::new(ProviderRegistry::new(
        vec![Arc::new(AssemblyAiStt::new()), Arc::new(OpenAiStt::new())],
        vec![Arc::new(GoogleLlm::new()), Arc::new(OpenRouterLlm::new())],
        vec![
            Arc::new(DemucsDocker::new()),
            Arc::new(ElevenLabsVoiceSeparation::new()),
            Arc::new(ReplicateVoiceSeparation::new()),
        ],
        api_keys,
    ));

    let bars = Arc::new(BarRegistry::new());
    let broadcaster = Arc::new(Broadcaster::new(bars.clone()));
    let throttle_config = ThrottleConfig {
        min_interval: std::time::Duration::from_millis(settings.throttle.min_interval_ms),
        max_interval: std::time::Duration::from_millis(settings.throttle.max_interval_ms),
        ..ThrottleConfig::default()
    };
    let throttler = Arc::new(AdaptiveThrottler::new(throttle_config));

    let worker_count = settings.queue.worker_count;
    let settings = Arc::new(RwLock::new(settings));

    let engine = Engine::new(
        settings.clone(),
        bars.clone(),
        throttler.clone(),
        broadcaster.clone(),
        providers.clone(),
        integrity_cache.clone(),
        tokio::runtime::Handle::current(),
        worker_count,
    );

    let throttle_cancel = CancellationToken::new();
    let throttle_task = tokio::spawn({
        let throttler = throttler.clone();
        let sink: Arc<dyn langkit_lib::throttle::BatchSink> = broadcaster.clone();
        let cancel = throttle_cancel.clone();
        async move { throttler.run(sink, cancel).await }
    });

    let bind_addr =
        std::env::var("LANGKIT_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    let listener = TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind to {bind_addr}: {e}"));
    let listen_port = listener.local_addr()?.port();
    tracing::info!(port = listen_port, "langkit listening");

    let app_state = Arc::new(AppState {
        engine: engine.clone(),
        settings,
        statistics,
        providers,
        broadcaster,
        throttler,
        integrity_cache,
        bars,
        trace_logs: AtomicBool::new(false),
        event_throttling_enabled: AtomicBool::new(true),
        listen_port,
        log_sequence: SequenceCounter::new(),
        wasm_state: Mutex::new(None),
        dry_run: Mutex::new(DryRunState::default()),
    });

    let app = server::router(app_state);
    let serve = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());
    if let Err(err) = serve.await {
        tracing::error!(error = %err, "server error");
    }

    throttle_cancel.cancel();
    let _ = throttle_task.await;
    engine.shutdown();

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

/// Builds the provider-name-keyed API key map the registry needs, preferring
/// environment variables over persisted settings (`spec.md` §4.8, §6) for
/// every provider adapter wired into `main`.
fn collect_api_keys(settings: &AppSettings) -> HashMap<String, String> {
    let provider_names = [
        AssemblyAiStt::new().name().to_string(),
        OpenAiStt::new().name().to_string(),
        GoogleLlm::new().name().to_string(),
        OpenRouterLlm::new().name().to_string(),
        DemucsDocker::new().name().to_string(),
        ElevenLabsVoiceSeparation::new().name().to_string(),
        ReplicateVoiceSeparation::new().name().to_string(),
    ];
    let mut keys = HashMap::new();
    for name in provider_names {
        if let Some(key) = settings.effective_api_key(&name) {
            keys.insert(name, key);
        }
    }
    keys
}

/// `LANGKIT_PROFILE_CPU`/`LANGKIT_PROFILE_MEMORY` (`spec.md` §6): this build
/// carries no sampling-profiler dependency, so toggling either variable
/// just ensures the output directory exists and is logged, leaving actual
/// capture to whatever external profiler the deployment attaches.
fn maybe_start_profiling() {
    let cpu = std::env::var_os("LANGKIT_PROFILE_CPU").is_some();
    let memory = std::env::var_os("LANGKIT_PROFILE_MEMORY").is_some();
    if !cpu && !memory {
        return;
    }
    let dir = config::pprof_dir();
    if let Err(err) = std::fs::create_dir_all(&dir) {
        tracing::warn!(error = %err, dir = %dir.display(), "failed to create pprof directory");
        return;
    }
    tracing::info!(cpu, memory, dir = %dir.display(), "profiling requested");
}
