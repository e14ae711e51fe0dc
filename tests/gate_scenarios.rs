//! Integration test for `spec.md` §8 scenario 6 ("Gate failure"): starting a
//! job that needs Docker on a host without it is rejected before any
//! artefact is written, and the failure names `docker: unavailable`.
//!
//! A mock `ffmpeg`/`mediainfo` on `PATH` (the teacher's `ffui_mock_ffmpeg`
//! pattern, generalised to a shell script rather than a compiled binary
//! since no output parsing is exercised here) keeps those two unconditional
//! gate checks passing, isolating the failure to Docker.
//!
//! This test replaces the process `PATH` for its own duration; it must stay
//! the only test in this binary that does so, since `PATH` is process-wide.

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, RwLock};

use langkit_lib::broadcast::Broadcaster;
use langkit_lib::config::AppSettings;
use langkit_lib::domain::{Feature, JobSource};
use langkit_lib::engine::{Engine, ProcessingRequest};
use langkit_lib::error::{GateFailure, LangkitError};
use langkit_lib::media::IntegrityCache;
use langkit_lib::progress::BarRegistry;
use langkit_lib::providers::ProviderRegistry;
use langkit_lib::throttle::{AdaptiveThrottler, ThrottleConfig};

fn write_mock_binary(dir: &std::path::Path, name: &str) {
    let path = dir.join(name);
    std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
}

#[tokio::test]
async fn starting_a_docker_feature_without_docker_fails_the_gate() {
    let bin_dir = tempfile::tempdir().unwrap();
    write_mock_binary(bin_dir.path(), "ffmpeg");
    write_mock_binary(bin_dir.path(), "mediainfo");

    let original_path = std::env::var("PATH").unwrap_or_default();
    std::env::set_var("PATH", bin_dir.path());

    let settings = Arc::new(RwLock::new(AppSettings::default()));
    let bars = Arc::new(BarRegistry::new());
    let throttler = Arc::new(AdaptiveThrottler::new(ThrottleConfig::default()));
    let broadcaster = Arc::new(Broadcaster::new(bars.clone()));
    let providers = Arc::new(ProviderRegistry::new(vec![], vec![], vec![], Default::default()));
    let cache_dir = tempfile::tempdir().unwrap();
    let integrity_cache =
        Arc::new(IntegrityCache::load(cache_dir.path().join("cache.json")).unwrap());
    let engine = Engine::new(
        settings,
        bars,
        throttler,
        broadcaster,
        providers,
        integrity_cache,
        tokio::runtime::Handle::current(),
        1,
    );

    let request = ProcessingRequest {
        source: JobSource::File(PathBuf::from("/nonexistent/input.mp4")),
        features: vec![Feature::VoiceEnhancement],
        feature_options: Default::default(),
        target_language: "en".to_string(),
        native_languages: vec![],
        audio_track_index: None,
    };

    let result = engine.start(request).await;
    std::env::set_var("PATH", original_path);

    match result {
        Err(LangkitError::Gate(failures)) => {
            assert!(
                failures.iter().any(|f: &GateFailure| f.check == "docker"),
                "expected a docker gate failure, got {failures:?}"
            );
        }
        other => panic!("expected a gate failure, got {other:?}"),
    }

    engine.shutdown();
}
