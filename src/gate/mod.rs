//! Integrity & resource gate (`spec.md` §4.7): the precondition sequence
//! that must pass before any feature task runs.

mod deps;
mod disk;
mod requirements;

pub use deps::{
    check_docker_availability, check_ffmpeg_availability, check_internet_connectivity,
    check_mediainfo_availability,
};
pub use disk::{check_free_space, same_filesystem};
pub use requirements::{aggregate as aggregate_requirements, FeatureRequirements};

use std::path::Path;

use crate::domain::{Feature, LanguageTag};
use crate::error::{GateFailure, LangkitError};
use crate::media::{self, IntegrityCache, IntegrityVerdict};

/// Input bundle for one run of the gate sequence. `docker_data_root` is
/// `None` when no selected feature needs docker, so the (possibly slow)
/// duplicate-filesystem check is skipped entirely. `integrity_cache` and
/// `duration_ms` are `None` to skip decode-integrity probing altogether,
/// e.g. for a dry-run gate check that only wants dependency/disk status.
pub struct GateRequest<'a> {
    pub target_language: &'a str,
    pub features: &'a [Feature],
    pub media_path: &'a Path,
    pub docker_data_root: Option<&'a Path>,
    pub decode_integrity_depth: DecodeIntegrityDepth,
    pub integrity_cache: Option<&'a IntegrityCache>,
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeIntegrityDepth {
    Sampled,
    Full,
}

/// Runs the full gate sequence described in `spec.md` §4.7 and returns
/// every failed precondition rather than bailing out on the first one, so
/// the caller can surface a complete structured error (`spec.md` §7).
pub async fn run_gate(req: GateRequest<'_>) -> Result<LanguageTag, LangkitError> {
    let mut failures: Vec<GateFailure> = Vec::new();

    let tag = match LanguageTag::canonicalize(req.target_language) {
        Some(tag) => Some(tag),
        None => {
            failures.push(GateFailure {
                check: "language".to_string(),
                reason: format!("'{}' is not a valid language tag", req.target_language),
            });
            None
        }
    };

    let lang_requirements = tag
        .as_ref()
        .map(|t| t.requirements())
        .unwrap_or_default_or_strict();
    let aggregate = requirements::aggregate(req.features, lang_requirements);

    if aggregate.needs_docker && !check_docker_availability().await {
        failures.push(GateFailure {
            check: "docker".to_string(),
            reason: "unavailable".to_string(),
        });
    }
    if aggregate.needs_internet && !check_internet_connectivity().await {
        failures.push(GateFailure {
            check: "internet".to_string(),
            reason: "unreachable".to_string(),
        });
    }
    if !check_ffmpeg_availability().await {
        failures.push(GateFailure {
            check: "ffmpeg".to_string(),
            reason: "unavailable".to_string(),
        });
    }
    if !check_mediainfo_availability().await {
        failures.push(GateFailure {
            check: "mediainfo".to_string(),
            reason: "unavailable".to_string(),
        });
    }

    if let Ok(Some(failure)) =
        disk::check_free_space(req.media_path, aggregate.min_free_disk_bytes, "media")
    {
        failures.push(failure);
    }
    if let Some(docker_root) = req.docker_data_root {
        if !same_filesystem(req.media_path, docker_root) {
            if let Ok(Some(failure)) =
                disk::check_free_space(docker_root, aggregate.min_free_disk_bytes, "docker")
            {
                failures.push(failure);
            }
        }
    }

    if let (Some(cache), Some(duration_ms)) = (req.integrity_cache, req.duration_ms) {
        let verdict = run_decode_integrity(req.media_path, duration_ms, req.decode_integrity_depth, cache).await;
        if verdict == IntegrityVerdict::Corrupted {
            failures.push(GateFailure {
                check: "decode-integrity".to_string(),
                reason: "corrupted".to_string(),
            });
        }
    }

    if failures.is_empty() {
        Ok(tag.expect("validated above"))
    } else {
        Err(LangkitError::Gate(failures))
    }
}

/// Checks the cache before spawning a decode (`spec.md` §4.5, §8 scenario
/// 4: a prior `full` result satisfies a later `sampled` request on the
/// same unchanged file), and records the result back into it afterward.
pub(crate) async fn run_decode_integrity(
    media_path: &Path,
    duration_ms: u64,
    depth: DecodeIntegrityDepth,
    cache: &IntegrityCache,
) -> IntegrityVerdict {
    match depth {
        DecodeIntegrityDepth::Sampled => {
            if let Some(cached) = cache.lookup_sampled(media_path) {
                return cached;
            }
            let result = media::probe_sampled(media_path, duration_ms).await;
            let _ = cache.record_sampled(media_path, result.verdict);
            result.verdict
        }
        DecodeIntegrityDepth::Full => {
            if let Some(cached) = cache.lookup_full(media_path) {
                return cached;
            }
            let result = media::probe_full(media_path).await;
            let _ = cache.record_full(media_path, result.verdict);
            result.verdict
        }
    }
}

/// Helper trait so a failed language canonicalisation still lets the rest
/// of the gate run (accumulating every failure) instead of short-circuiting
/// on missing requirements data.
trait LanguageRequirementsOrStrict {
    fn unwrap_or_default_or_strict(self) -> crate::domain::LanguageRequirements;
}

impl LanguageRequirementsOrStrict for Option<crate::domain::LanguageRequirements> {
    fn unwrap_or_default_or_strict(self) -> crate::domain::LanguageRequirements {
        self.unwrap_or(crate::domain::LanguageRequirements {
            needs_tokenization: false,
            needs_docker_romanization: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_language_tag_is_reported_as_a_gate_failure() {
        let dir = tempfile::tempdir().unwrap();
        let req = GateRequest {
            target_language: "",
            features: &[],
            media_path: dir.path(),
            docker_data_root: None,
            decode_integrity_depth: DecodeIntegrityDepth::Sampled,
            integrity_cache: None,
            duration_ms: None,
        };
        let result = run_gate(req).await;
        match result {
            Err(LangkitError::Gate(failures)) => {
                assert!(failures.iter().any(|f| f.check == "language"));
            }
            other => panic!("expected Gate error, got {other:?}"),
        }
    }
}
