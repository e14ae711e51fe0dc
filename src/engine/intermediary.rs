//! Intermediary-artefact disposal (`spec.md` §4.1: "once an artefact's
//! dependents have all finished consuming it, the engine applies the
//! configured intermediary policy — keep, recompress, or delete").
//!
//! Every feature's output is itself one of `spec.md` §1's deliverables
//! (voice tracks, dubtitles, romanised scripts, ...), so an artefact is only
//! ever a disposal candidate when some other *selected* feature also
//! consumes it (`engine::features::has_selected_dependent`); a leaf feature's
//! output is never touched regardless of policy. Disposal itself only runs
//! once every dependent task has reached a terminal status, which the worker
//! determines via `Dag::dependents_of` reference counting before calling
//! [`maybe_dispose`].

use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::config::IntermediaryPolicy;
use crate::error::LangkitError;
use crate::exec::{self, background_command};

/// Applies `policy` to `artifact` once the caller has confirmed every
/// dependent task has finished consuming it. `Keep` is a no-op; `Delete`
/// removes the file outright; `Recompress` re-encodes audio artefacts to a
/// low-bitrate copy in place, shrinking disk footprint while keeping a
/// listenable fallback around (grounded on `providers::adapters::demucs_docker`'s
/// ffmpeg-subprocess shape).
pub async fn maybe_dispose(
    policy: IntermediaryPolicy,
    artifact: &Path,
    cancel: &CancellationToken,
) -> Result<(), LangkitError> {
    match policy {
        IntermediaryPolicy::Keep => Ok(()),
        IntermediaryPolicy::Delete => delete(artifact).await,
        IntermediaryPolicy::Recompress => recompress_audio(artifact, cancel).await,
    }
}

async fn delete(artifact: &Path) -> Result<(), LangkitError> {
    match tokio::fs::remove_file(artifact).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(LangkitError::LocalIo {
            path: artifact.display().to_string(),
            message: err.to_string(),
        }),
    }
}

const RECOMPRESS_BITRATE: &str = "64k";

async fn recompress_audio(
    artifact: &Path,
    cancel: &CancellationToken,
) -> Result<(), LangkitError> {
    let tmp = artifact.with_extension("recompress.tmp");

    let mut cmd = background_command("ffmpeg");
    cmd.args(["-y", "-i"])
        .arg(artifact)
        .args(["-b:a", RECOMPRESS_BITRATE])
        .arg(&tmp);

    let output = exec::run_cancellable(cmd, cancel.clone(), exec::DEFAULT_DRAIN)
        .await
        .map_err(|err| LangkitError::Subprocess {
            program: "ffmpeg".to_string(),
            message: err.to_string(),
        })?;

    if output.cancelled {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(LangkitError::UserCancel);
    }
    if !output.status.success() {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(LangkitError::Subprocess {
            program: "ffmpeg".to_string(),
            message: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    tokio::fs::rename(&tmp, artifact)
        .await
        .map_err(|err| LangkitError::LocalIo {
            path: artifact.display().to_string(),
            message: err.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn keep_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact.wav");
        tokio::fs::write(&path, b"data").await.unwrap();
        let cancel = CancellationToken::new();

        maybe_dispose(IntermediaryPolicy::Keep, &path, &cancel)
            .await
            .unwrap();

        assert!(path.exists());
    }

    #[tokio::test]
    async fn delete_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact.wav");
        tokio::fs::write(&path, b"data").await.unwrap();
        let cancel = CancellationToken::new();

        maybe_dispose(IntermediaryPolicy::Delete, &path, &cancel)
            .await
            .unwrap();

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn delete_is_idempotent_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.wav");
        let cancel = CancellationToken::new();

        assert!(maybe_dispose(IntermediaryPolicy::Delete, &path, &cancel)
            .await
            .is_ok());
    }
}
