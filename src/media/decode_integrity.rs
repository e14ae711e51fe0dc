//! Decode-integrity probing (`spec.md` §4.5): a streamed decode with strict
//! error flags, run per audio stream (and the first video stream if
//! requested) at three fixed sample windows, or over the whole file in
//! `full` mode.

use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::exec::{self, background_command};

pub const SAMPLE_WINDOW_SECONDS: u64 = 20;
const PROBE_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityVerdict {
    Clean,
    Corrupted,
}

#[derive(Debug, Clone)]
pub struct DecodeIntegrityResult {
    pub verdict: IntegrityVerdict,
    /// Populated when `verdict` is `Corrupted`; describes what failed,
    /// including execution-level failures like a missing binary — these
    /// are never silently treated as clean (`spec.md` §4.5).
    pub detail: Option<String>,
}

impl DecodeIntegrityResult {
    fn clean() -> Self {
        Self {
            verdict: IntegrityVerdict::Clean,
            detail: None,
        }
    }

    fn corrupted(detail: impl Into<String>) -> Self {
        Self {
            verdict: IntegrityVerdict::Corrupted,
            detail: Some(detail.into()),
        }
    }
}

/// Three fixed sample windows relative to total duration: start, midpoint,
/// and near-end, each `SAMPLE_WINDOW_SECONDS` long (`spec.md` §4.5).
pub fn sample_windows(duration_ms: u64) -> [(u64, u64); 3] {
    let duration_s = duration_ms / 1000;
    let window = SAMPLE_WINDOW_SECONDS;
    let start = 0;
    let midpoint = duration_s.saturating_sub(window) / 2;
    let near_end = duration_s.saturating_sub(window);
    [(start, window), (midpoint, window), (near_end, window)]
}

async fn decode_window(path: &Path, start_seconds: u64, length_seconds: u64) -> DecodeIntegrityResult {
    let mut cmd = background_command("ffmpeg");
    cmd.args([
        "-v",
        "error",
        "-xerror",
        "-ss",
        &start_seconds.to_string(),
        "-t",
        &length_seconds.to_string(),
        "-i",
    ]);
    cmd.arg(path);
    cmd.args(["-f", "null", "-"]);

    match exec::run_cancellable(cmd, CancellationToken::new(), PROBE_TIMEOUT).await {
        Ok(output) => {
            if !output.stderr.is_empty() {
                DecodeIntegrityResult::corrupted(String::from_utf8_lossy(&output.stderr).to_string())
            } else if !output.status.success() {
                DecodeIntegrityResult::corrupted(format!(
                    "ffmpeg exited with {:?} and no stderr",
                    output.status.code()
                ))
            } else {
                DecodeIntegrityResult::clean()
            }
        }
        Err(err) => DecodeIntegrityResult::corrupted(format!("failed to run ffmpeg: {err}")),
    }
}

/// Sampled-mode probe: the three fixed windows. Returns `Corrupted` on the
/// first failing window, short-circuiting the rest.
pub async fn probe_sampled(path: &Path, duration_ms: u64) -> DecodeIntegrityResult {
    for (start, length) in sample_windows(duration_ms) {
        let result = decode_window(path, start, length).await;
        if result.verdict == IntegrityVerdict::Corrupted {
            return result;
        }
    }
    DecodeIntegrityResult::clean()
}

/// Full-mode probe: decode the entire audio stream under strict flags.
pub async fn probe_full(path: &Path) -> DecodeIntegrityResult {
    let mut cmd = background_command("ffmpeg");
    cmd.args(["-v", "error", "-xerror", "-i"]);
    cmd.arg(path);
    cmd.args(["-f", "null", "-"]);

    match exec::run_cancellable(cmd, CancellationToken::new(), PROBE_TIMEOUT).await {
        Ok(output) => {
            if !output.stderr.is_empty() {
                DecodeIntegrityResult::corrupted(String::from_utf8_lossy(&output.stderr).to_string())
            } else if !output.status.success() {
                DecodeIntegrityResult::corrupted(format!(
                    "ffmpeg exited with {:?} and no stderr",
                    output.status.code()
                ))
            } else {
                DecodeIntegrityResult::clean()
            }
        }
        Err(err) => DecodeIntegrityResult::corrupted(format!("failed to run ffmpeg: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_windows_cover_start_mid_and_near_end() {
        let windows = sample_windows(600_000);
        assert_eq!(windows[0].0, 0);
        assert!(windows[1].0 > windows[0].0);
        assert!(windows[2].0 >= windows[1].0);
        assert!(windows.iter().all(|(_, len)| *len == SAMPLE_WINDOW_SECONDS));
    }

    #[test]
    fn sample_windows_do_not_underflow_on_short_media() {
        let windows = sample_windows(5_000);
        for (start, _) in windows {
            assert!(start < u64::MAX);
        }
    }

    #[tokio::test]
    async fn missing_binary_surfaces_as_corrupted_not_silently_clean() {
        let result = decode_window(Path::new("/nonexistent/path.mp4"), 0, 1).await;
        assert_eq!(result.verdict, IntegrityVerdict::Corrupted);
        assert!(result.detail.is_some());
    }
}
