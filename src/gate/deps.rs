//! Dependency/connectivity probes (`spec.md` §4.7, §6): docker, internet,
//! ffmpeg, mediainfo availability.
//!
//! Grounded on the teacher's `ffui_core::tools::probe` pattern of shelling
//! out to a tool with a short timeout and treating anything but a clean
//! exit as unavailable, adapted from the teacher's sync
//! `run_command_with_timeout_capture_stderr` to the async cancellable
//! `exec::run_cancellable` shim this crate uses everywhere else.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::exec::{self, background_command};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

async fn probe_binary(program: &str, args: &[&str]) -> bool {
    let mut cmd = background_command(program);
    cmd.args(args);
    match exec::run_cancellable(cmd, CancellationToken::new(), PROBE_TIMEOUT).await {
        Ok(output) => output.status.success() && !output.cancelled,
        Err(_) => false,
    }
}

pub async fn check_ffmpeg_availability() -> bool {
    probe_binary("ffmpeg", &["-version"]).await
}

pub async fn check_mediainfo_availability() -> bool {
    probe_binary("mediainfo", &["--version"]).await
}

pub async fn check_docker_availability() -> bool {
    probe_binary("docker", &["info"]).await
}

/// Internet reachability, probed with a short HTTP HEAD rather than a raw
/// socket connect so it also catches captive portals / DNS-only failure
/// modes. `reqwest` is already in the dependency stack for provider HTTP
/// calls, so this reuses it instead of adding a dedicated ICMP/socket crate.
pub async fn check_internet_connectivity() -> bool {
    let client = match reqwest::Client::builder().timeout(PROBE_TIMEOUT).build() {
        Ok(client) => client,
        Err(_) => return false,
    };
    client
        .head("https://www.google.com/generate_204")
        .send()
        .await
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_reports_unavailable() {
        assert!(!probe_binary("langkit-definitely-not-a-real-binary", &[]).await);
    }
}
