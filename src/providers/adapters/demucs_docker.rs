//! Docker-hosted Demucs voice separator. Grounded on this crate's own
//! `exec::run_cancellable`/`gate::check_docker_availability` shims rather
//! than a teacher file — the teacher is a transcoding GUI with no
//! voice-separation feature of its own, so this adapter follows the same
//! "shell out, treat non-zero exit as failure" idiom the gate probes use.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::{ProviderCapabilities, ProviderKind};
use crate::error::LangkitError;
use crate::exec::{self, background_command};

use crate::providers::traits::{ModelInfo, ProviderMeta, VoiceSeparationProvider};

const SEPARATION_TIMEOUT: Duration = Duration::from_secs(900);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Docker image carrying the Demucs model weights baked in, so
/// `download_model` and `download_docker` collapse to the same `docker
/// pull` (`spec.md` §4.6 "downloadModel/downloadDocker pair").
const DEMUCS_IMAGE: &str = "langkit/demucs-worker:latest";

pub struct DemucsDocker;

impl DemucsDocker {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DemucsDocker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderMeta for DemucsDocker {
    fn name(&self) -> &str {
        "demucs"
    }

    fn description(&self) -> &str {
        "Demucs voice separator (docker)"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::VoiceSeparation
    }

    fn requires_api_key(&self) -> bool {
        false
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::default()
    }

    async fn probe_reachable(&self, _api_key: Option<&str>) -> bool {
        crate::gate::check_docker_availability().await
    }

    async fn available_models(&self, _api_key: Option<&str>) -> anyhow::Result<Vec<ModelInfo>> {
        Ok(vec![ModelInfo {
            id: "htdemucs".to_string(),
            display_name: "Hybrid Transformer Demucs".to_string(),
            recommended: true,
            capabilities: self.capabilities(),
        }])
    }
}

#[async_trait]
impl VoiceSeparationProvider for DemucsDocker {
    async fn separate(
        &self,
        audio_path: &Path,
        _api_key: Option<&str>,
    ) -> Result<PathBuf, LangkitError> {
        let out_dir = audio_path.with_extension("");
        let mut cmd = background_command("docker");
        cmd.args(["run", "--rm", "-v"])
            .arg(format!(
                "{}:/input:ro",
                audio_path.parent().unwrap_or_else(|| Path::new(".")).display()
            ))
            .args(["-v"])
            .arg(format!("{}:/output", out_dir.display()))
            .arg(DEMUCS_IMAGE)
            .arg("--two-stems=vocals")
            .arg(format!(
                "/input/{}",
                audio_path.file_name().unwrap_or_default().to_string_lossy()
            ));

        let output = exec::run_cancellable(cmd, CancellationToken::new(), SEPARATION_TIMEOUT)
            .await
            .map_err(|err| LangkitError::Subprocess {
                program: "docker".to_string(),
                message: err.to_string(),
            })?;

        if !output.status.success() {
            return Err(LangkitError::Subprocess {
                program: "docker".to_string(),
                message: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        Ok(out_dir.join("vocals.wav"))
    }

    async fn download_model(&self) -> Result<(), LangkitError> {
        self.download_docker().await
    }

    async fn download_docker(&self) -> Result<(), LangkitError> {
        let mut cmd = background_command("docker");
        cmd.args(["pull", DEMUCS_IMAGE]);
        let output = exec::run_cancellable(cmd, CancellationToken::new(), DOWNLOAD_TIMEOUT)
            .await
            .map_err(|err| LangkitError::Subprocess {
                program: "docker".to_string(),
                message: err.to_string(),
            })?;
        if !output.status.success() {
            return Err(LangkitError::Subprocess {
                program: "docker".to_string(),
                message: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }
        Ok(())
    }

    fn needs_docker(&self) -> bool {
        true
    }
}
