//! ElevenLabs voice-isolator adapter: a single synchronous multipart
//! upload that returns the isolated vocal track directly, unlike the
//! create-then-poll shape of the Replicate/AssemblyAI adapters.

use async_trait::async_trait;

use crate::domain::{ProviderCapabilities, ProviderKind};
use crate::error::LangkitError;

use crate::providers::traits::{ModelInfo, ProviderMeta, VoiceSeparationProvider};

pub struct ElevenLabsVoiceSeparation {
    client: reqwest::Client,
    base_url: String,
}

impl ElevenLabsVoiceSeparation {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "https://api.elevenlabs.io/v1".to_string(),
        }
    }
}

impl Default for ElevenLabsVoiceSeparation {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderMeta for ElevenLabsVoiceSeparation {
    fn name(&self) -> &str {
        "elevenlabs"
    }

    fn description(&self) -> &str {
        "ElevenLabs voice isolator"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::VoiceSeparation
    }

    fn requires_api_key(&self) -> bool {
        true
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::default()
    }

    async fn probe_reachable(&self, api_key: Option<&str>) -> bool {
        let Some(api_key) = api_key else {
            return false;
        };
        self.client
            .get(format!("{}/user", self.base_url))
            .header("xi-api-key", api_key)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    async fn available_models(&self, _api_key: Option<&str>) -> anyhow::Result<Vec<ModelInfo>> {
        Ok(vec![ModelInfo {
            id: "isolator".to_string(),
            display_name: "Voice Isolator".to_string(),
            recommended: true,
            capabilities: self.capabilities(),
        }])
    }
}

#[async_trait]
impl VoiceSeparationProvider for ElevenLabsVoiceSeparation {
    async fn separate(
        &self,
        audio_path: &std::path::Path,
        api_key: Option<&str>,
    ) -> Result<std::path::PathBuf, LangkitError> {
        let Some(api_key) = api_key else {
            return Err(LangkitError::PermanentRemote {
                provider: self.name().to_string(),
                message: "no API key configured".to_string(),
            });
        };

        let bytes = tokio::fs::read(audio_path)
            .await
            .map_err(|err| LangkitError::LocalIo {
                path: audio_path.display().to_string(),
                message: err.to_string(),
            })?;
        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio".to_string());
        let form = reqwest::multipart::Form::new()
            .part("audio", reqwest::multipart::Part::bytes(bytes).file_name(file_name));

        let response = self
            .client
            .post(format!("{}/audio-isolation", self.base_url))
            .header("xi-api-key", api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|err| LangkitError::TransientRemote {
                provider: self.name().to_string(),
                message: err.to_string(),
            })?;

        if response.status().as_u16() == 429 || response.status().is_server_error() {
            return Err(LangkitError::TransientRemote {
                provider: self.name().to_string(),
                message: format!("HTTP {}", response.status()),
            });
        }
        if !response.status().is_success() {
            return Err(LangkitError::PermanentRemote {
                provider: self.name().to_string(),
                message: format!("HTTP {}", response.status()),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| LangkitError::TransientRemote {
                provider: self.name().to_string(),
                message: err.to_string(),
            })?;
        let out_path = audio_path.with_file_name(format!(
            "{}-vocals.wav",
            audio_path.file_stem().unwrap_or_default().to_string_lossy()
        ));
        tokio::fs::write(&out_path, bytes)
            .await
            .map_err(|err| LangkitError::LocalIo {
                path: out_path.display().to_string(),
                message: err.to_string(),
            })?;
        Ok(out_path)
    }

    async fn download_model(&self) -> Result<(), LangkitError> {
        Ok(())
    }

    async fn download_docker(&self) -> Result<(), LangkitError> {
        Ok(())
    }

    fn needs_docker(&self) -> bool {
        false
    }
}
