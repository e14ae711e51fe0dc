//! OpenAI Whisper-compatible STT adapter. Minimal marshalling: the
//! transcription endpoint contract (multipart upload, JSON segment list)
//! is represented faithfully enough to exercise the `SttProvider` seam;
//! it is not a complete client.

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::{Capability, ProviderCapabilities, ProviderKind};
use crate::error::LangkitError;

use crate::providers::traits::{ModelInfo, ProviderMeta, SttProvider, TranscriptSegment};

pub struct OpenAiStt {
    client: reqwest::Client,
    base_url: String,
}

impl OpenAiStt {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

impl Default for OpenAiStt {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct WireSegment {
    start: f64,
    end: f64,
    text: String,
}

#[derive(Debug, Deserialize)]
struct WireTranscription {
    segments: Vec<WireSegment>,
}

#[async_trait]
impl ProviderMeta for OpenAiStt {
    fn name(&self) -> &str {
        "openai"
    }

    fn description(&self) -> &str {
        "OpenAI Whisper speech-to-text"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Stt
    }

    fn requires_api_key(&self) -> bool {
        true
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            capabilities: vec![Capability::Text, Capability::InitialPrompt],
        }
    }

    async fn probe_reachable(&self, api_key: Option<&str>) -> bool {
        let Some(api_key) = api_key else {
            return false;
        };
        self.client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(api_key)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    async fn available_models(&self, _api_key: Option<&str>) -> anyhow::Result<Vec<ModelInfo>> {
        Ok(vec![ModelInfo {
            id: "whisper-1".to_string(),
            display_name: "Whisper v1".to_string(),
            recommended: true,
            capabilities: self.capabilities(),
        }])
    }
}

#[async_trait]
impl SttProvider for OpenAiStt {
    async fn transcribe(
        &self,
        audio_path: &std::path::Path,
        model: &str,
        language: Option<&str>,
        api_key: &str,
    ) -> Result<Vec<TranscriptSegment>, LangkitError> {
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

        let mut form = reqwest::multipart::Form::new()
            .text("model", model.to_string())
            .text("response_format", "verbose_json")
            .part("file", reqwest::multipart::Part::bytes(bytes).file_name(file_name));
        if let Some(language) = language {
            form = form.text("language", language.to_string());
        }

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(api_key)
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

        let parsed: WireTranscription =
            response
                .json()
                .await
                .map_err(|err| LangkitError::PermanentRemote {
                    provider: self.name().to_string(),
                    message: format!("invalid response schema: {err}"),
                })?;

        Ok(parsed
            .segments
            .into_iter()
            .map(|s| TranscriptSegment {
                start_ms: (s.start * 1000.0).round() as u64,
                end_ms: (s.end * 1000.0).round() as u64,
                text: s.text,
            })
            .collect())
    }
}
