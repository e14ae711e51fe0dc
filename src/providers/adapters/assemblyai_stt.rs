//! AssemblyAI speech-to-text adapter. Minimal marshalling: upload, submit a
//! transcription job, poll until terminal, map the word-level output to
//! `TranscriptSegment`s. Not a complete client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::domain::{Capability, ProviderCapabilities, ProviderKind};
use crate::error::LangkitError;

use crate::providers::traits::{ModelInfo, ProviderMeta, SttProvider, TranscriptSegment};

const POLL_INTERVAL: Duration = Duration::from_secs(2);
const MAX_POLLS: u32 = 150;

pub struct AssemblyAiStt {
    client: reqwest::Client,
    base_url: String,
}

impl AssemblyAiStt {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "https://api.assemblyai.com/v2".to_string(),
        }
    }
}

impl Default for AssemblyAiStt {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptCreated {
    id: String,
}

#[derive(Debug, Deserialize)]
struct WireWord {
    start: u64,
    end: u64,
    text: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptPoll {
    status: String,
    error: Option<String>,
    #[serde(default)]
    words: Vec<WireWord>,
}

#[async_trait]
impl ProviderMeta for AssemblyAiStt {
    fn name(&self) -> &str {
        "assemblyai"
    }

    fn description(&self) -> &str {
        "AssemblyAI speech-to-text"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Stt
    }

    fn requires_api_key(&self) -> bool {
        true
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            capabilities: vec![Capability::Text],
        }
    }

    async fn probe_reachable(&self, api_key: Option<&str>) -> bool {
        let Some(api_key) = api_key else {
            return false;
        };
        self.client
            .get(format!("{}/transcript", self.base_url))
            .header("authorization", api_key)
            .send()
            .await
            .map(|r| r.status().is_success() || r.status().as_u16() == 404)
            .unwrap_or(false)
    }

    async fn available_models(&self, _api_key: Option<&str>) -> anyhow::Result<Vec<ModelInfo>> {
        Ok(vec![ModelInfo {
            id: "best".to_string(),
            display_name: "Best (general-purpose)".to_string(),
            recommended: true,
            capabilities: self.capabilities(),
        }])
    }
}

#[async_trait]
impl SttProvider for AssemblyAiStt {
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

        let upload: UploadResponse = self
            .client
            .post(format!("{}/upload", self.base_url))
            .header("authorization", api_key)
            .body(bytes)
            .send()
            .await
            .map_err(remote_transient(self.name()))?
            .json()
            .await
            .map_err(schema_error(self.name()))?;

        let mut body = json!({
            "audio_url": upload.upload_url,
            "speech_model": model,
        });
        if let Some(language) = language {
            body["language_code"] = json!(language);
        }

        let created: TranscriptCreated = self
            .client
            .post(format!("{}/transcript", self.base_url))
            .header("authorization", api_key)
            .json(&body)
            .send()
            .await
            .map_err(remote_transient(self.name()))?
            .json()
            .await
            .map_err(schema_error(self.name()))?;

        for _ in 0..MAX_POLLS {
            tokio::time::sleep(POLL_INTERVAL).await;
            let poll: TranscriptPoll = self
                .client
                .get(format!("{}/transcript/{}", self.base_url, created.id))
                .header("authorization", api_key)
                .send()
                .await
                .map_err(remote_transient(self.name()))?
                .json()
                .await
                .map_err(schema_error(self.name()))?;

            match poll.status.as_str() {
                "completed" => {
                    return Ok(poll
                        .words
                        .into_iter()
                        .map(|w| TranscriptSegment {
                            start_ms: w.start,
                            end_ms: w.end,
                            text: w.text,
                        })
                        .collect());
                }
                "error" => {
                    return Err(LangkitError::PermanentRemote {
                        provider: self.name().to_string(),
                        message: poll.error.unwrap_or_else(|| "transcription failed".into()),
                    });
                }
                _ => continue,
            }
        }

        Err(LangkitError::TransientRemote {
            provider: self.name().to_string(),
            message: "timed out waiting for transcription to complete".to_string(),
        })
    }
}

fn remote_transient(provider: &str) -> impl Fn(reqwest::Error) -> LangkitError + '_ {
    move |err| LangkitError::TransientRemote {
        provider: provider.to_string(),
        message: err.to_string(),
    }
}

fn schema_error(provider: &str) -> impl Fn(reqwest::Error) -> LangkitError + '_ {
    move |err| LangkitError::PermanentRemote {
        provider: provider.to_string(),
        message: format!("invalid response schema: {err}"),
    }
}
