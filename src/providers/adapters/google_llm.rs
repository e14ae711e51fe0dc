//! Google Gemini LLM adapter, used for summarisation/card-text generation
//! as an alternative to the OpenRouter gateway. Minimal marshalling.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::domain::{Capability, ProviderCapabilities, ProviderKind};
use crate::error::LangkitError;

use crate::providers::traits::{
    CompletionRequest, CompletionResponse, LlmProvider, ModelInfo, ProviderMeta, StreamEvent,
    UsageRecord,
};

pub struct GoogleLlm {
    client: reqwest::Client,
    base_url: String,
}

impl GoogleLlm {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }
}

impl Default for GoogleLlm {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct WirePart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct WireContent {
    parts: Vec<WirePart>,
}

#[derive(Debug, Deserialize)]
struct WireCandidate {
    content: WireContent,
}

#[derive(Debug, Deserialize)]
struct WireUsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: u64,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: u64,
}

#[derive(Debug, Deserialize)]
struct WireGenerateResponse {
    candidates: Vec<WireCandidate>,
    #[serde(rename = "usageMetadata", default)]
    usage_metadata: Option<WireUsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct WireModel {
    name: String,
    #[serde(rename = "displayName", default)]
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct WireModelList {
    models: Vec<WireModel>,
}

#[async_trait]
impl ProviderMeta for GoogleLlm {
    fn name(&self) -> &str {
        "google"
    }

    fn description(&self) -> &str {
        "Google Gemini"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Llm
    }

    fn requires_api_key(&self) -> bool {
        true
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            capabilities: vec![Capability::Text, Capability::Vision],
        }
    }

    async fn probe_reachable(&self, api_key: Option<&str>) -> bool {
        let Some(api_key) = api_key else {
            return false;
        };
        self.client
            .get(format!("{}/models?key={}", self.base_url, api_key))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    async fn available_models(&self, api_key: Option<&str>) -> anyhow::Result<Vec<ModelInfo>> {
        let Some(api_key) = api_key else {
            anyhow::bail!("google requires an API key to list models");
        };
        let response = self
            .client
            .get(format!("{}/models?key={}", self.base_url, api_key))
            .send()
            .await?;
        let list: WireModelList = response.json().await?;
        Ok(list
            .models
            .into_iter()
            .map(|m| ModelInfo {
                id: m.name,
                display_name: m.display_name,
                recommended: false,
                capabilities: self.capabilities(),
            })
            .collect())
    }
}

#[async_trait]
impl LlmProvider for GoogleLlm {
    async fn complete(
        &self,
        req: CompletionRequest,
        api_key: &str,
    ) -> Result<CompletionResponse, LangkitError> {
        let body = json!({
            "contents": [{"parts": [{"text": req.prompt}]}],
        });

        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent?key={}",
                self.base_url, req.model, api_key
            ))
            .json(&body)
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

        let parsed: WireGenerateResponse =
            response
                .json()
                .await
                .map_err(|err| LangkitError::PermanentRemote {
                    provider: self.name().to_string(),
                    message: format!("invalid response schema: {err}"),
                })?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .unwrap_or_default();
        let usage = parsed
            .usage_metadata
            .map(|u| UsageRecord {
                prompt_tokens: u.prompt_token_count,
                completion_tokens: u.candidates_token_count,
            })
            .unwrap_or(UsageRecord {
                prompt_tokens: 0,
                completion_tokens: 0,
            });

        Ok(CompletionResponse { text, usage })
    }

    async fn complete_streaming(
        &self,
        req: CompletionRequest,
        api_key: &str,
    ) -> Result<Vec<StreamEvent>, LangkitError> {
        // As with the OpenRouter adapter, token-level SSE streaming is out
        // of scope for this minimal marshalling; collapse to one token.
        let response = self.complete(req, api_key).await?;
        Ok(vec![
            StreamEvent::Token { text: response.text },
            StreamEvent::Done {
                usage: response.usage,
            },
        ])
    }
}
