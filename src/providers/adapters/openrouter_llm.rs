//! OpenRouter-compatible LLM adapter, used for summarisation in the
//! dubtitles/card-creation pipeline. Minimal chat-completions marshalling.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::domain::{Capability, ProviderCapabilities, ProviderKind};
use crate::error::LangkitError;

use crate::providers::traits::{
    CompletionRequest, CompletionResponse, LlmProvider, ModelInfo, ProviderMeta, StreamEvent,
    UsageRecord,
};

pub struct OpenRouterLlm {
    client: reqwest::Client,
    base_url: String,
}

impl OpenRouterLlm {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
        }
    }
}

impl Default for OpenRouterLlm {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct WireCompletion {
    choices: Vec<WireChoice>,
    usage: WireUsage,
}

#[derive(Debug, Deserialize)]
struct WireModel {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct WireModelList {
    data: Vec<WireModel>,
}

#[async_trait]
impl ProviderMeta for OpenRouterLlm {
    fn name(&self) -> &str {
        "openrouter"
    }

    fn description(&self) -> &str {
        "OpenRouter LLM gateway"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Llm
    }

    fn requires_api_key(&self) -> bool {
        true
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            capabilities: vec![Capability::Text, Capability::Streaming],
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

    async fn available_models(&self, api_key: Option<&str>) -> anyhow::Result<Vec<ModelInfo>> {
        let mut req = self.client.get(format!("{}/models", self.base_url));
        if let Some(api_key) = api_key {
            req = req.bearer_auth(api_key);
        }
        let response = req.send().await?;
        let list: WireModelList = response.json().await?;
        Ok(list
            .data
            .into_iter()
            .map(|m| ModelInfo {
                id: m.id,
                display_name: m.name,
                recommended: false,
                capabilities: self.capabilities(),
            })
            .collect())
    }
}

#[async_trait]
impl LlmProvider for OpenRouterLlm {
    async fn complete(
        &self,
        req: CompletionRequest,
        api_key: &str,
    ) -> Result<CompletionResponse, LangkitError> {
        let body = json!({
            "model": req.model,
            "messages": [{"role": "user", "content": req.prompt}],
            "stream": false,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
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

        let parsed: WireCompletion =
            response
                .json()
                .await
                .map_err(|err| LangkitError::PermanentRemote {
                    provider: self.name().to_string(),
                    message: format!("invalid response schema: {err}"),
                })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        Ok(CompletionResponse {
            text,
            usage: UsageRecord {
                prompt_tokens: parsed.usage.prompt_tokens,
                completion_tokens: parsed.usage.completion_tokens,
            },
        })
    }

    async fn complete_streaming(
        &self,
        req: CompletionRequest,
        api_key: &str,
    ) -> Result<Vec<StreamEvent>, LangkitError> {
        // Streaming marshalling (SSE token-by-token) is out of scope for
        // this minimal adapter; fall back to a single non-streamed
        // completion collapsed into one token plus the terminal usage
        // record so callers see the same contract shape either way.
        let response = self.complete(req, api_key).await?;
        Ok(vec![
            StreamEvent::Token { text: response.text },
            StreamEvent::Done {
                usage: response.usage,
            },
        ])
    }
}
