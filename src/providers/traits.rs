//! Provider boundary traits (`spec.md` §4.6): a uniform capability-set
//! contract STT, LLM, and voice-separation backends all implement, so the
//! engine and registry can treat them polymorphically.
//!
//! `SPEC_FULL.md` §4.1 scopes the concrete adapters to "contract specified,
//! marshalling not": each adapter's wire format is a minimal, plausible
//! shape for its real API rather than an exhaustive reproduction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{Capability, ProviderCapabilities, ProviderKind};
use crate::error::LangkitError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub id: String,
    pub display_name: String,
    pub recommended: bool,
    pub capabilities: ProviderCapabilities,
}

/// Common identity/metadata every provider exposes regardless of kind
/// (`spec.md` §4.6: "`name()`, `description()`, `requiresAPIKey()`,
/// `availableModels()`").
#[async_trait]
pub trait ProviderMeta: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn kind(&self) -> ProviderKind;
    fn requires_api_key(&self) -> bool;
    fn capabilities(&self) -> ProviderCapabilities;

    /// Reachability probe used to derive `available` on `ProviderSummary`:
    /// `{has API key} AND {reachability probe passed} AND {capabilities
    /// match request}` (`spec.md` §3 "Provider").
    async fn probe_reachable(&self, api_key: Option<&str>) -> bool;

    async fn available_models(&self, api_key: Option<&str>) -> anyhow::Result<Vec<ModelInfo>>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    #[serde(default)]
    pub initial_prompt: Option<String>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub context: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResponse {
    pub text: String,
    pub usage: UsageRecord,
}

/// A streamed completion: zero or more tokens followed by a terminal usage
/// record (`spec.md` §4.6: "a streamed token sequence with a terminal
/// usage record").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum StreamEvent {
    Token { text: String },
    Done { usage: UsageRecord },
}

#[async_trait]
pub trait LlmProvider: ProviderMeta {
    async fn complete(&self, req: CompletionRequest, api_key: &str)
        -> Result<CompletionResponse, LangkitError>;

    async fn complete_streaming(
        &self,
        req: CompletionRequest,
        api_key: &str,
    ) -> Result<Vec<StreamEvent>, LangkitError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSegment {
    pub start_ms: u64,
    pub end_ms: u64,
    pub text: String,
}

#[async_trait]
pub trait SttProvider: ProviderMeta {
    async fn transcribe(
        &self,
        audio_path: &std::path::Path,
        model: &str,
        language: Option<&str>,
        api_key: &str,
    ) -> Result<Vec<TranscriptSegment>, LangkitError>;
}

/// Voice-separation providers additionally expose a model/docker
/// acquisition pair so the pipeline can block on prerequisites and surface
/// their progress on the dedicated download bars (`spec.md` §4.6).
#[async_trait]
pub trait VoiceSeparationProvider: ProviderMeta {
    async fn separate(
        &self,
        audio_path: &std::path::Path,
        api_key: Option<&str>,
    ) -> Result<std::path::PathBuf, LangkitError>;

    async fn download_model(&self) -> Result<(), LangkitError>;
    async fn download_docker(&self) -> Result<(), LangkitError>;
    fn needs_docker(&self) -> bool;
}
