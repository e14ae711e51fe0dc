use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Stt,
    Llm,
    VoiceSeparation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    Text,
    Vision,
    InitialPrompt,
    Streaming,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderCapabilities {
    pub capabilities: Vec<Capability>,
}

impl ProviderCapabilities {
    pub fn has(&self, cap: Capability) -> bool {
        self.capabilities.contains(&cap)
    }
}

/// An STT or LLM backend (`spec.md` §3 "Provider"). Availability is derived,
/// not stored: `{has API key} AND {reachability probe passed} AND
/// {capabilities match request}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSummary {
    pub name: String,
    pub display_name: String,
    pub kind: ProviderKind,
    pub capabilities: ProviderCapabilities,
    pub available: bool,
    pub recommended: bool,
    pub deprecated: bool,
}
