//! Provider registry (`spec.md` §4.6): registered at startup from
//! settings, with lazily-fetched and settings-invalidated model-list
//! caching.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::domain::{Capability, ProviderCapabilities, ProviderKind, ProviderSummary};
use crate::sync_ext::MutexExt;

use super::traits::{LlmProvider, ModelInfo, ProviderMeta, SttProvider, VoiceSeparationProvider};

pub struct ProviderRegistry {
    stt: Vec<Arc<dyn SttProvider>>,
    llm: Vec<Arc<dyn LlmProvider>>,
    voice_separation: Vec<Arc<dyn VoiceSeparationProvider>>,
    api_keys: HashMap<String, String>,
    model_cache: std::sync::Mutex<HashMap<String, Vec<ModelInfo>>>,
    /// Set when settings change; the next model-list query refetches
    /// instead of serving the cache (`spec.md` §4.8 side effect of save).
    stale: AtomicBool,
}

impl ProviderRegistry {
    pub fn new(
        stt: Vec<Arc<dyn SttProvider>>,
        llm: Vec<Arc<dyn LlmProvider>>,
        voice_separation: Vec<Arc<dyn VoiceSeparationProvider>>,
        api_keys: HashMap<String, String>,
    ) -> Self {
        Self {
            stt,
            llm,
            voice_separation,
            api_keys,
            model_cache: std::sync::Mutex::new(HashMap::new()),
            stale: AtomicBool::new(false),
        }
    }

    pub fn stt_providers(&self) -> &[Arc<dyn SttProvider>] {
        &self.stt
    }

    pub fn llm_providers(&self) -> &[Arc<dyn LlmProvider>] {
        &self.llm
    }

    pub fn voice_separation_providers(&self) -> &[Arc<dyn VoiceSeparationProvider>] {
        &self.voice_separation
    }

    pub fn find_llm(&self, name: &str) -> Option<Arc<dyn LlmProvider>> {
        self.llm.iter().find(|p| p.name() == name).cloned()
    }

    pub fn find_stt(&self, name: &str) -> Option<Arc<dyn SttProvider>> {
        self.stt.iter().find(|p| p.name() == name).cloned()
    }

    pub fn api_key_for(&self, provider_name: &str) -> Option<&str> {
        self.api_keys.get(provider_name).map(|s| s.as_str())
    }

    /// `SaveSettings`'s second side effect: mark the registry stale so the
    /// next model-list query refreshes (`spec.md` §4.8).
    pub fn mark_stale(&self) {
        self.stale.store(true, Ordering::Relaxed);
    }

    async fn summary_for(&self, meta: &dyn ProviderMeta) -> ProviderSummary {
        let api_key = self.api_key_for(meta.name());
        let available = (!meta.requires_api_key() || api_key.is_some())
            && meta.probe_reachable(api_key).await;
        ProviderSummary {
            name: meta.name().to_string(),
            display_name: meta.description().to_string(),
            kind: meta.kind(),
            capabilities: meta.capabilities(),
            available,
            recommended: false,
            deprecated: false,
        }
    }

    pub async fn summaries(&self, kind: ProviderKind) -> Vec<ProviderSummary> {
        match kind {
            ProviderKind::Stt => {
                let mut out = Vec::with_capacity(self.stt.len());
                for p in &self.stt {
                    out.push(self.summary_for(p.as_ref()).await);
                }
                out
            }
            ProviderKind::Llm => {
                let mut out = Vec::with_capacity(self.llm.len());
                for p in &self.llm {
                    out.push(self.summary_for(p.as_ref()).await);
                }
                out
            }
            ProviderKind::VoiceSeparation => {
                let mut out = Vec::with_capacity(self.voice_separation.len());
                for p in &self.voice_separation {
                    out.push(self.summary_for(p.as_ref()).await);
                }
                out
            }
        }
    }

    /// Lazily fetch and cache `provider_name`'s model list, refetching if
    /// the cache was invalidated by [`Self::mark_stale`] or never
    /// populated (`spec.md` §4.6).
    pub async fn available_models(&self, provider_name: &str) -> anyhow::Result<Vec<ModelInfo>> {
        if !self.stale.load(Ordering::Relaxed) {
            if let Some(cached) = self.model_cache.lock_unpoisoned().get(provider_name) {
                return Ok(cached.clone());
            }
        }

        let api_key = self.api_key_for(provider_name);
        let models = if let Some(p) = self.find_llm(provider_name) {
            p.available_models(api_key).await?
        } else if let Some(p) = self.find_stt(provider_name) {
            p.available_models(api_key).await?
        } else {
            anyhow::bail!("unknown provider '{provider_name}'");
        };

        self.model_cache
            .lock_unpoisoned()
            .insert(provider_name.to_string(), models.clone());
        self.stale.store(false, Ordering::Relaxed);
        Ok(models)
    }

    /// Selects a suggested model from an already-fetched list: recency
    /// (last in the list, assumed newest-first-from-API reversed here to
    /// prefer the provider's own ordering) plus the `recommended` flag plus
    /// a capability match against what the request needs (`spec.md` §4.6).
    pub fn suggested_model<'a>(
        &self,
        models: &'a [ModelInfo],
        required_capability: Option<Capability>,
    ) -> Option<&'a ModelInfo> {
        models
            .iter()
            .enumerate()
            .filter(|(_, m)| {
                required_capability
                    .map(|cap| m.capabilities.has(cap))
                    .unwrap_or(true)
            })
            .max_by_key(|(idx, m)| (m.recommended, *idx))
            .map(|(_, m)| m)
            .or_else(|| models.first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(id: &str, recommended: bool, caps: &[Capability]) -> ModelInfo {
        ModelInfo {
            id: id.to_string(),
            display_name: id.to_string(),
            recommended,
            capabilities: ProviderCapabilities {
                capabilities: caps.to_vec(),
            },
        }
    }

    #[test]
    fn suggested_model_prefers_recommended_and_matching_capability() {
        let registry = ProviderRegistry::new(vec![], vec![], vec![], HashMap::new());
        let models = vec![
            model("a", false, &[Capability::Text]),
            model("b", true, &[Capability::Text, Capability::Vision]),
        ];
        let picked = registry
            .suggested_model(&models, Some(Capability::Vision))
            .unwrap();
        assert_eq!(picked.id, "b");
    }

    #[test]
    fn suggested_model_filters_out_non_matching_capability() {
        let registry = ProviderRegistry::new(vec![], vec![], vec![], HashMap::new());
        let models = vec![model("a", true, &[Capability::Text])];
        assert!(registry
            .suggested_model(&models, Some(Capability::Vision))
            .is_none());
    }

    #[test]
    fn mark_stale_forces_cache_bypass() {
        let registry = ProviderRegistry::new(vec![], vec![], vec![], HashMap::new());
        registry
            .model_cache
            .lock_unpoisoned()
            .insert("x".to_string(), vec![model("a", false, &[])]);
        registry.mark_stale();
        assert!(registry.stale.load(Ordering::Relaxed));
    }
}
