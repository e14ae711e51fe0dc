//! Provider abstraction (`spec.md` §4.6): a uniform capability interface
//! over STT, LLM, and voice-separation backends, a process-wide registry,
//! and the boundary adapters named out of scope for deep marshalling by
//! `spec.md` §1 but still needed, minimally, to exercise the registry and
//! fallback logic (`SPEC_FULL.md` §4.6 supplement).

pub mod adapters;
mod registry;
pub mod traits;

pub use registry::ProviderRegistry;
pub use traits::{
    CompletionRequest, CompletionResponse, LlmProvider, ModelInfo, ProviderMeta, SttProvider,
    StreamEvent, TranscriptSegment, UsageRecord, VoiceSeparationProvider,
};
