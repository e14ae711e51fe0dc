//! Boundary adapters (`spec.md` §1, `SPEC_FULL.md` §4.6): thin, minimally
//! marshalled clients for each external provider named out of scope for a
//! full client implementation. Each satisfies one of the capability-set
//! traits in `providers::traits` so the registry can treat them
//! polymorphically alongside any future provider.

mod assemblyai_stt;
mod demucs_docker;
mod elevenlabs_voice_separation;
mod google_llm;
mod openai_stt;
mod openrouter_llm;
mod replicate_voice_separation;

pub use assemblyai_stt::AssemblyAiStt;
pub use demucs_docker::DemucsDocker;
pub use elevenlabs_voice_separation::ElevenLabsVoiceSeparation;
pub use google_llm::GoogleLlm;
pub use openai_stt::OpenAiStt;
pub use openrouter_llm::OpenRouterLlm;
pub use replicate_voice_separation::ReplicateVoiceSeparation;
