//! Data model (`spec.md` §3): `Job`, `Item`, `Task`, `Bar`, `LogEntry`,
//! `Provider`, `DecodeCacheEntry`, plus the small `Statistics`/
//! `UiErrorEnvelope` supplements from `SPEC_FULL.md` §3.

mod bar;
mod job;
mod language;
mod log_entry;
mod provider;
mod task;

pub use bar::{Bar, BarState, CANONICAL_BAR_PREFIXES};
pub use job::{Feature, FeatureOptions, Item, Job, JobSource, JobStatus, StreamLayout};
pub use language::{LanguageRequirements, LanguageTag};
pub use log_entry::{LogEntry, LogLevel, SequenceCounter};
pub use provider::{Capability, ProviderCapabilities, ProviderKind, ProviderSummary};
pub use task::{Dag, Task, TaskId, TaskStatus};
