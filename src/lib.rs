//! Langkit backend core: media-processing pipeline engine, progress/event
//! bus, integrity & resource gating, and provider abstraction described in
//! `SPEC_FULL.md`.

pub mod broadcast;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod exec;
pub mod gate;
pub mod media;
pub mod progress;
pub mod providers;
pub mod rpc;
pub mod server;
pub mod sync_ext;
pub mod throttle;

pub use error::{LangkitError, Severity, UiErrorEnvelope};
