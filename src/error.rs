//! Error taxonomy (`spec.md` §7) and the user-visible error envelope.
//!
//! Internal fallible code paths still return `anyhow::Result` the way the
//! teacher crate does; `LangkitError` exists at the boundaries (task
//! failures, gate failures, RPC responses) where callers need a stable kind
//! rather than a formatted string.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl Severity {
    /// Auto-dismiss timeout in seconds; critical errors never auto-dismiss.
    pub fn auto_dismiss_seconds(self) -> Option<u64> {
        match self {
            Severity::Critical => None,
            Severity::Warning => Some(10),
            Severity::Info => Some(5),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LangkitError {
    #[error("precondition checks failed: {0:?}")]
    Gate(Vec<GateFailure>),

    #[error("transient error from {provider}: {message}")]
    TransientRemote { provider: String, message: String },

    #[error("permanent error from {provider}: {message}")]
    PermanentRemote { provider: String, message: String },

    #[error("subprocess {program} failed: {message}")]
    Subprocess { program: String, message: String },

    #[error("local I/O error on {path}: {message}")]
    LocalIo { path: String, message: String },

    #[error("operation cancelled by user")]
    UserCancel,

    #[error("a job is already processing")]
    Busy,

    #[error("internal invariant violated: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateFailure {
    pub check: String,
    pub reason: String,
}

impl LangkitError {
    pub fn severity(&self) -> Severity {
        match self {
            LangkitError::Gate(_) | LangkitError::Internal(_) => Severity::Critical,
            LangkitError::PermanentRemote { .. } | LangkitError::Subprocess { .. } => {
                Severity::Critical
            }
            LangkitError::TransientRemote { .. } => Severity::Warning,
            LangkitError::LocalIo { .. } => Severity::Warning,
            LangkitError::UserCancel | LangkitError::Busy => Severity::Info,
        }
    }

    pub fn docs_url(&self) -> Option<&'static str> {
        match self {
            LangkitError::Gate(_) => Some("https://docs.langkit.local/errors/gate"),
            LangkitError::PermanentRemote { .. } => {
                Some("https://docs.langkit.local/errors/provider-auth")
            }
            _ => None,
        }
    }

    /// Whether the error is eligible for the retry-with-backoff loop
    /// described in `spec.md` §4.1. Only transient remote errors are
    /// retried; everything else fails the owning task immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LangkitError::TransientRemote { .. })
    }
}

/// Wire shape for §7's "every error carries an id, human-readable message,
/// severity, and optional docs URL".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiErrorEnvelope {
    pub id: String,
    pub message: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_dismiss_seconds: Option<u64>,
}

impl UiErrorEnvelope {
    pub fn from_error(id: impl Into<String>, err: &LangkitError) -> Self {
        let severity = err.severity();
        Self {
            id: id.into(),
            message: err.to_string(),
            severity,
            docs_url: err.docs_url().map(str::to_string),
            auto_dismiss_seconds: severity.auto_dismiss_seconds(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_remote_is_retryable_others_are_not() {
        let transient = LangkitError::TransientRemote {
            provider: "openai".into(),
            message: "503".into(),
        };
        assert!(transient.is_retryable());

        let permanent = LangkitError::PermanentRemote {
            provider: "openai".into(),
            message: "401".into(),
        };
        assert!(!permanent.is_retryable());
    }

    #[test]
    fn critical_errors_never_auto_dismiss() {
        let err = LangkitError::Internal("bad state".into());
        let envelope = UiErrorEnvelope::from_error("e1", &err);
        assert_eq!(envelope.severity, Severity::Critical);
        assert_eq!(envelope.auto_dismiss_seconds, None);
    }

    #[test]
    fn warnings_auto_dismiss_after_ten_seconds() {
        let err = LangkitError::LocalIo {
            path: "/tmp/x".into(),
            message: "disk full".into(),
        };
        let envelope = UiErrorEnvelope::from_error("e2", &err);
        assert_eq!(envelope.auto_dismiss_seconds, Some(10));
    }
}
