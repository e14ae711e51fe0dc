//! RPC-layer error type (`spec.md` §6, §7): wraps the engine's
//! [`LangkitError`] taxonomy plus the two failure modes that only exist at
//! the wire boundary — a malformed request body, and a method the
//! out-of-scope host UI would normally serve (dialogs, URL opening,
//! binary auto-download, changelog parsing — all named out of scope by
//! `spec.md` §1).

use crate::error::{LangkitError, Severity, UiErrorEnvelope};

#[derive(Debug)]
pub enum RpcError {
    Engine(LangkitError),
    /// The request body didn't deserialize into the handler's expected
    /// shape.
    BadRequest(String),
    /// A method on the RPC surface (`spec.md` §6) that exists only to
    /// drive an out-of-scope host collaborator (file dialogs, the system
    /// browser, binary download, update checks). Not an application
    /// error — surfaced as `info` so the front-end can route it silently.
    Unsupported(&'static str),
}

impl From<LangkitError> for RpcError {
    fn from(err: LangkitError) -> Self {
        RpcError::Engine(err)
    }
}

impl RpcError {
    pub fn envelope(&self, id: impl Into<String>) -> UiErrorEnvelope {
        match self {
            RpcError::Engine(err) => UiErrorEnvelope::from_error(id, err),
            RpcError::BadRequest(message) => UiErrorEnvelope {
                id: id.into(),
                message: message.clone(),
                severity: Severity::Warning,
                docs_url: None,
                auto_dismiss_seconds: Severity::Warning.auto_dismiss_seconds(),
            },
            RpcError::Unsupported(method) => UiErrorEnvelope {
                id: id.into(),
                message: format!(
                    "'{method}' is served by the host UI layer, not this backend"
                ),
                severity: Severity::Info,
                docs_url: None,
                auto_dismiss_seconds: Severity::Info.auto_dismiss_seconds(),
            },
        }
    }

    /// Maps onto an HTTP status the way a careful axum handler would,
    /// grounded on the pack's `sem_os_server::error::AppError` status
    /// mapping — distinct statuses for distinct failure kinds rather than
    /// flattening everything to 500, while the JSON body always carries
    /// the full [`UiErrorEnvelope`] regardless of status.
    pub fn status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            RpcError::Engine(LangkitError::Busy) => StatusCode::CONFLICT,
            RpcError::Engine(LangkitError::Gate(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            RpcError::Engine(LangkitError::UserCancel) => StatusCode::OK,
            RpcError::Engine(LangkitError::PermanentRemote { .. }) => StatusCode::BAD_GATEWAY,
            RpcError::Engine(LangkitError::TransientRemote { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            RpcError::Engine(LangkitError::Subprocess { .. }) => StatusCode::BAD_GATEWAY,
            RpcError::Engine(LangkitError::LocalIo { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            RpcError::Engine(LangkitError::Internal(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            RpcError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RpcError::Unsupported(_) => StatusCode::NOT_IMPLEMENTED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_maps_to_conflict() {
        let err = RpcError::Engine(LangkitError::Busy);
        assert_eq!(err.status(), axum::http::StatusCode::CONFLICT);
    }

    #[test]
    fn unsupported_is_an_info_severity_envelope() {
        let err = RpcError::Unsupported("OpenVideoDialog");
        let envelope = err.envelope("req-1");
        assert_eq!(envelope.severity, crate::error::Severity::Info);
        assert_eq!(err.status(), axum::http::StatusCode::NOT_IMPLEMENTED);
    }
}
