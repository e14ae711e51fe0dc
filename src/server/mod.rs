//! HTTP/WebSocket server (`spec.md` §6, §9 "AMBIENT RPC transport"): a
//! single axum [`Router`] serving `POST /rpc/:method` and `GET /ws` side by
//! side, sharing one `Arc<AppState>`.
//!
//! Grounded on the teacher pack's `hi-youichi-loom` `serve::app` for the
//! router/state shape, and `adamtc007-ob-poc`'s `sem_os_server::error` for
//! the `IntoResponse` error-to-status mapping — neither of which this
//! crate's own teacher (`muyuanjin-ffui`, a Tauri app with no HTTP server
//! of its own) has an equivalent for.

use std::sync::Arc;

use axum::extract::{FromRef, Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use tracing::{info, warn};

use crate::broadcast::{ws_handler, Broadcaster};
use crate::rpc::{self, AppState, RpcError};

/// Lets the `/ws` route extract `Arc<Broadcaster>` out of the top-level
/// `Arc<AppState>` router state without `broadcast::ws_handler` needing to
/// know anything about `AppState`.
impl FromRef<Arc<AppState>> for Arc<Broadcaster> {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.broadcaster.clone()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/rpc/:method", post(rpc_handler))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

struct RpcResponse(Result<Value, RpcError>);

impl IntoResponse for RpcResponse {
    fn into_response(self) -> Response {
        match self.0 {
            Ok(value) => Json(value).into_response(),
            Err(err) => {
                let status = err.status();
                let envelope = err.envelope(uuid::Uuid::new_v4().to_string());
                (status, Json(envelope)).into_response()
            }
        }
    }
}

async fn rpc_handler(
    State(state): State<Arc<AppState>>,
    Path(method): Path<String>,
    body: Option<Json<Value>>,
) -> impl IntoResponse {
    let body = body.map(|Json(value)| value).unwrap_or(Value::Null);
    let result = rpc::dispatch(&state, &method, body).await;
    if let Err(err) = &result {
        warn!(method = %method, error = ?err, "rpc call failed");
    } else {
        info!(method = %method, "rpc call completed");
    }
    RpcResponse(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppSettings;
    use crate::media::IntegrityCache;
    use crate::progress::BarRegistry;
    use crate::providers::ProviderRegistry;
    use crate::throttle::{AdaptiveThrottler, ThrottleConfig};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::atomic::AtomicBool;
    use std::sync::RwLock;
    use tower::ServiceExt;

    fn test_app_state(runtime: tokio::runtime::Handle) -> Arc<AppState> {
        let settings = Arc::new(RwLock::new(AppSettings::default()));
        let bars = Arc::new(BarRegistry::new());
        let throttler = Arc::new(AdaptiveThrottler::new(ThrottleConfig::default()));
        let broadcaster = Arc::new(Broadcaster::new(bars.clone()));
        let providers = Arc::new(ProviderRegistry::new(vec![], vec![], vec![], Default::default()));
        let dir = tempfile::tempdir().unwrap();
        let integrity_cache = Arc::new(IntegrityCache::load(dir.path().join("cache.json")).unwrap());
        let statistics =
            Arc::new(crate::config::Statistics::load_from(dir.path().join("stats.json")).unwrap());
        let engine = crate::engine::Engine::new(
            settings.clone(),
            bars.clone(),
            throttler.clone(),
            broadcaster.clone(),
            providers.clone(),
            integrity_cache.clone(),
            runtime,
            1,
        );
        Arc::new(AppState {
            engine,
            settings,
            statistics,
            providers,
            broadcaster,
            throttler,
            integrity_cache,
            bars,
            trace_logs: AtomicBool::new(false),
            event_throttling_enabled: AtomicBool::new(true),
            listen_port: 0,
            log_sequence: crate::domain::SequenceCounter::new(),
            wasm_state: std::sync::Mutex::new(None),
            dry_run: std::sync::Mutex::new(crate::rpc::DryRunState::default()),
        })
    }

    #[tokio::test]
    async fn rpc_route_dispatches_by_method_name() {
        let state = test_app_state(tokio::runtime::Handle::current());
        let app = router(state.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/rpc/GetVersion")
                    .header("content-type", "application/json")
                    .body(Body::from("null"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        state.engine.shutdown();
    }

    #[tokio::test]
    async fn unsupported_method_returns_not_implemented() {
        let state = test_app_state(tokio::runtime::Handle::current());
        let app = router(state.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/rpc/OpenURL")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"url":"https://example.com"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        state.engine.shutdown();
    }

    #[tokio::test]
    async fn unknown_method_returns_bad_request() {
        let state = test_app_state(tokio::runtime::Handle::current());
        let app = router(state.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/rpc/NoSuchMethod")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        state.engine.shutdown();
    }
}
