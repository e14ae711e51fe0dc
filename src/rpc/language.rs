//! *Language* RPC service (`spec.md` §6): tag validation, per-language
//! requirements, tokenisation need, and romanisation styles.

use serde::Deserialize;
use serde_json::Value;

use crate::domain::LanguageTag;

use super::error::RpcError;
use super::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidateLanguageRequest {
    tag: String,
    #[serde(default)]
    single: bool,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidateLanguageResponse {
    valid: bool,
    canonical: Option<String>,
}

/// `ValidateLanguage({tag, single})` (`spec.md` §6). `single` additionally
/// rejects a tag carrying a script or region subtag (e.g. `zh-Hans`) when
/// the caller needs a bare primary-language tag.
pub async fn validate_language(_state: &AppState, body: Value) -> Result<Value, RpcError> {
    let req: ValidateLanguageRequest =
        serde_json::from_value(body).map_err(|err| RpcError::BadRequest(err.to_string()))?;
    let canonical = LanguageTag::canonicalize(&req.tag);
    let valid = match &canonical {
        Some(tag) if req.single => tag.as_str() == tag.primary_subtag(),
        Some(_) => true,
        None => false,
    };
    Ok(serde_json::to_value(ValidateLanguageResponse {
        valid,
        canonical: canonical.filter(|_| valid).map(|t| t.as_str().to_string()),
    })
    .expect("serializable"))
}

#[derive(Deserialize)]
struct TagRequest {
    tag: String,
}

pub async fn get_language_requirements(_state: &AppState, body: Value) -> Result<Value, RpcError> {
    let req: TagRequest =
        serde_json::from_value(body).map_err(|err| RpcError::BadRequest(err.to_string()))?;
    let tag = LanguageTag::canonicalize(&req.tag)
        .ok_or_else(|| RpcError::BadRequest(format!("'{}' is not a valid language tag", req.tag)))?;
    Ok(serde_json::to_value(tag.requirements()).expect("serializable"))
}

#[derive(Deserialize)]
struct LangRequest {
    lang: String,
}

#[derive(serde::Serialize)]
struct NeedsTokenizationResponse {
    needs: bool,
}

pub async fn needs_tokenization(_state: &AppState, body: Value) -> Result<Value, RpcError> {
    let req: LangRequest =
        serde_json::from_value(body).map_err(|err| RpcError::BadRequest(err.to_string()))?;
    let tag = LanguageTag::canonicalize(&req.lang)
        .ok_or_else(|| RpcError::BadRequest(format!("'{}' is not a valid language tag", req.lang)))?;
    Ok(serde_json::to_value(NeedsTokenizationResponse {
        needs: tag.requirements().needs_tokenization,
    })
    .expect("serializable"))
}

#[derive(Deserialize)]
struct CodeRequest {
    code: String,
}

pub async fn get_romanization_styles(_state: &AppState, body: Value) -> Result<Value, RpcError> {
    let req: CodeRequest =
        serde_json::from_value(body).map_err(|err| RpcError::BadRequest(err.to_string()))?;
    let tag = LanguageTag::canonicalize(&req.code)
        .ok_or_else(|| RpcError::BadRequest(format!("'{}' is not a valid language tag", req.code)))?;
    Ok(serde_json::to_value(tag.romanization_styles()).expect("serializable"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::Broadcaster;
    use crate::config::AppSettings;
    use crate::media::IntegrityCache;
    use crate::progress::BarRegistry;
    use crate::providers::ProviderRegistry;
    use crate::throttle::{AdaptiveThrottler, ThrottleConfig};
    use std::sync::atomic::AtomicBool;
    use std::sync::{Arc, RwLock};

    fn test_state(runtime: tokio::runtime::Handle) -> AppState {
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
        AppState {
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
            dry_run: std::sync::Mutex::new(crate::rpc::state::DryRunState::default()),
        }
    }

    #[tokio::test]
    async fn validate_language_accepts_canonicalizable_tag() {
        let state = test_state(tokio::runtime::Handle::current());
        let value = validate_language(&state, serde_json::json!({"tag": "EN-us"}))
            .await
            .unwrap();
        assert_eq!(value["valid"], true);
        assert_eq!(value["canonical"], "en-US");
        state.engine.shutdown();
    }

    #[tokio::test]
    async fn validate_language_single_rejects_region_subtag() {
        let state = test_state(tokio::runtime::Handle::current());
        let value = validate_language(&state, serde_json::json!({"tag": "en-US", "single": true}))
            .await
            .unwrap();
        assert_eq!(value["valid"], false);
        state.engine.shutdown();
    }

    #[tokio::test]
    async fn needs_tokenization_is_true_for_japanese() {
        let state = test_state(tokio::runtime::Handle::current());
        let value = needs_tokenization(&state, serde_json::json!({"lang": "ja"}))
            .await
            .unwrap();
        assert_eq!(value["needs"], true);
        state.engine.shutdown();
    }

    #[tokio::test]
    async fn romanization_styles_lists_japanese_conventions() {
        let state = test_state(tokio::runtime::Handle::current());
        let value = get_romanization_styles(&state, serde_json::json!({"code": "ja"}))
            .await
            .unwrap();
        assert_eq!(value, serde_json::json!(["hepburn", "kunrei-shiki", "nihon-shiki"]));
        state.engine.shutdown();
    }
}
