//! *Media* RPC service (`spec.md` §6): file/directory dialogs (host-UI,
//! out of scope per `spec.md` §1 — stubbed as [`RpcError::Unsupported`]),
//! directory listing, and language-tag inspection.

use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;

use crate::media;

use super::error::RpcError;
use super::state::AppState;

pub async fn open_video_dialog(_state: &AppState, _body: Value) -> Result<Value, RpcError> {
    Err(RpcError::Unsupported("OpenVideoDialog"))
}

pub async fn open_directory_dialog(_state: &AppState, _body: Value) -> Result<Value, RpcError> {
    Err(RpcError::Unsupported("OpenDirectoryDialog"))
}

pub async fn open_executable_dialog(_state: &AppState, _body: Value) -> Result<Value, RpcError> {
    Err(RpcError::Unsupported("OpenExecutableDialog"))
}

#[derive(Deserialize)]
struct DirRequest {
    dir: PathBuf,
}

pub async fn get_videos_in_directory(_state: &AppState, body: Value) -> Result<Value, RpcError> {
    let req: DirRequest =
        serde_json::from_value(body).map_err(|err| RpcError::BadRequest(err.to_string()))?;
    let files = media::list_media_files(&req.dir).map_err(|err| {
        RpcError::Engine(crate::error::LangkitError::LocalIo {
            path: req.dir.display().to_string(),
            message: err.to_string(),
        })
    })?;
    Ok(serde_json::to_value(files).expect("serializable"))
}

#[derive(Deserialize)]
struct PathRequest {
    path: PathBuf,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct LanguageTagsResponse {
    audio_languages: Vec<String>,
    subtitle_languages: Vec<String>,
}

pub async fn check_media_language_tags(_state: &AppState, body: Value) -> Result<Value, RpcError> {
    let req: PathRequest =
        serde_json::from_value(body).map_err(|err| RpcError::BadRequest(err.to_string()))?;
    let report = media::probe_language_tags(&req.path).await.map_err(|err| {
        RpcError::Engine(crate::error::LangkitError::LocalIo {
            path: req.path.display().to_string(),
            message: err.to_string(),
        })
    })?;
    Ok(serde_json::to_value(LanguageTagsResponse {
        audio_languages: report.audio_languages,
        subtitle_languages: report.subtitle_languages,
    })
    .expect("serializable"))
}
