//! *Dependencies* RPC service (`spec.md` §6): thin wrappers over
//! `gate::deps`'s availability probes, plus the two binary-auto-download
//! methods the host UI normally serves (out of scope per `spec.md` §1,
//! stubbed as [`RpcError::Unsupported`]).

use serde_json::Value;

use crate::gate::deps;

use super::error::RpcError;
use super::state::AppState;

#[derive(serde::Serialize)]
struct AvailabilityResponse {
    available: bool,
}

fn available(available: bool) -> Result<Value, RpcError> {
    Ok(serde_json::to_value(AvailabilityResponse { available }).expect("serializable"))
}

pub async fn check_docker_availability(_state: &AppState, _body: Value) -> Result<Value, RpcError> {
    available(deps::check_docker_availability().await)
}

pub async fn check_internet_connectivity(_state: &AppState, _body: Value) -> Result<Value, RpcError> {
    available(deps::check_internet_connectivity().await)
}

pub async fn check_ffmpeg_availability(_state: &AppState, _body: Value) -> Result<Value, RpcError> {
    available(deps::check_ffmpeg_availability().await)
}

pub async fn check_mediainfo_availability(_state: &AppState, _body: Value) -> Result<Value, RpcError> {
    available(deps::check_mediainfo_availability().await)
}

pub async fn download_ffmpeg(_state: &AppState, _body: Value) -> Result<Value, RpcError> {
    Err(RpcError::Unsupported("DownloadFFmpeg"))
}

pub async fn download_mediainfo(_state: &AppState, _body: Value) -> Result<Value, RpcError> {
    Err(RpcError::Unsupported("DownloadMediaInfo"))
}
