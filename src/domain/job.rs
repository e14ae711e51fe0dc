use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::language::LanguageTag;

/// One feature selectable on a `Job` (`spec.md` §4.1 "per-feature contracts").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Feature {
    VoiceEnhancement,
    Dubtitles,
    Romanization,
    SelectiveKanji,
    CondensedAudio,
    CardCreation,
}

impl Feature {
    pub const ALL: [Feature; 6] = [
        Feature::VoiceEnhancement,
        Feature::Dubtitles,
        Feature::Romanization,
        Feature::SelectiveKanji,
        Feature::CondensedAudio,
        Feature::CardCreation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Feature::VoiceEnhancement => "voiceEnhancement",
            Feature::Dubtitles => "dubtitles",
            Feature::Romanization => "romanization",
            Feature::SelectiveKanji => "selectiveKanji",
            Feature::CondensedAudio => "condensedAudio",
            Feature::CardCreation => "cardCreation",
        }
    }

    pub fn from_str_key(s: &str) -> Option<Feature> {
        Feature::ALL.into_iter().find(|f| f.as_str() == s)
    }
}

/// Open-ended per-feature option map from the RPC boundary
/// (`spec.md` §9 "Dynamic JSON at the boundary"). Keyed by the wire-visible
/// feature name (serde_json map keys must be strings) rather than the
/// `Feature` enum directly; features validate their own slice of this map
/// against a typed schema at ingress, see `engine::features`.
pub type FeatureOptions = HashMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Created,
    Gating,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub source: JobSource,
    pub features: Vec<Feature>,
    pub feature_options: FeatureOptions,
    pub target_language: LanguageTag,
    pub native_languages: Vec<LanguageTag>,
    pub audio_track_index: Option<u32>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Default for JobStatus {
    fn default() -> Self {
        JobStatus::Created
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "path")]
pub enum JobSource {
    File(PathBuf),
    Directory(PathBuf),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StreamLayout {
    pub audio_streams: u32,
    pub video_streams: u32,
    pub subtitle_streams: u32,
}

/// One media file inside a job (`spec.md` §3 "Item").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub path: PathBuf,
    /// Probed duration in seconds; positive, possibly approximate per the
    /// heuristic in `media::probe`.
    pub duration_seconds: f64,
    pub stream_layout: StreamLayout,
    pub has_target_language_tag: bool,
    pub has_native_language_tag: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_defaults_to_created() {
        assert_eq!(JobStatus::default(), JobStatus::Created);
    }

    #[test]
    fn feature_round_trips_through_json_key() {
        let mut opts: FeatureOptions = HashMap::new();
        opts.insert(
            Feature::Dubtitles.as_str().to_string(),
            serde_json::json!({"model": "whisper-1"}),
        );
        let encoded = serde_json::to_string(&opts).unwrap();
        let decoded: FeatureOptions = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.len(), 1);
        assert!(decoded.contains_key("dubtitles"));
        assert_eq!(Feature::from_str_key("dubtitles"), Some(Feature::Dubtitles));
    }
}
