//! Per-item, per-feature task-DAG construction and feature-option
//! validation (`spec.md` §4.1 "per accepted job the engine builds a DAG of
//! tasks"; §9 "Dynamic JSON at the boundary"). Named to match the forward
//! reference in `domain`'s module doc comment.

use std::collections::HashMap;

use anyhow::{bail, Result};

use crate::domain::{Dag, Feature, Job, Task, TaskId, TaskStatus};

/// Declared scheduling priority per feature, used only to break ties among
/// tasks the DAG reports as simultaneously runnable (`spec.md` §4.1: "ties
/// are broken by (feature-declared priority, item creation order)").
/// Earlier pipeline stages outrank later ones so that, when two independent
/// branches are both runnable, the one feeding the most downstream work goes
/// first.
fn priority_for(feature: Feature) -> i32 {
    match feature {
        Feature::VoiceEnhancement => 100,
        Feature::Dubtitles => 90,
        Feature::Romanization => 80,
        Feature::SelectiveKanji => 80,
        Feature::CondensedAudio => 70,
        Feature::CardCreation => 60,
    }
}

/// Whether `dependent` consumes `upstream`'s output, for an item where both
/// were selected (`spec.md` §4.1 per-feature contracts).
fn depends_on(dependent: Feature, upstream: Feature) -> bool {
    use Feature::*;
    matches!(
        (dependent, upstream),
        (Dubtitles, VoiceEnhancement)
            | (Romanization, Dubtitles)
            | (SelectiveKanji, Dubtitles)
            | (CondensedAudio, VoiceEnhancement)
            | (CardCreation, Dubtitles)
            | (CardCreation, CondensedAudio)
    )
}

/// Build the task DAG for one job: one task per (item, selected feature),
/// wired with dependencies per [`depends_on`]. Features are walked in
/// `Feature::ALL`'s declaration order, which is already a topological
/// ordering of the pipeline stages, so an upstream task id always exists by
/// the time a downstream feature looks it up.
pub fn build_dag(job: &Job) -> Dag {
    let mut dag = Dag::new();
    let mut next_id = 1u64;

    for item in &job.items {
        let mut ids_by_feature: HashMap<Feature, TaskId> = HashMap::new();

        for &feature in Feature::ALL.iter().filter(|f| job.features.contains(f)) {
            let id = TaskId(next_id);
            next_id += 1;

            let mut dependencies = Vec::new();
            for (&upstream, &upstream_id) in &ids_by_feature {
                if depends_on(feature, upstream) {
                    dependencies.push(upstream_id);
                }
            }

            dag.insert(Task {
                id,
                feature,
                item_id: item.id.clone(),
                sub_range: None,
                dependencies,
                retry_count: 0,
                status: TaskStatus::Pending,
                priority: priority_for(feature),
                skippable_on_dep_failure: false,
            });
            ids_by_feature.insert(feature, id);
        }
    }

    dag
}

/// Whether any other feature selected on `job` consumes `feature`'s output
/// (`engine::intermediary`'s reference-counting input: a feature with no
/// selected dependents is always a final deliverable, never subject to the
/// intermediary-file policy, since every one of the six features is itself
/// a `spec.md` §1 deliverable — voice tracks, dubtitles, romanised scripts,
/// and so on — and only becomes "intermediary" when something downstream
/// also consumes it).
pub fn has_selected_dependent(feature: Feature, job: &Job) -> bool {
    Feature::ALL
        .iter()
        .any(|&f| job.features.contains(&f) && depends_on(f, feature))
}

/// Validate a job's `feature_options` map against the features actually
/// selected (`spec.md` §9 "Dynamic JSON at the boundary" — validated once,
/// at job-acceptance time, rather than deep inside each task).
pub fn validate_feature_options(job: &Job) -> Result<()> {
    for key in job.feature_options.keys() {
        if Feature::from_str_key(key).is_none() {
            bail!("unknown feature option key: {key}");
        }
    }

    if job.features.contains(&Feature::SelectiveKanji) {
        let has_known_kanji = job
            .feature_options
            .get(Feature::SelectiveKanji.as_str())
            .and_then(|v| v.get("knownKanji"))
            .is_some();
        if !has_known_kanji {
            bail!("selectiveKanji requires a knownKanji option payload");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::domain::{FeatureOptions, Item, JobSource, JobStatus, LanguageTag, StreamLayout};

    fn item(id: &str) -> Item {
        Item {
            id: id.to_string(),
            path: PathBuf::from(format!("/media/{id}.mp4")),
            duration_seconds: 120.0,
            stream_layout: StreamLayout::default(),
            has_target_language_tag: false,
            has_native_language_tag: false,
        }
    }

    fn job(features: Vec<Feature>, options: FeatureOptions) -> Job {
        Job {
            id: "job-1".to_string(),
            source: JobSource::File(PathBuf::from("/media/a.mp4")),
            features,
            feature_options: options,
            target_language: LanguageTag::canonicalize("ja").unwrap(),
            native_languages: vec![],
            audio_track_index: None,
            created_at: Utc::now(),
            status: JobStatus::Created,
            items: vec![item("a")],
        }
    }

    #[test]
    fn dubtitles_depends_on_voice_enhancement() {
        let job = job(
            vec![Feature::VoiceEnhancement, Feature::Dubtitles],
            FeatureOptions::new(),
        );
        let dag = build_dag(&job);
        let ids = dag.all_ids();
        assert_eq!(ids.len(), 2);
        assert_eq!(dag.runnable().len(), 1);
        let ve_id = dag
            .runnable()
            .into_iter()
            .next()
            .filter(|id| dag.get(*id).unwrap().feature == Feature::VoiceEnhancement)
            .expect("voice enhancement runnable first");
        assert!(dag.get(ve_id).unwrap().dependencies.is_empty());
    }

    #[test]
    fn dubtitles_alone_has_no_dependencies() {
        let job = job(vec![Feature::Dubtitles], FeatureOptions::new());
        let dag = build_dag(&job);
        assert_eq!(dag.runnable().len(), 1);
    }

    #[test]
    fn unknown_feature_option_key_is_rejected() {
        let mut options = FeatureOptions::new();
        options.insert("not-a-feature".to_string(), json!({}));
        let job = job(vec![Feature::Dubtitles], options);
        assert!(validate_feature_options(&job).is_err());
    }

    #[test]
    fn selective_kanji_requires_known_kanji_option() {
        let job = job(vec![Feature::SelectiveKanji], FeatureOptions::new());
        assert!(validate_feature_options(&job).is_err());

        let mut options = FeatureOptions::new();
        options.insert(
            Feature::SelectiveKanji.as_str().to_string(),
            json!({"knownKanji": ["日", "本"]}),
        );
        let job = job(vec![Feature::SelectiveKanji], options);
        assert!(validate_feature_options(&job).is_ok());
    }
}
