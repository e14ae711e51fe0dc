//! Per-feature task bodies (`spec.md` §4.1 "per-feature contracts"): one
//! function per [`Feature`], each given the inputs its dependencies already
//! produced and returning the artefact path its own dependents will read.
//!
//! Every remote/subprocess call here goes through [`retry::with_retry`]
//! (transient-only, cancellation-aware) and reports progress through
//! [`Inner::bar_progress`]/[`Inner::bar_state`] on the canonical bar prefix
//! its stage maps to. STT-backed stages (dubtitles, selective kanji,
//! condensed audio, card creation) have no dedicated prefix in
//! `domain::bar::CANONICAL_BAR_PREFIXES` — `spec.md` §4.2 only names one per
//! external subprocess family (demucs/audiosep/translit) plus the two
//! gate-check prefixes — so they share the per-item `item-bar` instead of
//! inventing a new one (recorded as an Open Question resolution in
//! `DESIGN.md`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::AppSettings;
use crate::domain::{BarState, Feature, FeatureOptions, Item, LanguageTag, Task};
use crate::error::LangkitError;
use crate::exec::{self, background_command};
use crate::providers::traits::{
    CompletionRequest, LlmProvider, SttProvider, TranscriptSegment, VoiceSeparationProvider,
};

use super::retry::with_retry;
use super::romanization;
use super::state::Inner;

/// Everything a task body needs: its own item/task identity, the job-wide
/// settings and language selection, and whatever upstream artefacts its
/// dependencies produced, keyed by the producing feature (a task reads
/// straight from `item.path` for an input no selected dependency covers).
pub struct TaskContext<'a> {
    pub inner: &'a Inner,
    pub job_id: &'a str,
    pub item: &'a Item,
    pub task: &'a Task,
    pub target_language: &'a LanguageTag,
    pub native_languages: &'a [LanguageTag],
    pub feature_options: &'a FeatureOptions,
    pub settings: &'a AppSettings,
    pub dependencies: &'a HashMap<Feature, PathBuf>,
    pub cancel: &'a CancellationToken,
}

impl<'a> TaskContext<'a> {
    fn options_for(&self, feature: Feature) -> Option<&serde_json::Value> {
        self.feature_options.get(feature.as_str())
    }

    fn provider_name_override(&self, feature: Feature) -> Option<&str> {
        self.options_for(feature)?.get("provider")?.as_str()
    }

    fn dep(&self, feature: Feature) -> Option<&Path> {
        self.dependencies.get(&feature).map(PathBuf::as_path)
    }

    fn source_audio(&self) -> &Path {
        self.dep(Feature::VoiceEnhancement).unwrap_or(&self.item.path)
    }

    fn scratch_dir(&self) -> PathBuf {
        self.item
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn max_retries(&self) -> u32 {
        self.settings.queue.max_retries.max(1)
    }
}

fn item_bar_id(job_id: &str, item_id: &str) -> String {
    format!("item-bar-{job_id}-{item_id}")
}

/// `VoiceEnhancement`: run the configured (or best-available) voice
/// separation provider over the item's own audio (`spec.md` §1 "enhanced
/// voice tracks").
pub async fn run_voice_enhancement(ctx: &TaskContext<'_>) -> Result<PathBuf, LangkitError> {
    let provider = select_voice_separation_provider(ctx)?;
    let bar_prefix = if provider.name() == "demucs" {
        "demucs-process"
    } else {
        "audiosep-process"
    };
    let bar_id = format!("{bar_prefix}-{}-{}", ctx.job_id, ctx.item.id);
    ctx.inner.bar_register(bar_id.clone(), 100);

    if provider.needs_docker() {
        let dl_prefix = if provider.name() == "demucs" {
            "demucs-docker-dl"
        } else {
            "audiosep-docker-dl"
        };
        let dl_bar_id = format!("{dl_prefix}-{}", ctx.job_id);
        ctx.inner.bar_register(dl_bar_id.clone(), 1);
        provider.download_docker().await.map_err(|err| {
            ctx.inner.bar_state(&dl_bar_id, BarState::ErroredTask);
            err
        })?;
        ctx.inner.bar_state(&dl_bar_id, BarState::Completed);
    }

    let api_key = ctx.settings.effective_api_key(provider.name());
    ctx.inner.bar_progress(&bar_id, 10);

    let audio_path = ctx.item.path.clone();
    let max_retries = ctx.max_retries();
    let result = with_retry(ctx.cancel, max_retries, ctx.settings_separation_cap(), || {
        let provider = provider.clone();
        let audio_path = audio_path.clone();
        let api_key = api_key.clone();
        async move { provider.separate(&audio_path, api_key.as_deref()).await }
    })
    .await;

    match result {
        Ok(path) => {
            ctx.inner.bar_progress(&bar_id, 100);
            ctx.inner.bar_state(&bar_id, BarState::Completed);
            Ok(path)
        }
        Err(err) => {
            ctx.inner.bar_state(
                &bar_id,
                if matches!(err, LangkitError::UserCancel) {
                    BarState::Cancelled
                } else {
                    BarState::ErroredTask
                },
            );
            Err(err)
        }
    }
}

impl<'a> TaskContext<'a> {
    fn settings_separation_cap(&self) -> Duration {
        Duration::from_secs(self.settings.timeouts.separation_seconds)
    }

    fn settings_stt_cap(&self) -> Duration {
        Duration::from_secs(self.settings.timeouts.stt_seconds)
    }
}

fn select_voice_separation_provider(
    ctx: &TaskContext<'_>,
) -> Result<std::sync::Arc<dyn VoiceSeparationProvider>, LangkitError> {
    let providers = ctx.inner.providers.voice_separation_providers();
    let chosen = if let Some(name) = ctx.provider_name_override(Feature::VoiceEnhancement) {
        providers.iter().find(|p| p.name() == name)
    } else {
        providers.first()
    };
    chosen.cloned().ok_or_else(|| LangkitError::Internal(
        "no voice separation provider registered".to_string(),
    ))
}

fn select_stt_provider(ctx: &TaskContext<'_>) -> Result<std::sync::Arc<dyn SttProvider>, LangkitError> {
    let providers = ctx.inner.providers.stt_providers();
    let chosen = if let Some(name) = ctx.provider_name_override(Feature::Dubtitles) {
        providers.iter().find(|p| p.name() == name)
    } else {
        providers.first()
    };
    chosen
        .cloned()
        .ok_or_else(|| LangkitError::Internal("no STT provider registered".to_string()))
}

fn select_llm_provider(
    ctx: &TaskContext<'_>,
    feature: Feature,
) -> Result<std::sync::Arc<dyn LlmProvider>, LangkitError> {
    let providers = ctx.inner.providers.llm_providers();
    let chosen = if let Some(name) = ctx.provider_name_override(feature) {
        providers.iter().find(|p| p.name() == name)
    } else {
        providers.first()
    };
    chosen
        .cloned()
        .ok_or_else(|| LangkitError::Internal("no LLM provider registered".to_string()))
}

/// `Dubtitles`: transcribe the voice-enhanced (or raw) audio into
/// speech-recognised subtitles (`spec.md` §1 "speech-recognized dubtitles").
pub async fn run_dubtitles(ctx: &TaskContext<'_>) -> Result<PathBuf, LangkitError> {
    let provider = select_stt_provider(ctx)?;
    let bar_id = item_bar_id(ctx.job_id, &ctx.item.id);
    ctx.inner.bar_register(bar_id.clone(), 100);
    ctx.inner.bar_progress(&bar_id, 10);

    let api_key = ctx
        .settings
        .effective_api_key(provider.name())
        .ok_or_else(|| LangkitError::PermanentRemote {
            provider: provider.name().to_string(),
            message: "no API key configured".to_string(),
        })?;

    let audio_path = ctx.source_audio().to_path_buf();
    let model = ctx
        .options_for(Feature::Dubtitles)
        .and_then(|v| v.get("model"))
        .and_then(|v| v.as_str())
        .unwrap_or("default")
        .to_string();
    let language = ctx.target_language.as_str().to_string();
    let max_retries = ctx.max_retries();

    let segments = with_retry(ctx.cancel, max_retries, ctx.settings_stt_cap(), || {
        let provider = provider.clone();
        let audio_path = audio_path.clone();
        let api_key = api_key.clone();
        let model = model.clone();
        let language = language.clone();
        async move {
            provider
                .transcribe(&audio_path, &model, Some(&language), &api_key)
                .await
        }
    })
    .await
    .map_err(|err| {
        ctx.inner.bar_state(&bar_id, BarState::ErroredTask);
        err
    })?;

    let out_path = ctx.scratch_dir().join(format!("{}.dubtitles.srt", ctx.item.id));
    write_srt(&out_path, &segments)
        .await
        .map_err(|err| mark_io_error(ctx, &bar_id, &out_path, err))?;

    ctx.inner.bar_progress(&bar_id, 100);
    ctx.inner.bar_state(&bar_id, BarState::Completed);
    Ok(out_path)
}

/// `Romanization`: transliterate the dubtitles into the learner's preferred
/// script (`spec.md` §1 "romanized scripts"), docker-hosted for languages
/// `LanguageRequirements::needs_docker_romanization` names and rule-based
/// otherwise.
pub async fn run_romanization(ctx: &TaskContext<'_>) -> Result<PathBuf, LangkitError> {
    let subtitle_path = ctx
        .dep(Feature::Dubtitles)
        .ok_or_else(|| LangkitError::Internal("romanization has no dubtitles input".to_string()))?;

    let requirements = ctx.target_language.requirements();
    let bar_id = format!("translit-process-{}-{}", ctx.job_id, ctx.item.id);
    ctx.inner.bar_register(bar_id.clone(), 100);
    ctx.inner.bar_progress(&bar_id, 10);

    if requirements.needs_docker_romanization {
        let init_bar = format!("translit-init-{}", ctx.job_id);
        ctx.inner.bar_register(init_bar.clone(), 1);
        romanization::ensure_docker_image(ctx.cancel).await.map_err(|err| {
            ctx.inner.bar_state(&init_bar, BarState::ErroredTask);
            ctx.inner.bar_state(&bar_id, BarState::ErroredTask);
            err
        })?;
        ctx.inner.bar_state(&init_bar, BarState::Completed);

        let out_path = romanization::romanize_via_docker(
            subtitle_path,
            ctx.target_language.as_str(),
            ctx.cancel,
        )
        .await
        .map_err(|err| {
            ctx.inner.bar_state(&bar_id, BarState::ErroredTask);
            err
        })?;
        ctx.inner.bar_progress(&bar_id, 100);
        ctx.inner.bar_state(&bar_id, BarState::Completed);
        return Ok(out_path);
    }

    let cues = read_srt(subtitle_path)
        .await
        .map_err(|err| mark_io_error(ctx, &bar_id, subtitle_path, err))?;
    let romanized: Vec<TranscriptSegment> = cues
        .into_iter()
        .map(|cue| TranscriptSegment {
            start_ms: cue.start_ms,
            end_ms: cue.end_ms,
            text: romanization::romanize_rule_based(&cue.text),
        })
        .collect();
    let out_path = subtitle_path.with_extension("romanized.srt");
    write_srt(&out_path, &romanized)
        .await
        .map_err(|err| mark_io_error(ctx, &bar_id, &out_path, err))?;

    ctx.inner.bar_progress(&bar_id, 100);
    ctx.inner.bar_state(&bar_id, BarState::Completed);
    Ok(out_path)
}

/// `SelectiveKanji`: re-render the dubtitles so that only kanji the learner
/// has already marked as known remain in the text; every other kanji is
/// replaced by a placeholder standing in for its phonetic reading (`spec.md`
/// glossary "Selective kanji": "unknown ones are replaced with their
/// phonetic equivalent"). `SPEC_FULL.md` scopes provider/script marshalling
/// as "contract specified, not deep", and no kanji-reading dictionary is in
/// scope here, so the placeholder is a fixed kana-style glyph rather than an
/// actual looked-up reading — but it still removes the unknown kanji from
/// the output, which flagging it in place would not.
pub async fn run_selective_kanji(ctx: &TaskContext<'_>) -> Result<PathBuf, LangkitError> {
    let subtitle_path = ctx.dep(Feature::Dubtitles).ok_or_else(|| {
        LangkitError::Internal("selective kanji has no dubtitles input".to_string())
    })?;
    let bar_id = item_bar_id(ctx.job_id, &ctx.item.id);
    ctx.inner.bar_register(bar_id.clone(), 100);
    ctx.inner.bar_progress(&bar_id, 10);

    let known: std::collections::HashSet<char> = ctx
        .options_for(Feature::SelectiveKanji)
        .and_then(|v| v.get("knownKanji"))
        .and_then(|v| v.as_array())
        .into_iter()
        .flatten()
        .filter_map(|v| v.as_str())
        .filter_map(|s| s.chars().next())
        .collect();

    let cues = read_srt(subtitle_path)
        .await
        .map_err(|err| mark_io_error(ctx, &bar_id, subtitle_path, err))?;
    let flagged: Vec<TranscriptSegment> = cues
        .into_iter()
        .map(|cue| TranscriptSegment {
            start_ms: cue.start_ms,
            end_ms: cue.end_ms,
            text: flag_unknown_kanji(&cue.text, &known),
        })
        .collect();

    let out_path = subtitle_path.with_extension("selective-kanji.srt");
    write_srt(&out_path, &flagged)
        .await
        .map_err(|err| mark_io_error(ctx, &bar_id, &out_path, err))?;

    ctx.inner.bar_progress(&bar_id, 100);
    ctx.inner.bar_state(&bar_id, BarState::Completed);
    Ok(out_path)
}

fn is_kanji(c: char) -> bool {
    matches!(c as u32, 0x4E00..=0x9FFF | 0x3400..=0x4DBF)
}

/// Placeholder standing in for an unknown kanji's phonetic reading. No
/// reading dictionary is available, so every unknown kanji maps to the same
/// glyph rather than its actual reading; what matters is that it leaves the
/// learner's known-kanji set intact in the output.
const UNKNOWN_READING_PLACEHOLDER: char = '\u{3007}'; // 〇

fn flag_unknown_kanji(text: &str, known: &std::collections::HashSet<char>) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if is_kanji(c) && !known.contains(&c) {
            out.push(UNKNOWN_READING_PLACEHOLDER);
        } else {
            out.push(c);
        }
    }
    out
}

/// `CondensedAudio`: strip silence from the voice-enhanced track, producing
/// a shorter listen-only study track (`spec.md` §1 "condensed audio").
pub async fn run_condensed_audio(ctx: &TaskContext<'_>) -> Result<PathBuf, LangkitError> {
    let bar_id = item_bar_id(ctx.job_id, &ctx.item.id);
    ctx.inner.bar_register(bar_id.clone(), 100);
    ctx.inner.bar_progress(&bar_id, 10);

    let source = ctx.source_audio().to_path_buf();
    let out_path = ctx.scratch_dir().join(format!("{}.condensed.m4a", ctx.item.id));

    let mut cmd = background_command("ffmpeg");
    cmd.args(["-y", "-i"])
        .arg(&source)
        .args([
            "-af",
            "silenceremove=stop_periods=-1:stop_duration=0.5:stop_threshold=-35dB",
        ])
        .arg(&out_path);

    let output = exec::run_cancellable(cmd, ctx.cancel.clone(), exec::DEFAULT_DRAIN)
        .await
        .map_err(|err| {
            ctx.inner.bar_state(&bar_id, BarState::ErroredTask);
            LangkitError::Subprocess {
                program: "ffmpeg".to_string(),
                message: err.to_string(),
            }
        })?;

    if output.cancelled {
        ctx.inner.bar_state(&bar_id, BarState::Cancelled);
        return Err(LangkitError::UserCancel);
    }
    if !output.status.success() {
        ctx.inner.bar_state(&bar_id, BarState::ErroredTask);
        return Err(LangkitError::Subprocess {
            program: "ffmpeg".to_string(),
            message: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    ctx.inner.bar_progress(&bar_id, 100);
    ctx.inner.bar_state(&bar_id, BarState::Completed);
    Ok(out_path)
}

/// `CardCreation`: cut one audio clip per dubtitles cue out of the condensed
/// track and write an Anki-importable "Basic" deck pairing cue text with its
/// clip (`spec.md` §1 "Anki flashcard decks"). An LLM gloss is attached as a
/// third field when an LLM provider is configured; its absence is not fatal,
/// since `spec.md` only requires the card, not the gloss.
pub async fn run_card_creation(ctx: &TaskContext<'_>) -> Result<PathBuf, LangkitError> {
    let dubtitles_path = ctx
        .dep(Feature::Dubtitles)
        .ok_or_else(|| LangkitError::Internal("card creation has no dubtitles input".to_string()))?;
    let condensed_path = ctx.dep(Feature::CondensedAudio).ok_or_else(|| {
        LangkitError::Internal("card creation has no condensed audio input".to_string())
    })?;
    let bar_id = item_bar_id(ctx.job_id, &ctx.item.id);
    ctx.inner.bar_register(bar_id.clone(), 100);
    ctx.inner.bar_progress(&bar_id, 5);

    let cues = read_srt(dubtitles_path)
        .await
        .map_err(|err| mark_io_error(ctx, &bar_id, dubtitles_path, err))?;

    let deck_dir = ctx.scratch_dir().join(format!("{}-cards", ctx.item.id));
    tokio::fs::create_dir_all(&deck_dir)
        .await
        .map_err(|err| mark_io_error(ctx, &bar_id, &deck_dir, err))?;

    let llm = select_llm_provider(ctx, Feature::CardCreation).ok();
    let llm_api_key = llm
        .as_ref()
        .and_then(|p| ctx.settings.effective_api_key(p.name()));

    let mut rows = Vec::with_capacity(cues.len());
    let total = cues.len().max(1);
    for (idx, cue) in cues.iter().enumerate() {
        let clip_name = format!("{}-{idx:04}.m4a", ctx.item.id);
        let clip_path = deck_dir.join(&clip_name);
        extract_clip(condensed_path, &clip_path, cue.start_ms, cue.end_ms, ctx.cancel)
            .await
            .map_err(|err| {
                ctx.inner.bar_state(&bar_id, BarState::ErroredTask);
                err
            })?;

        let gloss = if let (Some(llm), Some(api_key)) = (&llm, &llm_api_key) {
            gloss_for(llm.as_ref(), api_key, &cue.text, ctx).await.ok()
        } else {
            None
        };

        rows.push(format!(
            "{}\t[sound:{}]\t{}",
            cue.text.replace('\t', " "),
            clip_name,
            gloss.unwrap_or_default()
        ));
        ctx.inner
            .bar_progress(&bar_id, (5 + (idx + 1) * 90 / total) as u64);
    }

    let deck_path = deck_dir.join("deck.tsv");
    tokio::fs::write(&deck_path, rows.join("\n"))
        .await
        .map_err(|err| mark_io_error(ctx, &bar_id, &deck_path, err))?;

    ctx.inner.bar_progress(&bar_id, 100);
    ctx.inner.bar_state(&bar_id, BarState::Completed);
    Ok(deck_path)
}

async fn gloss_for(
    llm: &dyn LlmProvider,
    api_key: &str,
    text: &str,
    ctx: &TaskContext<'_>,
) -> Result<String, LangkitError> {
    let request = CompletionRequest {
        model: "default".to_string(),
        prompt: format!(
            "Give a short, one-line gloss in English for this {} sentence: {}",
            ctx.target_language.as_str(),
            text
        ),
        initial_prompt: None,
        stream: false,
        context: serde_json::Value::Null,
    };
    let max_retries = ctx.max_retries();
    with_retry(ctx.cancel, max_retries, Duration::from_secs(30), || {
        let request = request.clone();
        async move { llm.complete(request, api_key).await }
    })
    .await
    .map(|resp| resp.text)
}

async fn extract_clip(
    source: &Path,
    out_path: &Path,
    start_ms: u64,
    end_ms: u64,
    cancel: &CancellationToken,
) -> Result<(), LangkitError> {
    let mut cmd = background_command("ffmpeg");
    cmd.args(["-y", "-ss", &format_seconds(start_ms), "-to", &format_seconds(end_ms), "-i"])
        .arg(source)
        .args(["-c:a", "aac"])
        .arg(out_path);

    let output = exec::run_cancellable(cmd, cancel.clone(), exec::DEFAULT_DRAIN)
        .await
        .map_err(|err| LangkitError::Subprocess {
            program: "ffmpeg".to_string(),
            message: err.to_string(),
        })?;

    if output.cancelled {
        return Err(LangkitError::UserCancel);
    }
    if !output.status.success() {
        return Err(LangkitError::Subprocess {
            program: "ffmpeg".to_string(),
            message: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }
    Ok(())
}

fn format_seconds(ms: u64) -> String {
    format!("{:.3}", ms as f64 / 1000.0)
}

fn mark_io_error(
    ctx: &TaskContext<'_>,
    bar_id: &str,
    path: &Path,
    err: std::io::Error,
) -> LangkitError {
    ctx.inner.bar_state(bar_id, BarState::ErroredTask);
    LangkitError::LocalIo {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

/// Writes transcript-shaped segments out as a minimal SRT file. Shared by
/// every stage that produces or re-renders subtitle cues.
async fn write_srt(path: &Path, segments: &[TranscriptSegment]) -> std::io::Result<()> {
    let mut buf = String::new();
    for (idx, seg) in segments.iter().enumerate() {
        buf.push_str(&format!("{}\n", idx + 1));
        buf.push_str(&format!(
            "{} --> {}\n",
            format_srt_time(seg.start_ms),
            format_srt_time(seg.end_ms)
        ));
        buf.push_str(&seg.text);
        buf.push_str("\n\n");
    }
    tokio::fs::write(path, buf).await
}

/// Parses the minimal SRT shape [`write_srt`] produces back into cues. Not a
/// general-purpose SRT parser: blank-line-delimited blocks of
/// index/timecode/text, the only shape this crate ever writes.
async fn read_srt(path: &Path) -> std::io::Result<Vec<TranscriptSegment>> {
    let contents = tokio::fs::read_to_string(path).await?;
    let mut out = Vec::new();
    for block in contents.split("\n\n") {
        let mut lines = block.lines();
        let Some(_index) = lines.next() else { continue };
        let Some(timecode) = lines.next() else { continue };
        let Some((start, end)) = timecode.split_once(" --> ") else { continue };
        let (Some(start_ms), Some(end_ms)) = (parse_srt_time(start), parse_srt_time(end)) else {
            continue;
        };
        let text: Vec<&str> = lines.collect();
        out.push(TranscriptSegment {
            start_ms,
            end_ms,
            text: text.join("\n"),
        });
    }
    Ok(out)
}

fn format_srt_time(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let millis = ms % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}

fn parse_srt_time(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    let (hms, millis) = raw.split_once(',')?;
    let mut parts = hms.split(':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: u64 = parts.next()?.parse().ok()?;
    let millis: u64 = millis.parse().ok()?;
    Some(hours * 3_600_000 + minutes * 60_000 + seconds * 1000 + millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srt_time_round_trips() {
        let ms = 3_725_406;
        let formatted = format_srt_time(ms);
        assert_eq!(formatted, "01:02:05,406");
        assert_eq!(parse_srt_time(&formatted), Some(ms));
    }

    #[tokio::test]
    async fn srt_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cues.srt");
        let segments = vec![
            TranscriptSegment {
                start_ms: 0,
                end_ms: 1500,
                text: "hello".to_string(),
            },
            TranscriptSegment {
                start_ms: 1600,
                end_ms: 3000,
                text: "world".to_string(),
            },
        ];
        write_srt(&path, &segments).await.unwrap();
        let read_back = read_srt(&path).await.unwrap();
        assert_eq!(read_back.len(), 2);
        assert_eq!(read_back[0].text, "hello");
        assert_eq!(read_back[1].start_ms, 1600);
    }

    #[test]
    fn replaces_unknown_kanji_with_placeholder() {
        let known: std::collections::HashSet<char> = ['日'].into_iter().collect();
        let flagged = flag_unknown_kanji("日本語", &known);
        assert_eq!(flagged, "日〇〇");
        assert!(!flagged.chars().any(|c| c == '本' || c == '語'));
    }

    #[test]
    fn flag_leaves_kana_and_latin_untouched() {
        let known = std::collections::HashSet::new();
        let flagged = flag_unknown_kanji("ひらがな abc", &known);
        assert_eq!(flagged, "ひらがな abc");
    }
}
