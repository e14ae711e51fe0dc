//! Directory enumeration for a bulk job's source (`spec.md` §4.1 "a job's
//! source is either a single file or a directory of files", §6
//! `GetVideosInDirectory`).

use std::path::{Path, PathBuf};

/// Extensions this deployment treats as processable media. Not exhaustive —
/// matches the container formats `spec.md`'s examples (ffmpeg/mediainfo
/// gating) actually exercise.
const MEDIA_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "mov", "avi", "webm", "m4v", "wmv", "flv", "ts", "mp3", "wav", "flac", "m4a",
    "ogg", "aac",
];

/// Lists media files directly inside `dir` (non-recursive), sorted for
/// deterministic job-item ordering.
pub fn list_media_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_media = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| MEDIA_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(ext)))
            .unwrap_or(false);
        if is_media {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_only_known_media_extensions_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.mp4"), b"x").unwrap();
        std::fs::write(dir.path().join("a.mkv"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("subdir")).unwrap();

        let files = list_media_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.mkv", "b.mp4"]);
    }
}
