//! Persisted decode-integrity cache (`spec.md` §4.5, domain model's
//! `DecodeCacheEntry`).
//!
//! Grounded on the teacher's `settings::io` atomic JSON read/write,
//! reused via `config::io`. Keyed by absolute path with `(mtime, size)`
//! validation; a schema `version` allows forward-incompatible changes
//! without crashing on an old cache file (fall back to empty instead).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::config::io as config_io;
use crate::sync_ext::MutexExt;

use super::decode_integrity::IntegrityVerdict;

const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodeCacheEntry {
    pub mtime_unix_seconds: i64,
    pub size_bytes: u64,
    pub sampled_clean: Option<bool>,
    pub full_clean: Option<bool>,
}

impl DecodeCacheEntry {
    fn matches(&self, mtime_unix_seconds: i64, size_bytes: u64) -> bool {
        self.mtime_unix_seconds == mtime_unix_seconds && self.size_bytes == size_bytes
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    entries: HashMap<String, DecodeCacheEntry>,
}

impl Default for CacheFile {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            entries: HashMap::new(),
        }
    }
}

pub struct IntegrityCache {
    path: PathBuf,
    entries: Mutex<HashMap<String, DecodeCacheEntry>>,
}

impl IntegrityCache {
    pub fn load(path: PathBuf) -> Result<Self> {
        let entries = if path.exists() {
            match config_io::read_json_file::<CacheFile>(&path) {
                Ok(file) if file.version == SCHEMA_VERSION => file.entries,
                // Version mismatch or unreadable: start fresh rather than
                // failing startup over a stale cache (`spec.md` §4.5).
                _ => HashMap::new(),
            }
        } else {
            HashMap::new()
        };
        let cache = Self {
            path,
            entries: Mutex::new(entries),
        };
        cache.prune_missing_files();
        Ok(cache)
    }

    /// Drop entries for paths that no longer exist on disk, per
    /// `spec.md` §4.5 "entries for paths that no longer exist are pruned
    /// on load".
    fn prune_missing_files(&self) {
        let mut entries = self.entries.lock_unpoisoned();
        entries.retain(|path, _| Path::new(path).exists());
    }

    fn key_for(path: &Path) -> Result<(String, i64, u64)> {
        let metadata = std::fs::metadata(path)?;
        let mtime = metadata
            .modified()?
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Ok((canonical.to_string_lossy().to_string(), mtime, metadata.len()))
    }

    /// A cache hit for `full` mode also satisfies a subsequent `sampled`
    /// request on the same unchanged file, since full strictly subsumes
    /// sampled (`spec.md` §8 scenario 4).
    pub fn lookup_sampled(&self, path: &Path) -> Option<IntegrityVerdict> {
        let (key, mtime, size) = Self::key_for(path).ok()?;
        let entries = self.entries.lock_unpoisoned();
        let entry = entries.get(&key)?;
        if !entry.matches(mtime, size) {
            return None;
        }
        entry
            .full_clean
            .or(entry.sampled_clean)
            .map(verdict_from_bool)
    }

    pub fn lookup_full(&self, path: &Path) -> Option<IntegrityVerdict> {
        let (key, mtime, size) = Self::key_for(path).ok()?;
        let entries = self.entries.lock_unpoisoned();
        let entry = entries.get(&key)?;
        if !entry.matches(mtime, size) {
            return None;
        }
        entry.full_clean.map(verdict_from_bool)
    }

    pub fn record_sampled(&self, path: &Path, verdict: IntegrityVerdict) -> Result<()> {
        self.record(path, Some(verdict_to_bool(verdict)), None)
    }

    pub fn record_full(&self, path: &Path, verdict: IntegrityVerdict) -> Result<()> {
        self.record(path, None, Some(verdict_to_bool(verdict)))
    }

    fn record(&self, path: &Path, sampled: Option<bool>, full: Option<bool>) -> Result<()> {
        let (key, mtime, size) = Self::key_for(path)?;
        {
            let mut entries = self.entries.lock_unpoisoned();
            let entry = entries
                .entry(key)
                .and_modify(|e| {
                    if !e.matches(mtime, size) {
                        e.sampled_clean = None;
                        e.full_clean = None;
                    }
                    e.mtime_unix_seconds = mtime;
                    e.size_bytes = size;
                    if sampled.is_some() {
                        e.sampled_clean = sampled;
                    }
                    if full.is_some() {
                        e.full_clean = full;
                    }
                })
                .or_insert(DecodeCacheEntry {
                    mtime_unix_seconds: mtime,
                    size_bytes: size,
                    sampled_clean: sampled,
                    full_clean: full,
                });
            let _ = entry;
        }
        self.flush()
    }

    /// Explicit flush, also called at job completion per `spec.md` §4.5.
    pub fn flush(&self) -> Result<()> {
        let entries = self.entries.lock_unpoisoned().clone();
        config_io::write_json_file(
            &self.path,
            &CacheFile {
                version: SCHEMA_VERSION,
                entries,
            },
        )
    }
}

fn verdict_to_bool(verdict: IntegrityVerdict) -> bool {
    matches!(verdict, IntegrityVerdict::Clean)
}

fn verdict_from_bool(clean: bool) -> IntegrityVerdict {
    if clean {
        IntegrityVerdict::Clean
    } else {
        IntegrityVerdict::Corrupted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "data").unwrap();
        path
    }

    #[test]
    fn full_result_satisfies_a_later_sampled_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let media = touch(dir.path(), "clip.mp4");
        let cache = IntegrityCache::load(dir.path().join("cache.json")).unwrap();

        cache.record_full(&media, IntegrityVerdict::Clean).unwrap();
        assert_eq!(cache.lookup_sampled(&media), Some(IntegrityVerdict::Clean));
    }

    #[test]
    fn stale_mtime_invalidates_the_entry() {
        let dir = tempfile::tempdir().unwrap();
        let media = touch(dir.path(), "clip.mp4");
        let cache = IntegrityCache::load(dir.path().join("cache.json")).unwrap();
        cache.record_sampled(&media, IntegrityVerdict::Clean).unwrap();

        // Simulate a changed file: overwrite the stored mtime to look stale.
        {
            let mut entries = cache.entries.lock_unpoisoned();
            let key = entries.keys().next().unwrap().clone();
            entries.get_mut(&key).unwrap().mtime_unix_seconds -= 100;
        }
        assert!(cache.lookup_sampled(&media).is_none());
    }

    #[test]
    fn entries_for_deleted_files_are_pruned_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let media = touch(dir.path(), "clip.mp4");
        let cache_path = dir.path().join("cache.json");
        let cache = IntegrityCache::load(cache_path.clone()).unwrap();
        cache.record_sampled(&media, IntegrityVerdict::Clean).unwrap();
        std::fs::remove_file(&media).unwrap();

        let reloaded = IntegrityCache::load(cache_path).unwrap();
        assert!(reloaded.entries.lock_unpoisoned().is_empty());
    }

    #[test]
    fn unknown_schema_version_starts_fresh_instead_of_failing() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("cache.json");
        config_io::write_json_file(
            &cache_path,
            &CacheFile {
                version: 999,
                entries: HashMap::new(),
            },
        )
        .unwrap();
        let cache = IntegrityCache::load(cache_path).unwrap();
        assert!(cache.entries.lock_unpoisoned().is_empty());
    }
}
