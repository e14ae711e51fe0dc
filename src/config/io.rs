//! Atomic read/write helpers for JSON and YAML config files.
//!
//! Grounded on the teacher's `settings/io.rs` (`read_json_file`/
//! `write_json_file`: write-to-temp-then-rename for durability,
//! `anyhow::Context` on every fallible step). YAML support is added because
//! `spec.md` §6 names `config.yaml` explicitly as the settings file — the
//! `serde_yaml` crate is already part of this pack's ecosystem (the
//! `hi-youichi-loom` `serve` crate depends on it for the same purpose).

use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub fn read_json_file<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let file = fs::File::open(path)
        .with_context(|| format!("failed to open config file {}", path.display()))?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .with_context(|| format!("failed to parse JSON from {}", path.display()))
}

pub fn write_json_file<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let tmp_path = path.with_extension("tmp");
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    let file = fs::File::create(&tmp_path)
        .with_context(|| format!("failed to create temp file {}", tmp_path.display()))?;
    serde_json::to_writer_pretty(&file, value)
        .with_context(|| format!("failed to write JSON to {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| {
        format!(
            "failed to atomically rename {} -> {}",
            tmp_path.display(),
            path.display()
        )
    })?;
    Ok(())
}

pub fn read_yaml_file<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let file = File::open(path)
        .with_context(|| format!("failed to open config file {}", path.display()))?;
    serde_yaml::from_reader(file)
        .with_context(|| format!("failed to parse YAML from {}", path.display()))
}

pub fn write_yaml_file<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let tmp_path = path.with_extension("tmp");
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    let file = fs::File::create(&tmp_path)
        .with_context(|| format!("failed to create temp file {}", tmp_path.display()))?;
    serde_yaml::to_writer(&file, value)
        .with_context(|| format!("failed to write YAML to {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| {
        format!(
            "failed to atomically rename {} -> {}",
            tmp_path.display(),
            path.display()
        )
    })?;
    Ok(())
}
