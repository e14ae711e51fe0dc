//! XDG-style base-directory resolution, in the style of the `config` crate's
//! `xdg_toml` module in this pack (env-var lookup with a platform
//! fallback) — kept dependency-free rather than pulling in a directories
//! crate for three lines of logic.

use std::path::PathBuf;

fn home_dir() -> Option<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        if !home.is_empty() {
            return Some(PathBuf::from(home));
        }
    }
    if cfg!(windows) {
        if let Ok(profile) = std::env::var("USERPROFILE") {
            if !profile.is_empty() {
                return Some(PathBuf::from(profile));
            }
        }
    }
    None
}

pub fn config_home() -> PathBuf {
    if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    if cfg!(windows) {
        if let Ok(dir) = std::env::var("APPDATA") {
            if !dir.is_empty() {
                return PathBuf::from(dir);
            }
        }
    }
    home_dir()
        .map(|h| h.join(".config"))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn cache_home() -> PathBuf {
    if let Ok(dir) = std::env::var("XDG_CACHE_HOME") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    if cfg!(windows) {
        if let Ok(dir) = std::env::var("LOCALAPPDATA") {
            if !dir.is_empty() {
                return PathBuf::from(dir);
            }
        }
    }
    home_dir()
        .map(|h| h.join(".cache"))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn langkit_config_dir() -> PathBuf {
    config_home().join("langkit")
}

pub fn langkit_cache_dir() -> PathBuf {
    cache_home().join("langkit")
}

pub fn settings_path() -> PathBuf {
    langkit_config_dir().join("config.yaml")
}

pub fn statistics_path() -> PathBuf {
    langkit_config_dir().join("statistics.json")
}

pub fn decode_integrity_cache_path() -> PathBuf {
    langkit_cache_dir().join("decode_integrity.json")
}

pub fn pprof_dir() -> PathBuf {
    langkit_config_dir().join("pprof")
}

pub fn tools_dir() -> PathBuf {
    langkit_config_dir().join("tools")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_dir_is_namespaced_under_langkit() {
        assert!(langkit_config_dir().ends_with("langkit"));
    }

    #[test]
    fn settings_path_uses_yaml_extension() {
        assert_eq!(
            settings_path().extension().and_then(|e| e.to_str()),
            Some("yaml")
        );
    }
}
