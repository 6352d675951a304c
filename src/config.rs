//! Configuration resolution.
//!
//! Precedence, highest first: explicit `-D`/`-L` flag values, then the
//! `WWW_PROFILE_DIR` / `WWW_DEFAULT_TTL` environment variables, then the
//! system TOML config, then built-in defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const DEFAULT_TTL: Duration = Duration::from_secs(14 * 24 * 60 * 60);

const SYSTEM_CONFIG_PATHS: &[&str] = &[
    "/opt/homebrew/etc/www/config.toml",
    "/usr/local/etc/www/config.toml",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub profile_dir: PathBuf,
    pub default_ttl: Duration,
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    profile_dir: Option<String>,
    default_ttl: Option<String>,
}

pub fn load(
    profile_dir_override: Option<&Path>,
    default_ttl_override: Option<&str>,
) -> Result<Config> {
    let mut cfg = Config {
        profile_dir: default_profile_dir(),
        default_ttl: DEFAULT_TTL,
    };

    for path in SYSTEM_CONFIG_PATHS {
        if Path::new(path).exists() {
            apply_config_file(&mut cfg, Path::new(path))?;
            break;
        }
    }

    if let Ok(v) = std::env::var("WWW_PROFILE_DIR") {
        if !v.trim().is_empty() {
            cfg.profile_dir = PathBuf::from(v.trim());
        }
    }
    if let Ok(v) = std::env::var("WWW_DEFAULT_TTL") {
        if let Ok(d) = humantime::parse_duration(v.trim()) {
            cfg.default_ttl = d;
        }
    }

    if let Some(ttl) = default_ttl_override {
        if let Ok(d) = humantime::parse_duration(ttl.trim()) {
            cfg.default_ttl = d;
        }
    }
    if let Some(dir) = profile_dir_override {
        cfg.profile_dir = dir.to_path_buf();
    }

    debug!(
        "resolved config: profile_dir={} default_ttl={:?}",
        cfg.profile_dir.display(),
        cfg.default_ttl
    );
    Ok(cfg)
}

fn apply_config_file(cfg: &mut Config, path: &Path) -> Result<()> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("read config file {}", path.display()))?;
    let raw: RawConfig = toml::from_str(&text)
        .with_context(|| format!("parse config file {}", path.display()))?;
    if let Some(dir) = raw.profile_dir {
        if !dir.trim().is_empty() {
            cfg.profile_dir = PathBuf::from(dir);
        }
    }
    if let Some(ttl) = raw.default_ttl {
        if let Ok(d) = humantime::parse_duration(ttl.trim()) {
            cfg.default_ttl = d;
        }
    }
    Ok(())
}

fn default_profile_dir() -> PathBuf {
    if is_writable_dir(Path::new("/opt/homebrew/var")) {
        return PathBuf::from("/opt/homebrew/var/www");
    }
    if is_writable_dir(Path::new("/usr/local/var")) {
        return PathBuf::from("/usr/local/var/www");
    }
    user_default_dir()
}

fn user_default_dir() -> PathBuf {
    if cfg!(target_os = "macos") {
        if let Some(home) = dirs::home_dir() {
            return home.join("Library").join("Application Support").join("www");
        }
    }
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        if !xdg.trim().is_empty() {
            return PathBuf::from(xdg.trim()).join("www");
        }
    }
    dirs::home_dir()
        .map(|home| home.join(".local").join("share").join("www"))
        .unwrap_or_else(|| std::env::temp_dir().join("www"))
}

fn is_writable_dir(path: &Path) -> bool {
    if fs::create_dir_all(path).is_err() {
        return false;
    }
    let probe = path.join(".www-writetest");
    if fs::write(&probe, b"ok").is_err() {
        return false;
    }
    let _ = fs::remove_file(&probe);
    true
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
