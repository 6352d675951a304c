//! On-disk profile store.
//!
//! Each profile is a directory under the store root holding
//! `profile.json` (metadata), `storage.json` (browser storage state) and,
//! while a daemon is up, `daemon.json` + `daemon.sock`.

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Per-profile metadata, persisted as `profile.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub browser: String,
    pub channel: String,
    pub headless: bool,
    pub ttl_seconds: i64,
    pub created_at: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
}

/// Explicit per-field overrides; unset fields never overwrite.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub browser: Option<String>,
    pub channel: Option<String>,
    pub headless: Option<bool>,
    pub ttl: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct Store {
    pub root: PathBuf,
    pub default_ttl: Duration,
}

impl Store {
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("create profile dir {}", self.root.display()))
    }

    pub fn profile_dir(&self, name: &str) -> PathBuf {
        self.root.join(sanitize_name(name))
    }

    pub fn profile_path(&self, name: &str) -> PathBuf {
        self.profile_dir(name).join("profile.json")
    }

    pub fn storage_state_path(&self, name: &str) -> PathBuf {
        self.profile_dir(name).join("storage.json")
    }

    /// Fails with "profile not found" when the profile does not exist.
    pub fn load(&self, name: &str) -> Result<Profile> {
        self.read_profile(name)?
            .ok_or_else(|| anyhow!("profile not found: {}", sanitize_name(name)))
    }

    fn read_profile(&self, name: &str) -> Result<Option<Profile>> {
        let path = self.profile_path(name);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("read {}", path.display()));
            }
        };
        let profile = serde_json::from_slice(&data)
            .with_context(|| format!("parse {}", path.display()))?;
        Ok(Some(profile))
    }

    pub fn save(&self, profile: &Profile) -> Result<()> {
        self.ensure_dir()?;
        let mut profile = profile.clone();
        profile.name = sanitize_name(&profile.name);
        if profile.name.is_empty() {
            bail!("profile name required");
        }
        let dir = self.profile_dir(&profile.name);
        fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
        let data = serde_json::to_string_pretty(&profile)?;
        fs::write(self.profile_path(&profile.name), data)
            .with_context(|| format!("write profile {}", profile.name))
    }

    /// Create-or-update. Returns the profile and whether it was created.
    pub fn upsert(&self, name: &str, overrides: &Overrides) -> Result<(Profile, bool)> {
        let name = sanitize_name(name);
        if name.is_empty() {
            bail!("profile name required");
        }
        match self.read_profile(&name)? {
            None => {
                let now = Utc::now();
                let mut profile = Profile {
                    name: name.clone(),
                    browser: "chromium".to_string(),
                    channel: "chrome".to_string(),
                    headless: true,
                    ttl_seconds: self.default_ttl.as_secs() as i64,
                    created_at: now,
                    last_used: now,
                };
                apply_overrides(&mut profile, overrides);
                self.save(&profile)?;
                debug!("created profile {}", name);
                Ok((profile, true))
            }
            Some(mut profile) => {
                if apply_overrides(&mut profile, overrides) {
                    self.save(&profile)?;
                }
                Ok((profile, false))
            }
        }
    }

    pub fn touch(&self, name: &str) -> Result<Profile> {
        let mut profile = self.load(name)?;
        profile.last_used = Utc::now();
        self.save(&profile)?;
        Ok(profile)
    }

    /// Every directory entry that loads cleanly, sorted by name.
    /// Unreadable entries are silently skipped.
    pub fn list(&self) -> Result<Vec<Profile>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("read {}", self.root.display()));
            }
        };
        let mut profiles = Vec::new();
        for entry in entries.flatten() {
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if let Ok(Some(profile)) = self.read_profile(&name) {
                profiles.push(profile);
            }
        }
        profiles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(profiles)
    }

    /// Deletes the profile directory recursively. The caller is responsible
    /// for making sure no daemon is still serving it.
    pub fn remove(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            bail!("profile name required");
        }
        let dir = self.profile_dir(name);
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove {}", dir.display())),
        }
    }

    pub fn is_expired(&self, profile: &Profile) -> bool {
        if profile.ttl_seconds <= 0 {
            return false;
        }
        let deadline = profile.last_used + chrono::Duration::seconds(profile.ttl_seconds);
        Utc::now() > deadline
    }

    /// Removes every expired profile; returns the ones that were removed.
    pub fn prune(&self) -> Result<Vec<Profile>> {
        let mut removed = Vec::new();
        for profile in self.list()? {
            if self.is_expired(&profile) {
                self.remove(&profile.name)?;
                removed.push(profile);
            }
        }
        Ok(removed)
    }
}

fn apply_overrides(profile: &mut Profile, overrides: &Overrides) -> bool {
    let mut updated = false;
    if let Some(browser) = &overrides.browser {
        if &profile.browser != browser {
            profile.browser = browser.clone();
            updated = true;
        }
    }
    if let Some(channel) = &overrides.channel {
        if &profile.channel != channel {
            profile.channel = channel.clone();
            updated = true;
        }
    }
    if let Some(headless) = overrides.headless {
        if profile.headless != headless {
            profile.headless = headless;
            updated = true;
        }
    }
    if let Some(ttl) = overrides.ttl {
        let seconds = ttl.as_secs() as i64;
        if profile.ttl_seconds != seconds {
            profile.ttl_seconds = seconds;
            updated = true;
        }
    }
    updated
}

/// Trim, lowercase, spaces to dashes. The result is used verbatim as a
/// directory name.
pub fn sanitize_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "-")
}

pub fn format_ttl(seconds: i64) -> String {
    if seconds <= 0 {
        return "never".to_string();
    }
    humantime::format_duration(Duration::from_secs(seconds as u64)).to_string()
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (browser={} channel={} headless={})",
            self.name, self.browser, self.channel, self.headless
        )
    }
}

#[cfg(test)]
#[path = "profile_test.rs"]
mod profile_test;
