//! Daemon lifecycle: spawn, liveness, staleness, stop.
//!
//! The manager keeps no long-lived state; every answer is recomputed from
//! the profile directory and the OS. At most one daemon runs per profile,
//! enforced by the liveness and staleness checks rather than file locks.

use crate::daemon::client::Client;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};

/// Written by the daemon at startup; exists iff a daemon is believed
/// running.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonInfo {
    pub pid: i32,
    pub socket: PathBuf,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_mod_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct Manager {
    pub profile_dir: PathBuf,
    /// Binary to spawn daemons from; the current executable when unset
    pub binary_path: Option<PathBuf>,
}

impl Manager {
    pub fn new(profile_dir: PathBuf) -> Self {
        Manager {
            profile_dir,
            binary_path: None,
        }
    }

    pub fn socket_path(&self, profile: &str) -> PathBuf {
        self.profile_dir.join(profile).join("daemon.sock")
    }

    pub fn info_path(&self, profile: &str) -> PathBuf {
        self.profile_dir.join(profile).join("daemon.json")
    }

    pub fn load_info(&self, profile: &str) -> Result<Option<DaemonInfo>> {
        let path = self.info_path(profile);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("read {}", path.display())),
        };
        match serde_json::from_slice(&data) {
            Ok(info) => Ok(Some(info)),
            // a partially written file reads as "not running"
            Err(_) => Ok(None),
        }
    }

    pub fn save_info(&self, profile: &str, info: &DaemonInfo) -> Result<()> {
        let data = serde_json::to_string_pretty(info)?;
        let path = self.info_path(profile);
        fs::write(&path, data).with_context(|| format!("write {}", path.display()))
    }

    /// A daemon counts as running only when its recorded PID is alive,
    /// its socket accepts connections, and it was spawned from the binary
    /// currently on disk. Anything else is cleaned up and reported as not
    /// running.
    pub async fn is_running(&self, profile: &str) -> Result<Option<DaemonInfo>> {
        let info = match self.load_info(profile)? {
            Some(info) => info,
            None => return Ok(None),
        };
        if !process_alive(info.pid) {
            self.cleanup_stale(profile);
            return Ok(None);
        }
        if !socket_alive(&info.socket) {
            self.cleanup_stale(profile);
            return Ok(None);
        }
        if binary_mismatch(&info) {
            info!("daemon for {} predates the current binary; stopping", profile);
            let _ = self.stop(profile).await;
            self.cleanup_stale(profile);
            return Ok(None);
        }
        Ok(Some(info))
    }

    pub async fn start(&self, profile: &str) -> Result<()> {
        if self.is_running(profile).await?.is_some() {
            return Ok(());
        }
        let binary = match &self.binary_path {
            Some(path) => path.clone(),
            None => std::env::current_exe().context("resolve current executable")?,
        };

        let mut cmd = Command::new(&binary);
        cmd.arg("--profile")
            .arg(profile)
            .arg("--profile-dir")
            .arg(&self.profile_dir)
            .arg("serve")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        let child = cmd.spawn().context("spawn daemon")?;
        debug!("spawned daemon pid {} for {}", child.id(), profile);

        let socket = self.socket_path(profile);
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while tokio::time::Instant::now() < deadline {
            if socket_alive(&socket) {
                return Ok(());
            }
            sleep(Duration::from_millis(100)).await;
        }
        bail!("daemon did not start")
    }

    pub async fn stop(&self, profile: &str) -> Result<()> {
        let mut client = Client::connect(&self.socket_path(profile)).await?;
        client.stop().await
    }

    /// Every profile directory whose daemon passes the liveness check.
    pub async fn running_profiles(&self) -> Result<Vec<DaemonInfo>> {
        let entries = match fs::read_dir(&self.profile_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("read {}", self.profile_dir.display()));
            }
        };
        let mut infos = Vec::new();
        for entry in entries.flatten() {
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(info) = self.is_running(&name).await? {
                infos.push(info);
            }
        }
        Ok(infos)
    }

    fn cleanup_stale(&self, profile: &str) {
        let _ = fs::remove_file(self.socket_path(profile));
        let _ = fs::remove_file(self.info_path(profile));
    }
}

pub fn ensure_profile_dir(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        bail!("profile dir required");
    }
    fs::create_dir_all(path).with_context(|| format!("create profile dir {}", path.display()))
}

/// True when the recorded binary differs from the executable on disk.
/// Missing information counts as a match so that hand-written info files
/// do not kill daemons.
pub fn binary_mismatch(info: &DaemonInfo) -> bool {
    let Ok((path, mod_time)) = current_binary_info() else {
        return false;
    };
    let (Some(recorded_path), Some(recorded_mod)) = (&info.binary_path, info.binary_mod_time)
    else {
        return false;
    };
    if recorded_path != &path {
        return true;
    }
    recorded_mod != mod_time
}

pub fn current_binary_info() -> Result<(PathBuf, DateTime<Utc>)> {
    let path = std::env::current_exe().context("resolve current executable")?;
    let modified = fs::metadata(&path)
        .and_then(|meta| meta.modified())
        .with_context(|| format!("stat {}", path.display()))?;
    Ok((path, DateTime::<Utc>::from(modified)))
}

fn socket_alive(path: &Path) -> bool {
    std::os::unix::net::UnixStream::connect(path).is_ok()
}

fn process_alive(pid: i32) -> bool {
    if pid <= 0 {
        return false;
    }
    #[cfg(unix)]
    {
        nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid), None).is_ok()
    }
    #[cfg(not(unix))]
    {
        false
    }
}

#[cfg(test)]
#[path = "manager_test.rs"]
mod manager_test;
