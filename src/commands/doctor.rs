//! Environment helpers: `install` and `doctor`.

use super::Ctx;
use crate::browser::driver::{command_exists, driver_command};
use crate::errors::{CliError, CliResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;

fn default_browsers() -> Vec<&'static str> {
    if cfg!(target_os = "macos") {
        vec!["chromium", "firefox", "webkit"]
    } else {
        vec!["chromium", "firefox"]
    }
}

/// Reports which WebDriver binaries are available and how to get the
/// missing ones.
pub fn run_install(ctx: &Ctx) -> CliResult<()> {
    let browsers: Vec<&str> = match ctx.flags.browser.as_deref() {
        Some(browser) => vec![browser],
        None => default_browsers(),
    };
    let mut missing = Vec::new();
    for browser in browsers {
        let command = driver_command(browser)?;
        if command_exists(command) {
            if !ctx.flags.quiet {
                println!("{}: {} found", browser, command);
            }
        } else {
            missing.push((browser, command));
        }
    }
    for (browser, command) in &missing {
        eprintln!(
            "{}: {} not found in PATH (macOS: brew install {})",
            browser, command, command
        );
    }
    if !missing.is_empty() {
        return Err(CliError::Other(anyhow::anyhow!(
            "missing webdriver binaries"
        )));
    }
    Ok(())
}

#[derive(Serialize)]
struct DoctorReport {
    profile_dir: String,
    profile_dir_writable: bool,
    drivers: BTreeMap<String, bool>,
}

pub fn run_doctor(ctx: &Ctx) -> CliResult<()> {
    let mut drivers = BTreeMap::new();
    for browser in default_browsers() {
        if let Ok(command) = driver_command(browser) {
            drivers.insert(command.to_string(), command_exists(command));
        }
    }
    let report = DoctorReport {
        profile_dir: ctx.cfg.profile_dir.display().to_string(),
        profile_dir_writable: fs::create_dir_all(&ctx.cfg.profile_dir).is_ok(),
        drivers,
    };
    if ctx.flags.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).map_err(anyhow::Error::from)?
        );
        return Ok(());
    }
    println!("profile_dir={}", report.profile_dir);
    println!("profile_dir_writable={}", report.profile_dir_writable);
    for (driver, ok) in report.drivers {
        println!("{}={}", driver, ok);
    }
    Ok(())
}
