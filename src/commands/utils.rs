//! Shared glue between the CLI surface and the daemon.

use super::{Ctx, GlobalFlags};
use crate::daemon::{client::Client, Manager, StatusResult};
use crate::errors::{CliError, CliResult};
use crate::profile::{sanitize_name, Overrides};
use anyhow::{anyhow, Result};
use std::time::Duration;

pub fn require_profile(flags: &GlobalFlags) -> CliResult<String> {
    match &flags.profile {
        Some(name) if !sanitize_name(name).is_empty() => Ok(sanitize_name(name)),
        _ => Err(CliError::usage("-p/--profile is required")),
    }
}

pub async fn ensure_running(mgr: &Manager, name: &str, no_start: bool) -> Result<()> {
    if mgr.is_running(name).await?.is_some() {
        return Ok(());
    }
    if no_start {
        return Err(anyhow!("profile is not running"));
    }
    mgr.start(name).await
}

/// Upserts the profile, makes sure its daemon is up, dials it and picks
/// the target tab.
pub async fn prepare_client(ctx: &Ctx) -> CliResult<(Client, u64)> {
    let mut client = prepare_client_no_tab(ctx).await?;
    let tab = resolve_tab_id(&mut client, ctx.flags.tab).await?;
    Ok((client, tab))
}

pub async fn prepare_client_no_tab(ctx: &Ctx) -> CliResult<Client> {
    let name = require_profile(&ctx.flags)?;
    let overrides = if ctx.flags.save {
        overrides_from_flags(&ctx.flags)?
    } else {
        Overrides::default()
    };
    ctx.store.upsert(&name, &overrides)?;
    ensure_running(&ctx.mgr, &name, ctx.flags.no_start).await?;
    let client = Client::connect(&ctx.mgr.socket_path(&name)).await?;
    Ok(client)
}

async fn resolve_tab_id(client: &mut Client, requested: u64) -> CliResult<u64> {
    if requested != 0 {
        return Ok(requested);
    }
    let status = client.status().await?;
    Ok(resolve_tab_id_from_status(&status)?)
}

pub fn resolve_tab_id_from_status(status: &StatusResult) -> Result<u64> {
    match status.tabs.len() {
        1 => Ok(status.tabs[0].id),
        0 => Err(anyhow!("no tabs available")),
        _ => Err(anyhow!("multiple tabs; use --tab")),
    }
}

/// `text=` and `css=` pass through; anything else is a text match. A raw
/// CSS-looking argument (`#foo`) therefore becomes `text=#foo`.
pub fn normalize_selector(value: &str) -> String {
    if value.starts_with("text=") || value.starts_with("css=") {
        return value.to_string();
    }
    format!("text={}", value)
}

/// Empty or unset means the 20s default; an explicit `0` disables the
/// override.
pub fn action_timeout_ms(timeout: Option<&str>) -> CliResult<u64> {
    let timeout = timeout.unwrap_or("").trim();
    if timeout.is_empty() {
        return Ok(20_000);
    }
    let d = humantime::parse_duration(timeout)
        .map_err(|e| CliError::usage(format!("invalid timeout: {}", e)))?;
    Ok(d.as_millis() as u64)
}

pub fn parse_ttl(ttl: &str) -> CliResult<Duration> {
    humantime::parse_duration(ttl.trim())
        .map_err(|e| CliError::usage(format!("invalid ttl: {}", e)))
}

pub fn overrides_from_flags(flags: &GlobalFlags) -> CliResult<Overrides> {
    let mut overrides = Overrides {
        browser: flags.browser.clone(),
        channel: flags.channel.clone(),
        ..Default::default()
    };
    if flags.headless && flags.headed {
        return Err(CliError::usage("cannot set both --headless and --headed"));
    }
    if flags.headless {
        overrides.headless = Some(true);
    }
    if flags.headed {
        overrides.headless = Some(false);
    }
    if let Some(ttl) = &flags.ttl {
        overrides.ttl = Some(parse_ttl(ttl)?);
    }
    Ok(overrides)
}

#[cfg(test)]
#[path = "utils_test.rs"]
mod utils_test;
