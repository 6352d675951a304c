//! Profile management commands: start, stop, ps, list, show, rm, prune.

use super::utils::{overrides_from_flags, require_profile};
use super::Ctx;
use crate::errors::{CliError, CliResult};
use crate::profile::format_ttl;
use chrono::SecondsFormat;

pub async fn run_start(ctx: &Ctx) -> CliResult<()> {
    let name = require_profile(&ctx.flags)?;
    let overrides = overrides_from_flags(&ctx.flags)?;
    let (profile, created) = ctx.store.upsert(&name, &overrides)?;
    ctx.mgr.start(&profile.name).await?;
    let _ = ctx.store.touch(&profile.name);
    if !ctx.flags.quiet {
        if created {
            println!("created and started {}", profile.name);
        } else {
            println!("started {}", profile.name);
        }
    }
    Ok(())
}

pub async fn run_stop(ctx: &Ctx) -> CliResult<()> {
    let name = require_profile(&ctx.flags)?;
    if ctx.mgr.is_running(&name).await?.is_none() {
        if !ctx.flags.quiet {
            println!("{} is not running", name);
        }
        return Ok(());
    }
    ctx.mgr.stop(&name).await?;
    if !ctx.flags.quiet {
        println!("stopped {}", name);
    }
    Ok(())
}

pub async fn run_ps(ctx: &Ctx) -> CliResult<()> {
    let infos = ctx.mgr.running_profiles().await?;
    if ctx.flags.json {
        println!("{}", serde_json::to_string_pretty(&infos).map_err(anyhow::Error::from)?);
        return Ok(());
    }
    for info in infos {
        println!(
            "pid={} socket={} started_at={}",
            info.pid,
            info.socket.display(),
            info.started_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        );
    }
    Ok(())
}

pub fn run_list(ctx: &Ctx) -> CliResult<()> {
    let profiles = ctx.store.list()?;
    if ctx.flags.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&profiles).map_err(anyhow::Error::from)?
        );
        return Ok(());
    }
    for p in profiles {
        println!(
            "{} last_used={} ttl={}",
            p.name,
            p.last_used.to_rfc3339_opts(SecondsFormat::Secs, true),
            format_ttl(p.ttl_seconds)
        );
    }
    Ok(())
}

pub fn run_show(ctx: &Ctx, name: &str) -> CliResult<()> {
    let profile = ctx
        .store
        .load(name)
        .map_err(|e| CliError::NotFound(format!("{:#}", e)))?;
    if ctx.flags.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&profile).map_err(anyhow::Error::from)?
        );
        return Ok(());
    }
    println!("name={}", profile.name);
    println!("browser={} channel={}", profile.browser, profile.channel);
    println!("headless={}", profile.headless);
    println!(
        "created_at={}",
        profile.created_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    println!(
        "last_used={}",
        profile.last_used.to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    println!("ttl={}", format_ttl(profile.ttl_seconds));
    Ok(())
}

pub async fn run_rm(ctx: &Ctx, names: &[String]) -> CliResult<()> {
    for name in names {
        let name = crate::profile::sanitize_name(name);
        let name = name.as_str();
        if ctx.mgr.is_running(name).await?.is_some() {
            return Err(CliError::Other(anyhow::anyhow!(
                "{} is running; stop first",
                name
            )));
        }
        ctx.store.remove(name)?;
        if !ctx.flags.quiet {
            println!("removed {}", name);
        }
    }
    Ok(())
}

pub async fn run_prune(ctx: &Ctx, dry_run: bool, force: bool) -> CliResult<()> {
    let mut removed = Vec::new();
    for profile in ctx.store.list()? {
        if !ctx.store.is_expired(&profile) {
            continue;
        }
        if ctx.mgr.is_running(&profile.name).await?.is_some() && !force {
            continue;
        }
        if !dry_run {
            ctx.store.remove(&profile.name)?;
        }
        removed.push(profile);
    }
    if ctx.flags.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&removed).map_err(anyhow::Error::from)?
        );
        return Ok(());
    }
    for p in removed {
        println!("pruned {}", p.name);
    }
    Ok(())
}
