//! Page commands: goto, click, fill, shot, extract, read, url, links,
//! eval. Each dials the profile's daemon, performs one operation on the
//! resolved tab, touches the profile and exits.

use super::utils::{action_timeout_ms, normalize_selector, prepare_client};
use super::Ctx;
use crate::errors::CliResult;

fn selector_flag(ctx: &Ctx) -> String {
    ctx.flags.selector.clone().unwrap_or_default()
}

fn touch(ctx: &Ctx) {
    if let Some(name) = &ctx.flags.profile {
        let _ = ctx.store.touch(name);
    }
}

pub async fn run_goto(ctx: &Ctx, url: &str) -> CliResult<()> {
    let (mut client, tab) = prepare_client(ctx).await?;
    let timeout_ms = action_timeout_ms(ctx.flags.timeout.as_deref())?;
    client.goto(tab, url, timeout_ms).await?;
    touch(ctx);
    Ok(())
}

pub async fn run_click(ctx: &Ctx, target: &str) -> CliResult<()> {
    let (mut client, tab) = prepare_client(ctx).await?;
    let timeout_ms = action_timeout_ms(ctx.flags.timeout.as_deref())?;
    client
        .click(tab, &normalize_selector(target), timeout_ms)
        .await?;
    touch(ctx);
    Ok(())
}

pub async fn run_fill(ctx: &Ctx, selector: &str, value: &str) -> CliResult<()> {
    let (mut client, tab) = prepare_client(ctx).await?;
    let timeout_ms = action_timeout_ms(ctx.flags.timeout.as_deref())?;
    client.fill(tab, selector, value, timeout_ms).await?;
    touch(ctx);
    Ok(())
}

pub async fn run_shot(ctx: &Ctx, path: &str, full_page: bool) -> CliResult<()> {
    let (mut client, tab) = prepare_client(ctx).await?;
    let timeout_ms = action_timeout_ms(ctx.flags.timeout.as_deref())?;
    client
        .shot(tab, path, full_page, &selector_flag(ctx), timeout_ms)
        .await?;
    touch(ctx);
    if !ctx.flags.quiet {
        println!("{}", path);
    }
    Ok(())
}

pub async fn run_extract(ctx: &Ctx) -> CliResult<()> {
    let (mut client, tab) = prepare_client(ctx).await?;
    let timeout_ms = action_timeout_ms(ctx.flags.timeout.as_deref())?;
    let result = client
        .extract(tab, &selector_flag(ctx), ctx.flags.main_content, timeout_ms)
        .await?;
    if ctx.flags.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).map_err(anyhow::Error::from)?
        );
    } else {
        println!("{}", result);
    }
    touch(ctx);
    Ok(())
}

/// `read` is extract narrowed to the text field, preferring the main
/// content container.
pub async fn run_read(ctx: &Ctx) -> CliResult<()> {
    let (mut client, tab) = prepare_client(ctx).await?;
    let timeout_ms = action_timeout_ms(ctx.flags.timeout.as_deref())?;
    let result = client
        .extract(tab, &selector_flag(ctx), true, timeout_ms)
        .await?;
    let text = result
        .get("text")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    println!("{}", text);
    touch(ctx);
    Ok(())
}

pub async fn run_url(ctx: &Ctx) -> CliResult<()> {
    let (mut client, tab) = prepare_client(ctx).await?;
    let value = client.url(tab).await?;
    println!("{}", value);
    Ok(())
}

pub async fn run_links(ctx: &Ctx, filter: &str) -> CliResult<()> {
    let (mut client, tab) = prepare_client(ctx).await?;
    let links = client.links(tab, filter).await?;
    if ctx.flags.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&links).map_err(anyhow::Error::from)?
        );
        return Ok(());
    }
    for link in links {
        println!("{}\t{}", link.text, link.href);
    }
    Ok(())
}

pub async fn run_eval(ctx: &Ctx, js: &str) -> CliResult<()> {
    let (mut client, tab) = prepare_client(ctx).await?;
    let timeout_ms = action_timeout_ms(ctx.flags.timeout.as_deref())?;
    let result = client.eval(tab, js, timeout_ms).await?;
    println!("{}", result);
    touch(ctx);
    Ok(())
}
