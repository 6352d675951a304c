//! Tab commands: new, list, close, switch.

use super::utils::prepare_client_no_tab;
use super::Ctx;
use crate::errors::{CliError, CliResult};

pub async fn run_tab_new(ctx: &Ctx, url: &str) -> CliResult<()> {
    let mut client = prepare_client_no_tab(ctx).await?;
    let tab = client.tab_new(url).await?;
    println!("{}", tab.id);
    Ok(())
}

pub async fn run_tab_list(ctx: &Ctx) -> CliResult<()> {
    let mut client = prepare_client_no_tab(ctx).await?;
    let tabs = client.tab_list().await?;
    if ctx.flags.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&tabs).map_err(anyhow::Error::from)?
        );
        return Ok(());
    }
    for tab in tabs {
        let marker = if tab.active { "*" } else { "" };
        println!("{}{} {}", tab.id, marker, tab.url);
    }
    Ok(())
}

pub async fn run_tab_close(ctx: &Ctx) -> CliResult<()> {
    if ctx.flags.tab == 0 {
        return Err(CliError::usage("-T/--tab is required"));
    }
    let mut client = prepare_client_no_tab(ctx).await?;
    client.tab_close(ctx.flags.tab).await?;
    Ok(())
}

pub async fn run_tab_switch(ctx: &Ctx) -> CliResult<()> {
    if ctx.flags.tab == 0 {
        return Err(CliError::usage("-T/--tab is required"));
    }
    let mut client = prepare_client_no_tab(ctx).await?;
    client.tab_switch(ctx.flags.tab).await?;
    Ok(())
}
