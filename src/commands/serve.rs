//! Hidden daemon entry point, invoked only by the lifecycle manager.

use super::utils::require_profile;
use super::Ctx;
use crate::browser::webdriver::WebDriverEngine;
use crate::browser::StartOptions;
use crate::daemon::manager::current_binary_info;
use crate::daemon::server::serve_profile;
use crate::daemon::DaemonInfo;
use crate::errors::CliResult;
use chrono::Utc;

pub async fn run_serve(ctx: &Ctx) -> CliResult<()> {
    let name = require_profile(&ctx.flags)?;
    let profile = ctx.store.load(&name)?;

    let socket = ctx.mgr.socket_path(&profile.name);
    let mut info = DaemonInfo {
        pid: std::process::id() as i32,
        socket: socket.clone(),
        started_at: Utc::now(),
        binary_path: None,
        binary_mod_time: None,
    };
    if let Ok((path, mod_time)) = current_binary_info() {
        info.binary_path = Some(path);
        info.binary_mod_time = Some(mod_time);
    }
    ctx.mgr.save_info(&profile.name, &info)?;

    let opts = StartOptions {
        browser: profile.browser.clone(),
        channel: profile.channel.clone(),
        headless: profile.headless,
        storage_in: Some(ctx.store.storage_state_path(&profile.name)),
    };
    serve_profile(&socket, &profile.name, &WebDriverEngine, opts).await?;
    Ok(())
}
