//! CLI command handlers and shared glue.

use crate::config::Config;
use crate::daemon::Manager;
use crate::profile::Store;
use clap::Args;
use std::path::PathBuf;

pub mod doctor;
pub mod page;
pub mod profiles;
pub mod serve;
pub mod tabs;
pub mod utils;

/// Everything a command handler needs
pub struct Ctx {
    pub cfg: Config,
    pub store: Store,
    pub mgr: Manager,
    pub flags: GlobalFlags,
}

/// Persistent flags shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalFlags {
    /// Profile name
    #[arg(short = 'p', long, global = true)]
    pub profile: Option<String>,

    /// Profile directory
    #[arg(short = 'D', long, global = true)]
    pub profile_dir: Option<PathBuf>,

    /// JSON output
    #[arg(short = 'j', long, global = true)]
    pub json: bool,

    /// Quiet output
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Do not auto-start the daemon
    #[arg(short = 'N', long, global = true)]
    pub no_start: bool,

    /// Persist browser/channel/headless/ttl overrides to the profile
    #[arg(short = 's', long, global = true)]
    pub save: bool,

    /// Browser type (chromium, firefox, webkit)
    #[arg(short = 'b', long, global = true)]
    pub browser: Option<String>,

    /// Browser channel (e.g. chrome)
    #[arg(short = 'c', long, global = true)]
    pub channel: Option<String>,

    /// Run headless
    #[arg(short = 'H', long, global = true)]
    pub headless: bool,

    /// Run headed
    #[arg(short = 'E', long, global = true)]
    pub headed: bool,

    /// Tab id (0 = active tab)
    #[arg(short = 'T', long, global = true, default_value_t = 0)]
    pub tab: u64,

    /// Profile TTL (e.g. 14d, 0 = never expire)
    #[arg(short = 'L', long, global = true)]
    pub ttl: Option<String>,

    /// Selector
    #[arg(short = 'S', long, global = true)]
    pub selector: Option<String>,

    /// Prefer the page's main content
    #[arg(short = 'm', long = "main", global = true)]
    pub main_content: bool,

    /// Action timeout (e.g. 20s)
    #[arg(short = 't', long, global = true)]
    pub timeout: Option<String>,
}
