#![allow(clippy::uninlined_format_args)]

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use www::commands::{doctor, page, profiles, serve, tabs, Ctx, GlobalFlags};
use www::daemon::manager::ensure_profile_dir;
use www::daemon::Manager;
use www::errors::{CliError, CliResult};
use www::profile::Store;

#[derive(Parser)]
#[command(name = "www", version)]
#[command(about = "Persistent browser profiles for the command line", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    flags: GlobalFlags,
}

#[derive(Subcommand)]
enum Commands {
    /// Check for WebDriver binaries and print install hints
    Install,

    /// Check install and environment health
    Doctor,

    /// Start a profile's daemon
    Start,

    /// Stop a profile's daemon
    Stop,

    /// List running profiles
    Ps,

    /// List profiles
    List,

    /// Show a profile
    Show {
        /// Profile name
        name: String,
    },

    /// Remove profiles
    Rm {
        /// Profile names
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Remove expired profiles
    Prune {
        /// Preview without removing
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Remove even running profiles
        #[arg(short = 'f', long)]
        force: bool,
    },

    /// Manage tabs
    Tab {
        #[command(subcommand)]
        command: TabCommands,
    },

    /// Navigate the chosen tab
    Goto {
        /// Destination URL
        url: String,
    },

    /// Click an element by visible text or css=/text= selector
    Click {
        /// Text or selector
        target: String,
    },

    /// Fill an input
    Fill {
        /// CSS selector
        selector: String,
        /// Value to type
        value: String,
    },

    /// Take a screenshot
    Shot {
        /// Output path (PNG)
        path: String,

        /// Capture the full page
        #[arg(short = 'F', long)]
        full_page: bool,
    },

    /// Extract page info (url, title, text, links, buttons, inputs, meta)
    Extract,

    /// Read the page's main content
    Read,

    /// Print the current tab URL
    Url,

    /// List visible links
    Links {
        /// Case-insensitive substring filter on the link text
        #[arg(short = 'f', long)]
        filter: Option<String>,
    },

    /// Evaluate JavaScript in the chosen tab
    Eval {
        /// Script (joined with spaces)
        #[arg(required = true)]
        js: Vec<String>,
    },

    /// Internal daemon entrypoint
    #[command(hide = true)]
    Serve,
}

#[derive(Subcommand)]
enum TabCommands {
    /// Create a new tab (becomes active)
    New {
        /// Navigate the new tab here
        #[arg(short = 'u', long)]
        url: Option<String>,
    },

    /// List tabs
    List,

    /// Close a tab (-T/--tab)
    Close,

    /// Switch the active tab (-T/--tab)
    Switch,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.flags.verbose);

    match run(cli).await {
        Ok(()) => {}
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(err.exit_code());
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "www=debug" } else { "www=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

async fn run(cli: Cli) -> CliResult<()> {
    let cfg = www::config::load(cli.flags.profile_dir.as_deref(), None)
        .map_err(CliError::Other)?;
    ensure_profile_dir(&cfg.profile_dir)?;
    let store = Store {
        root: cfg.profile_dir.clone(),
        default_ttl: cfg.default_ttl,
    };
    let mgr = Manager::new(cfg.profile_dir.clone());
    let ctx = Ctx {
        cfg,
        store,
        mgr,
        flags: cli.flags,
    };

    match cli.command {
        Commands::Install => doctor::run_install(&ctx),
        Commands::Doctor => doctor::run_doctor(&ctx),
        Commands::Start => profiles::run_start(&ctx).await,
        Commands::Stop => profiles::run_stop(&ctx).await,
        Commands::Ps => profiles::run_ps(&ctx).await,
        Commands::List => profiles::run_list(&ctx),
        Commands::Show { name } => profiles::run_show(&ctx, &name),
        Commands::Rm { names } => profiles::run_rm(&ctx, &names).await,
        Commands::Prune { dry_run, force } => profiles::run_prune(&ctx, dry_run, force).await,
        Commands::Tab { command } => match command {
            TabCommands::New { url } => tabs::run_tab_new(&ctx, url.as_deref().unwrap_or("")).await,
            TabCommands::List => tabs::run_tab_list(&ctx).await,
            TabCommands::Close => tabs::run_tab_close(&ctx).await,
            TabCommands::Switch => tabs::run_tab_switch(&ctx).await,
        },
        Commands::Goto { url } => page::run_goto(&ctx, &url).await,
        Commands::Click { target } => page::run_click(&ctx, &target).await,
        Commands::Fill { selector, value } => page::run_fill(&ctx, &selector, &value).await,
        Commands::Shot { path, full_page } => page::run_shot(&ctx, &path, full_page).await,
        Commands::Extract => page::run_extract(&ctx).await,
        Commands::Read => page::run_read(&ctx).await,
        Commands::Url => page::run_url(&ctx).await,
        Commands::Links { filter } => {
            page::run_links(&ctx, filter.as_deref().unwrap_or("")).await
        }
        Commands::Eval { js } => page::run_eval(&ctx, &js.join(" ")).await,
        Commands::Serve => serve::run_serve(&ctx).await,
    }
}
