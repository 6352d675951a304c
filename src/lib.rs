//! # www
//!
//! Persistent, named browser profiles for the command line.
//!
//! Each profile owns a long-running headless browser behind a per-profile
//! daemon. Short-lived CLI invocations connect to the daemon over a local
//! Unix socket, perform one operation on a chosen tab, and exit. This is
//! materially faster than launching a browser per command.
//!
//! ## CLI Usage
//!
//! ```bash
//! # Navigate the "work" profile (daemon auto-starts on first use)
//! www -p work goto https://example.com
//!
//! # Click by visible text, read the main content
//! www -p work click "Sign in"
//! www -p work read --main
//!
//! # Tabs are numbered and persist between commands
//! www -p work tab new --url https://docs.rs
//! www -p work tab list
//! www -p work shot /tmp/page.png --full-page
//!
//! # Profile management
//! www list
//! www ps
//! www stop -p work
//! www prune --dry-run
//! ```
//!
//! ## Library Usage
//!
//! The daemon pieces are usable directly, which is how the tests drive a
//! server against the in-crate fake engine:
//!
//! ```no_run
//! use www::browser::{fake::FakeEngine, StartOptions};
//! use www::daemon::{client::Client, server};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let engine = FakeEngine::new();
//! tokio::spawn({
//!     let engine = engine.clone();
//!     async move {
//!         server::serve_profile(
//!             "/tmp/demo.sock".as_ref(),
//!             "demo",
//!             &engine,
//!             StartOptions::default(),
//!         )
//!         .await
//!     }
//! });
//! let mut client = Client::connect("/tmp/demo.sock".as_ref()).await?;
//! client.goto(0, "https://example.com", 1000).await?;
//! client.stop().await?;
//! # Ok(())
//! # }
//! ```

/// Browser engine abstraction and backends
pub mod browser;

/// CLI command handlers
pub mod commands;

/// Configuration loading (flags, environment, system TOML)
pub mod config;

/// Daemon: wire protocol, session server, client stub, lifecycle manager
pub mod daemon;

/// CLI error type with exit codes
pub mod errors;

/// On-disk profile store
pub mod profile;

pub use config::Config;
pub use errors::CliError;
pub use profile::{Overrides, Profile, Store};
