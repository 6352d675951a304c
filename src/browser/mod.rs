//! Browser engine abstraction.
//!
//! The session server only ever talks to these traits, which keeps it
//! testable against the fake backend. The real backend drives a browser
//! over WebDriver.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Fake engine for tests
pub mod fake;

/// WebDriver process management for the real backend
pub mod driver;

/// Real backend over WebDriver
pub mod webdriver;

/// Options for starting a browser session
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    /// Browser type: `chromium` (default), `firefox`, `webkit`
    pub browser: String,
    /// Optional release channel, e.g. `chrome`
    pub channel: String,
    pub headless: bool,
    /// Storage state file to seed the session from, when it exists
    pub storage_in: Option<PathBuf>,
}

#[async_trait]
pub trait Engine: Send + Sync {
    async fn start(&self, opts: StartOptions) -> Result<Box<dyn Session>>;
}

#[async_trait]
pub trait Session: Send + Sync {
    async fn new_page(&mut self) -> Result<Box<dyn Page>>;
    async fn close(&mut self) -> Result<()>;
    /// Write cookies and local storage to `path` so they survive restarts.
    async fn storage_state(&self, path: &Path) -> Result<()>;
}

#[async_trait]
pub trait Page: Send + Sync {
    async fn goto(&self, url: &str) -> Result<()>;
    async fn click(&self, selector: &str) -> Result<()>;
    async fn fill(&self, selector: &str, value: &str) -> Result<()>;
    async fn screenshot(&self, path: &Path, full_page: bool, selector: &str) -> Result<()>;
    async fn extract(&self, options: ExtractOptions) -> Result<ExtractResult>;
    async fn links(&self, filter: &str) -> Result<Vec<Link>>;
    /// Default timeout for subsequent actions; stays in effect until
    /// overridden.
    async fn set_timeout(&self, ms: u64) -> Result<()>;
    async fn eval(&self, js: &str) -> Result<serde_json::Value>;
    async fn url(&self) -> Result<String>;
    async fn title(&self) -> Result<String>;
    async fn close(&self) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    pub selector: String,
    /// Prefer the page's main content container as the text root
    pub main: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractResult {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub buttons: Vec<Button>,
    #[serde(default)]
    pub inputs: Vec<Input>,
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub href: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Button {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Input {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub r#type: String,
}
