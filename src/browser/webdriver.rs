//! Real browser backend over WebDriver.
//!
//! One driver process and one WebDriver session per browser session; each
//! page is a window handle within it. Storage state is dumped to JSON via
//! the cookie API plus an in-page localStorage sweep, and a seed file is
//! re-applied best-effort as pages navigate into matching origins.

use super::driver::{self, DriverProcess};
use super::{Engine, ExtractOptions, ExtractResult, Link, Page, Session, StartOptions};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use fantoccini::cookies::Cookie;
use fantoccini::wd::{TimeoutConfiguration, WindowHandle};
use fantoccini::{Client, ClientBuilder, Locator};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

pub struct WebDriverEngine;

#[async_trait]
impl Engine for WebDriverEngine {
    async fn start(&self, opts: StartOptions) -> Result<Box<dyn Session>> {
        let driver = driver::launch(&opts.browser).await?;
        let caps = capabilities(&opts);

        debug!("connecting to webdriver at {}", driver.url);
        let client = ClientBuilder::rustls()
            .capabilities(caps)
            .connect(&driver.url)
            .await
            .context("connect to webdriver")?;

        let seed = match &opts.storage_in {
            Some(path) if path.exists() => load_seed(path),
            _ => StorageSeed::default(),
        };

        Ok(Box::new(WebDriverSession {
            client,
            driver: Some(driver),
            seed: Arc::new(Mutex::new(seed)),
            handed_initial: false,
        }))
    }
}

fn capabilities(opts: &StartOptions) -> serde_json::Map<String, serde_json::Value> {
    let mut caps = serde_json::Map::new();
    match opts.browser.as_str() {
        "firefox" => {
            let mut args: Vec<String> = Vec::new();
            if opts.headless {
                args.push("-headless".to_string());
            }
            caps.insert("moz:firefoxOptions".to_string(), json!({ "args": args }));
        }
        "webkit" => {
            if opts.headless {
                warn!("webkit has no headless mode; running headed");
            }
        }
        // chromium, optionally on a branded channel
        _ => {
            let mut args = vec!["--no-sandbox".to_string()];
            if opts.headless {
                args.push("--headless=new".to_string());
                args.push("--disable-gpu".to_string());
            }
            if !opts.channel.is_empty() && opts.channel != "chrome" {
                debug!("channel {} is not selectable over webdriver", opts.channel);
            }
            caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
        }
    }
    caps
}

struct WebDriverSession {
    client: Client,
    driver: Option<DriverProcess>,
    seed: Arc<Mutex<StorageSeed>>,
    handed_initial: bool,
}

#[async_trait]
impl Session for WebDriverSession {
    async fn new_page(&mut self) -> Result<Box<dyn Page>> {
        let window = if self.handed_initial {
            self.client.new_window(true).await?.handle
        } else {
            // the session starts with exactly one window; hand it out first
            self.handed_initial = true;
            self.client
                .windows()
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| anyhow!("webdriver session has no window"))?
        };
        Ok(Box::new(WebDriverPage {
            client: self.client.clone(),
            window,
            seed: self.seed.clone(),
        }))
    }

    async fn close(&mut self) -> Result<()> {
        let result = self.client.clone().close().await;
        if let Some(mut driver) = self.driver.take() {
            driver.kill();
        }
        result.context("close webdriver session")
    }

    async fn storage_state(&self, path: &Path) -> Result<()> {
        let cookies = self.client.get_all_cookies().await.unwrap_or_default();
        let origin_state = self
            .client
            .execute(LOCAL_STORAGE_DUMP_JS, vec![])
            .await
            .ok()
            .and_then(|v| serde_json::from_value::<OriginState>(v).ok());

        let state = StorageState {
            cookies: cookies.iter().map(StoredCookie::from_cookie).collect(),
            origins: origin_state
                .into_iter()
                .filter(|o| !o.origin.is_empty() && !o.local_storage.is_empty())
                .collect(),
        };
        let data = serde_json::to_string_pretty(&state)?;
        fs::write(path, data).with_context(|| format!("write {}", path.display()))
    }
}

struct WebDriverPage {
    client: Client,
    window: WindowHandle,
    seed: Arc<Mutex<StorageSeed>>,
}

impl WebDriverPage {
    async fn focus(&self) -> Result<()> {
        self.client
            .switch_to_window(self.window.clone())
            .await
            .context("switch to window")
    }

    /// Re-applies seeded cookies and localStorage for the origin we just
    /// landed on. Best-effort; each entry is applied at most once.
    async fn apply_seed(&self) {
        let url = match self.client.current_url().await {
            Ok(url) => url,
            Err(_) => return,
        };
        let host = url.host_str().unwrap_or("").to_string();
        let origin = url.origin().ascii_serialization();
        if host.is_empty() {
            return;
        }

        let (cookies, local_storage) = {
            let mut seed = self.seed.lock().unwrap();
            let cookies: Vec<StoredCookie> = seed
                .pending_cookies
                .iter()
                .filter(|c| c.matches_host(&host))
                .cloned()
                .collect();
            seed.pending_cookies.retain(|c| !c.matches_host(&host));
            let local_storage = seed.pending_origins.remove(&origin);
            (cookies, local_storage)
        };

        for stored in cookies {
            if let Err(e) = self.client.add_cookie(stored.to_cookie()).await {
                debug!("seed cookie {} skipped: {}", stored.name, e);
            }
        }
        if let Some(items) = local_storage {
            let args = vec![serde_json::to_value(&items).unwrap_or_default()];
            if let Err(e) = self.client.execute(LOCAL_STORAGE_SET_JS, args).await {
                debug!("seed localStorage skipped: {}", e);
            }
        }
    }

    async fn click_by_text(&self, text: &str) -> Result<()> {
        let clicked = self
            .client
            .execute(CLICK_BY_TEXT_JS, vec![json!(text)])
            .await?
            .as_bool()
            .unwrap_or(false);
        if clicked {
            return Ok(());
        }
        if let Some(suggestion) = self.suggest_text(text).await {
            return Err(anyhow!(
                "no match for text={:?}. did you mean {:?}?",
                text,
                suggestion
            ));
        }
        Err(anyhow!("no match for text={:?}", text))
    }

    /// Nearest candidate among visible interactive elements, by
    /// normalized-whitespace lowercase Levenshtein distance.
    async fn suggest_text(&self, text: &str) -> Option<String> {
        let value = self.client.execute(SUGGEST_CANDIDATES_JS, vec![]).await.ok()?;
        let candidates: Vec<String> = serde_json::from_value(value).ok()?;
        let query = normalize_text(text);
        if query.is_empty() {
            return None;
        }
        let mut best: Option<(usize, String)> = None;
        for candidate in candidates {
            let normalized = normalize_text(&candidate);
            if normalized.is_empty() {
                continue;
            }
            let score = levenshtein_distance(&query, &normalized);
            match &best {
                Some((best_score, _)) if *best_score <= score => {}
                _ => best = Some((score, candidate)),
            }
        }
        best.map(|(_, candidate)| candidate)
    }
}

#[async_trait]
impl Page for WebDriverPage {
    async fn goto(&self, url: &str) -> Result<()> {
        self.focus().await?;
        self.client.goto(url).await.context("navigate")?;
        self.apply_seed().await;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.focus().await?;
        if let Some(text) = selector.strip_prefix("text=") {
            return self.click_by_text(text).await;
        }
        let css = selector.strip_prefix("css=").unwrap_or(selector);
        let element = self
            .client
            .find(Locator::Css(css))
            .await
            .with_context(|| format!("find {}", css))?;
        element.click().await.context("click")?;
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        self.focus().await?;
        let css = selector.strip_prefix("css=").unwrap_or(selector);
        let element = self
            .client
            .find(Locator::Css(css))
            .await
            .with_context(|| format!("find {}", css))?;
        element.clear().await.context("clear input")?;
        element.send_keys(value).await.context("type value")?;
        Ok(())
    }

    async fn screenshot(&self, path: &Path, full_page: bool, selector: &str) -> Result<()> {
        self.focus().await?;
        let bytes = if !selector.is_empty() {
            let css = selector.strip_prefix("css=").unwrap_or(selector);
            self.client
                .find(Locator::Css(css))
                .await
                .with_context(|| format!("find {}", css))?
                .screenshot()
                .await?
        } else if full_page {
            // the document root captures the full page height on engines
            // that support element screenshots beyond the viewport
            self.client
                .find(Locator::Css("html"))
                .await?
                .screenshot()
                .await?
        } else {
            self.client.screenshot().await?
        };
        fs::write(path, bytes).with_context(|| format!("write {}", path.display()))
    }

    async fn extract(&self, options: ExtractOptions) -> Result<ExtractResult> {
        self.focus().await?;
        let value = self
            .client
            .execute(
                EXTRACT_JS,
                vec![json!(options.selector), json!(options.main)],
            )
            .await
            .context("run extract script")?;
        serde_json::from_value(value).context("decode extract result")
    }

    async fn links(&self, filter: &str) -> Result<Vec<Link>> {
        self.focus().await?;
        let value = self
            .client
            .execute(LINKS_JS, vec![json!(filter)])
            .await
            .context("run links script")?;
        serde_json::from_value(value).context("decode links")
    }

    async fn set_timeout(&self, ms: u64) -> Result<()> {
        if ms == 0 {
            return Ok(());
        }
        let d = Duration::from_millis(ms);
        self.client
            .update_timeouts(TimeoutConfiguration::new(Some(d), Some(d), Some(d)))
            .await
            .context("set timeouts")
    }

    async fn eval(&self, js: &str) -> Result<serde_json::Value> {
        self.focus().await?;
        self.client
            .execute(js, vec![])
            .await
            .context("execute script")
    }

    async fn url(&self) -> Result<String> {
        self.focus().await?;
        Ok(self.client.current_url().await?.to_string())
    }

    async fn title(&self) -> Result<String> {
        self.focus().await?;
        let value = self
            .client
            .execute("return document.title || \"\";", vec![])
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn close(&self) -> Result<()> {
        self.focus().await?;
        self.client.close_window().await.context("close window")
    }
}

/// On-disk shape of `storage.json`
#[derive(Debug, Default, Serialize, Deserialize)]
struct StorageState {
    #[serde(default)]
    cookies: Vec<StoredCookie>,
    #[serde(default)]
    origins: Vec<OriginState>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredCookie {
    name: String,
    value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(default)]
    secure: bool,
    #[serde(default)]
    http_only: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct OriginState {
    #[serde(default)]
    origin: String,
    #[serde(default)]
    local_storage: std::collections::BTreeMap<String, String>,
}

impl StoredCookie {
    fn from_cookie(cookie: &Cookie<'static>) -> Self {
        StoredCookie {
            name: cookie.name().to_string(),
            value: cookie.value().to_string(),
            domain: cookie.domain().map(|d| d.to_string()),
            path: cookie.path().map(|p| p.to_string()),
            secure: cookie.secure().unwrap_or(false),
            http_only: cookie.http_only().unwrap_or(false),
        }
    }

    fn to_cookie(&self) -> Cookie<'static> {
        let mut cookie = Cookie::new(self.name.clone(), self.value.clone());
        if let Some(domain) = &self.domain {
            cookie.set_domain(domain.clone());
        }
        if let Some(path) = &self.path {
            cookie.set_path(path.clone());
        }
        cookie.set_secure(self.secure);
        cookie.set_http_only(self.http_only);
        cookie
    }

    fn matches_host(&self, host: &str) -> bool {
        match &self.domain {
            None => true,
            Some(domain) => {
                let domain = domain.trim_start_matches('.');
                host == domain || host.ends_with(&format!(".{}", domain))
            }
        }
    }
}

/// Seed state parsed from `storage.json`; entries are consumed as pages
/// navigate into matching hosts/origins.
#[derive(Debug, Default)]
struct StorageSeed {
    pending_cookies: Vec<StoredCookie>,
    pending_origins: std::collections::BTreeMap<String, std::collections::BTreeMap<String, String>>,
}

fn load_seed(path: &Path) -> StorageSeed {
    let state: StorageState = match fs::read(path)
        .ok()
        .and_then(|data| serde_json::from_slice(&data).ok())
    {
        Some(state) => state,
        None => {
            warn!("ignoring unreadable storage state {}", path.display());
            return StorageSeed::default();
        }
    };
    StorageSeed {
        pending_cookies: state.cookies,
        pending_origins: state
            .origins
            .into_iter()
            .map(|o| (o.origin, o.local_storage))
            .collect(),
    }
}

/// Collapse whitespace, lowercase. `"Sign In"` and `"sign   in"` compare
/// identically.
pub fn normalize_text(s: &str) -> String {
    s.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut cur = vec![i + 1; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            cur[j + 1] = (prev[j + 1] + 1).min(cur[j] + 1).min(prev[j] + cost);
        }
        prev = cur;
    }
    prev[b.len()]
}

const CLICK_BY_TEXT_JS: &str = r#"
const norm = (s) => String(s || "").toLowerCase().split(/\s+/).filter(Boolean).join(" ");
const q = norm(arguments[0]);
if (!q) return false;
const textOf = (el) => el.innerText || el.value || (el.getAttribute && el.getAttribute("aria-label")) || "";
const els = Array.from(document.querySelectorAll(
  "a,button,[role=button],input[type=submit],input[type=button],label,[aria-label]"));
let target = els.find(el => norm(textOf(el)) === q);
if (!target) target = els.find(el => norm(textOf(el)).includes(q));
if (!target) return false;
target.click();
return true;
"#;

const SUGGEST_CANDIDATES_JS: &str = r#"
const candidates = new Set();
const push = (t) => {
  if (!t) return;
  const v = String(t).trim();
  if (v) candidates.add(v);
};
document.querySelectorAll(
  "a,button,[role=button],input[type=submit],input[type=button],label,[aria-label]"
).forEach(el => {
  push(el.innerText);
  if (el.getAttribute) push(el.getAttribute("aria-label"));
  if (el.value) push(el.value);
});
return Array.from(candidates).slice(0, 200);
"#;

const EXTRACT_JS: &str = r#"
const selector = arguments[0] ? String(arguments[0]) : "";
const main = !!arguments[1];
const pickRoot = () => {
  if (selector) return document.querySelector(selector);
  if (!main) return document.body;
  const preferred = document.querySelector("[role=main]")
    || document.querySelector("main")
    || document.querySelector("article");
  if (preferred) return preferred;
  const candidates = Array.from(document.querySelectorAll(
    "main, article, [role=main], #content, .content, .docs-content, .markdown, .markdown-body, section"));
  let best = null;
  let bestLen = 0;
  for (const el of candidates) {
    const len = (el.textContent || "").trim().length;
    if (len > bestLen) {
      bestLen = len;
      best = el;
    }
  }
  return best || document.body;
};
let root = pickRoot();
let text = root ? (root.innerText || root.textContent || "") : "";
if (main && (!text || !text.trim()) && root !== document.body) {
  root = document.body;
  text = root ? (root.innerText || root.textContent || "") : "";
}
const links = Array.from(document.querySelectorAll("a"))
  .map(a => ({ text: a.innerText || "", href: a.href || "" }));
const buttons = Array.from(document.querySelectorAll("button, [role=button]"))
  .map(b => ({ text: b.innerText || "" }));
const inputs = Array.from(document.querySelectorAll("input, textarea, select")).map(i => ({
  label: i.labels && i.labels.length ? i.labels[0].innerText || "" : "",
  name: i.name || "",
  type: i.type || i.tagName.toLowerCase(),
}));
const meta = {};
document.querySelectorAll("meta[name]").forEach(m => { meta[m.name] = m.content || ""; });
return { url: location.href, title: document.title || "", text, links, buttons, inputs, meta };
"#;

const LINKS_JS: &str = r#"
const filter = arguments[0] ? String(arguments[0]).toLowerCase() : "";
const links = Array.from(document.querySelectorAll("a")).map(a => ({
  text: (a.innerText || "").trim(),
  href: a.href || ""
})).filter(l => l.text && l.href);
if (!filter) return links;
return links.filter(l => l.text.toLowerCase().includes(filter));
"#;

const LOCAL_STORAGE_DUMP_JS: &str = r#"
const items = {};
try {
  for (let i = 0; i < localStorage.length; i++) {
    const k = localStorage.key(i);
    items[k] = localStorage.getItem(k);
  }
} catch (e) {}
return { origin: location.origin || "", local_storage: items };
"#;

const LOCAL_STORAGE_SET_JS: &str = r#"
const items = arguments[0] || {};
try {
  for (const k in items) { localStorage.setItem(k, items[k]); }
} catch (e) {}
"#;

#[cfg(test)]
#[path = "webdriver_test.rs"]
mod webdriver_test;
