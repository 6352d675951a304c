//! Session server: owns one browser session and a numbered tab registry,
//! serialized behind a single mutex, and serves the RPC protocol on the
//! profile's Unix socket.

use crate::browser::{Engine, ExtractOptions, Page, Session, StartOptions};
use crate::daemon::protocol::*;
use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};

pub struct Server {
    profile: String,
    storage_path: Option<PathBuf>,
    state: Mutex<State>,
    stop: Notify,
}

struct State {
    session: Option<Box<dyn Session>>,
    tabs: BTreeMap<u64, Box<dyn Page>>,
    active_tab: u64,
    next_tab_id: u64,
}

impl Server {
    pub fn new(profile: &str, storage_path: Option<PathBuf>) -> Self {
        Server {
            profile: profile.to_string(),
            storage_path,
            state: Mutex::new(State {
                session: None,
                tabs: BTreeMap::new(),
                active_tab: 0,
                next_tab_id: 1,
            }),
            stop: Notify::new(),
        }
    }

    /// Starts the browser session and registers the initial tab. Any
    /// failure here aborts daemon startup.
    pub async fn init(&self, engine: &dyn Engine, opts: StartOptions) -> Result<()> {
        let mut session = engine.start(opts).await.context("start browser session")?;
        let page = session.new_page().await.context("open initial page")?;
        let mut state = self.state.lock().await;
        state.session = Some(session);
        state.tabs.insert(1, page);
        state.active_tab = 1;
        state.next_tab_id = 2;
        Ok(())
    }

    pub async fn serve(self: Arc<Self>, listener: UnixListener) -> Result<()> {
        loop {
            tokio::select! {
                _ = self.stop.notified() => {
                    info!("stop requested; leaving accept loop");
                    return Ok(());
                }
                accepted = listener.accept() => {
                    let (stream, _) = accepted.context("accept connection")?;
                    let server = Arc::clone(&self);
                    tokio::spawn(async move {
                        server.handle_conn(stream).await;
                    });
                }
            }
        }
    }

    /// Reads requests off one connection until the peer goes away or a
    /// `Stop` is processed. A panicking handler only tears down its own
    /// task, never the accept loop.
    async fn handle_conn(self: Arc<Self>, stream: UnixStream) {
        let (read, mut write) = stream.into_split();
        let mut lines = BufReader::new(read).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                _ => return,
            };
            if line.trim().is_empty() {
                continue;
            }
            let req: Request = match serde_json::from_str(&line) {
                Ok(req) => req,
                Err(e) => {
                    debug!("dropping connection with malformed request: {}", e);
                    return;
                }
            };
            let method = req.method.clone();
            let resp = self.handle_request(req).await;
            let mut payload = match serde_json::to_vec(&resp) {
                Ok(payload) => payload,
                Err(_) => return,
            };
            payload.push(b'\n');
            if write.write_all(&payload).await.is_err() {
                return;
            }
            if method == "Stop" {
                return;
            }
        }
    }

    pub async fn handle_request(&self, req: Request) -> Response {
        match self.dispatch(&req).await {
            Ok(result) => Response {
                id: req.id,
                result,
                error: None,
            },
            Err(e) => Response {
                id: req.id,
                result: None,
                error: Some(RespError {
                    message: format!("{:#}", e),
                }),
            },
        }
    }

    async fn dispatch(&self, req: &Request) -> Result<Option<Value>> {
        let mut state = self.state.lock().await;
        let params = req.params.clone().unwrap_or(Value::Null);

        match req.method.as_str() {
            "Status" => {
                let result = StatusResult {
                    profile: self.profile.clone(),
                    tabs: state.tab_infos().await,
                };
                Ok(Some(serde_json::to_value(result)?))
            }
            "TabList" => Ok(Some(serde_json::to_value(state.tab_infos().await)?)),
            "TabNew" => {
                let p: TabNewParams = parse_params(params)?;
                let info = state.tab_new(&p.url).await?;
                state.persist_storage(&self.storage_path).await;
                Ok(Some(serde_json::to_value(info)?))
            }
            "TabSwitch" => {
                let p: TabSwitchParams = parse_params(params)?;
                state.tab_switch(p.tab)?;
                Ok(None)
            }
            "TabClose" => {
                let p: TabCloseParams = parse_params(params)?;
                state.tab_close(p.tab).await?;
                state.persist_storage(&self.storage_path).await;
                Ok(None)
            }
            "Goto" => {
                let p: GotoParams = parse_params(params)?;
                let page = state.page(p.tab)?;
                apply_timeout(page, p.timeout_ms).await;
                page.goto(&p.url).await?;
                state.persist_storage(&self.storage_path).await;
                Ok(None)
            }
            "Click" => {
                let p: ClickParams = parse_params(params)?;
                let page = state.page(p.tab)?;
                apply_timeout(page, p.timeout_ms).await;
                page.click(&p.selector).await?;
                state.persist_storage(&self.storage_path).await;
                Ok(None)
            }
            "Fill" => {
                let p: FillParams = parse_params(params)?;
                let page = state.page(p.tab)?;
                apply_timeout(page, p.timeout_ms).await;
                page.fill(&p.selector, &p.value).await?;
                state.persist_storage(&self.storage_path).await;
                Ok(None)
            }
            "Shot" => {
                let p: ShotParams = parse_params(params)?;
                let page = state.page(p.tab)?;
                apply_timeout(page, p.timeout_ms).await;
                page.screenshot(Path::new(&p.path), p.full_page, &p.selector)
                    .await?;
                state.persist_storage(&self.storage_path).await;
                Ok(None)
            }
            "Extract" => {
                let p: ExtractParams = parse_params(params)?;
                let page = state.page(p.tab)?;
                apply_timeout(page, p.timeout_ms).await;
                let result = page
                    .extract(ExtractOptions {
                        selector: p.selector.clone(),
                        main: p.main,
                    })
                    .await?;
                state.persist_storage(&self.storage_path).await;
                Ok(Some(serde_json::to_value(result)?))
            }
            "URL" => {
                let p: UrlParams = parse_params(params)?;
                let value = state.page(p.tab)?.url().await?;
                Ok(Some(Value::String(value)))
            }
            "Links" => {
                let p: LinksParams = parse_params(params)?;
                let links = state.page(p.tab)?.links(&p.filter).await?;
                Ok(Some(serde_json::to_value(links)?))
            }
            "Eval" => {
                let p: EvalParams = parse_params(params)?;
                let page = state.page(p.tab)?;
                apply_timeout(page, p.timeout_ms).await;
                let result = page.eval(&p.js).await?;
                state.persist_storage(&self.storage_path).await;
                Ok(Some(result))
            }
            "Stop" => {
                state.persist_storage(&self.storage_path).await;
                state.shutdown().await;
                self.stop.notify_one();
                Ok(None)
            }
            _ => bail!("unknown method"),
        }
    }
}

impl State {
    fn page(&self, tab: u64) -> Result<&dyn Page> {
        let tab = if tab == 0 { self.active_tab } else { tab };
        self.tabs
            .get(&tab)
            .map(|page| page.as_ref())
            .ok_or_else(|| anyhow!("tab not found"))
    }

    async fn tab_infos(&self) -> Vec<TabInfo> {
        let mut infos = Vec::with_capacity(self.tabs.len());
        for (id, page) in &self.tabs {
            infos.push(TabInfo {
                id: *id,
                url: page.url().await.unwrap_or_default(),
                title: page.title().await.unwrap_or_default(),
                active: *id == self.active_tab,
            });
        }
        infos
    }

    async fn tab_new(&mut self, url: &str) -> Result<TabInfo> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| anyhow!("session closed"))?;
        let page = session.new_page().await?;
        let id = self.next_tab_id;
        self.next_tab_id += 1;
        self.tabs.insert(id, page);
        self.active_tab = id;
        if !url.is_empty() {
            if let Some(page) = self.tabs.get(&id) {
                page.goto(url).await?;
            }
        }
        Ok(TabInfo {
            id,
            active: true,
            ..Default::default()
        })
    }

    fn tab_switch(&mut self, tab: u64) -> Result<()> {
        if !self.tabs.contains_key(&tab) {
            bail!("tab not found");
        }
        self.active_tab = tab;
        Ok(())
    }

    async fn tab_close(&mut self, tab: u64) -> Result<()> {
        let page = self.tabs.remove(&tab).ok_or_else(|| anyhow!("tab not found"))?;
        if let Err(e) = page.close().await {
            debug!("closing tab {} reported: {}", tab, e);
        }
        if self.active_tab == tab {
            self.active_tab = self.tabs.keys().next().copied().unwrap_or(0);
        }
        Ok(())
    }

    /// Best-effort: the in-memory state is authoritative, a failed write
    /// must not mask the user-visible result.
    async fn persist_storage(&self, path: &Option<PathBuf>) {
        let (Some(session), Some(path)) = (&self.session, path) else {
            return;
        };
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Err(e) = session.storage_state(path).await {
            debug!("persist storage failed: {}", e);
        }
    }

    async fn shutdown(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.close().await {
                warn!("closing session reported: {}", e);
            }
        }
    }
}

async fn apply_timeout(page: &dyn Page, timeout_ms: u64) {
    if timeout_ms > 0 {
        let _ = page.set_timeout(timeout_ms).await;
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Value) -> Result<T> {
    serde_json::from_value(params).context("invalid params")
}

/// Daemon entry: binds the profile socket (replacing a stale socket file)
/// and serves until `Stop`.
pub async fn serve_profile(
    socket_path: &Path,
    profile: &str,
    engine: &dyn Engine,
    opts: StartOptions,
) -> Result<()> {
    if let Some(parent) = socket_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }

    let server = Arc::new(Server::new(profile, opts.storage_in.clone()));
    server.init(engine, opts).await?;

    // a previous daemon may have died without unlinking its socket; a
    // live daemon would have been detected before we were spawned
    match fs::remove_file(socket_path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            server.state.lock().await.shutdown().await;
            return Err(e).with_context(|| format!("unlink {}", socket_path.display()));
        }
    }

    let listener = match UnixListener::bind(socket_path) {
        Ok(listener) => listener,
        Err(e) => {
            server.state.lock().await.shutdown().await;
            return Err(e).with_context(|| format!("bind {}", socket_path.display()));
        }
    };
    info!("serving profile {} on {}", profile, socket_path.display());
    server.serve(listener).await
}

#[cfg(test)]
#[path = "server_test.rs"]
mod server_test;
