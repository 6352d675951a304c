//! Fake engine for tests.
//!
//! Records every invocation behind shared handles so tests can inspect
//! state after the session has moved into a server, and lets tests
//! program results for eval, extract and links.

use super::{Engine, ExtractOptions, ExtractResult, Link, Page, Session, StartOptions};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct FakeEngine {
    session: FakeSessionHandle,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> FakeSessionHandle {
        self.session.clone()
    }
}

#[async_trait]
impl Engine for FakeEngine {
    async fn start(&self, opts: StartOptions) -> Result<Box<dyn Session>> {
        {
            let mut state = self.session.0.lock().unwrap();
            state.start_options = Some(opts);
        }
        Ok(Box::new(FakeSession {
            handle: self.session.clone(),
        }))
    }
}

#[derive(Clone, Default)]
pub struct FakeSessionHandle(Arc<Mutex<FakeSessionState>>);

#[derive(Default)]
pub struct FakeSessionState {
    pub start_options: Option<StartOptions>,
    pub pages: Vec<FakePageHandle>,
    pub closed: bool,
    pub storage_writes: Vec<PathBuf>,
}

impl FakeSessionHandle {
    pub fn page_count(&self) -> usize {
        self.0.lock().unwrap().pages.len()
    }

    pub fn page(&self, index: usize) -> FakePageHandle {
        self.0.lock().unwrap().pages[index].clone()
    }

    pub fn closed(&self) -> bool {
        self.0.lock().unwrap().closed
    }

    pub fn storage_writes(&self) -> Vec<PathBuf> {
        self.0.lock().unwrap().storage_writes.clone()
    }

    pub fn start_options(&self) -> Option<StartOptions> {
        self.0.lock().unwrap().start_options.clone()
    }
}

struct FakeSession {
    handle: FakeSessionHandle,
}

#[async_trait]
impl Session for FakeSession {
    async fn new_page(&mut self) -> Result<Box<dyn Page>> {
        let page = FakePageHandle::default();
        let mut state = self.handle.0.lock().unwrap();
        state.pages.push(page.clone());
        Ok(Box::new(FakePage { handle: page }))
    }

    async fn close(&mut self) -> Result<()> {
        self.handle.0.lock().unwrap().closed = true;
        Ok(())
    }

    async fn storage_state(&self, path: &Path) -> Result<()> {
        self.handle
            .0
            .lock()
            .unwrap()
            .storage_writes
            .push(path.to_path_buf());
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct FakePageHandle(Arc<Mutex<FakePageState>>);

#[derive(Default)]
pub struct FakePageState {
    pub url: String,
    pub title: String,
    pub gotos: Vec<String>,
    pub clicks: Vec<String>,
    pub fills: Vec<(String, String)>,
    pub shots: Vec<PathBuf>,
    pub evals: Vec<String>,
    pub timeout_ms: u64,
    pub closed: bool,
    pub eval_result: Option<serde_json::Value>,
    pub extract_result: Option<ExtractResult>,
    pub links_result: Vec<Link>,
    /// Artificial latency for eval, for overlap instrumentation
    pub eval_delay_ms: u64,
    in_flight: bool,
    overlapped: bool,
}

impl FakePageHandle {
    pub fn url_value(&self) -> String {
        self.0.lock().unwrap().url.clone()
    }

    pub fn set_title(&self, title: &str) {
        self.0.lock().unwrap().title = title.to_string();
    }

    pub fn clicks(&self) -> Vec<String> {
        self.0.lock().unwrap().clicks.clone()
    }

    pub fn fills(&self) -> Vec<(String, String)> {
        self.0.lock().unwrap().fills.clone()
    }

    pub fn shots(&self) -> Vec<PathBuf> {
        self.0.lock().unwrap().shots.clone()
    }

    pub fn evals(&self) -> Vec<String> {
        self.0.lock().unwrap().evals.clone()
    }

    pub fn timeout_ms(&self) -> u64 {
        self.0.lock().unwrap().timeout_ms
    }

    pub fn closed(&self) -> bool {
        self.0.lock().unwrap().closed
    }

    pub fn set_eval_result(&self, value: serde_json::Value) {
        self.0.lock().unwrap().eval_result = Some(value);
    }

    pub fn set_extract_result(&self, result: ExtractResult) {
        self.0.lock().unwrap().extract_result = Some(result);
    }

    pub fn set_links_result(&self, links: Vec<Link>) {
        self.0.lock().unwrap().links_result = links;
    }

    pub fn set_eval_delay_ms(&self, ms: u64) {
        self.0.lock().unwrap().eval_delay_ms = ms;
    }

    /// True when two calls were ever observed inside the page at once
    pub fn overlapped(&self) -> bool {
        self.0.lock().unwrap().overlapped
    }
}

struct FakePage {
    handle: FakePageHandle,
}

#[async_trait]
impl Page for FakePage {
    async fn goto(&self, url: &str) -> Result<()> {
        let mut state = self.handle.0.lock().unwrap();
        state.url = url.to_string();
        state.gotos.push(url.to_string());
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.handle.0.lock().unwrap().clicks.push(selector.to_string());
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        self.handle
            .0
            .lock()
            .unwrap()
            .fills
            .push((selector.to_string(), value.to_string()));
        Ok(())
    }

    async fn screenshot(&self, path: &Path, _full_page: bool, _selector: &str) -> Result<()> {
        self.handle.0.lock().unwrap().shots.push(path.to_path_buf());
        Ok(())
    }

    async fn extract(&self, _options: ExtractOptions) -> Result<ExtractResult> {
        let state = self.handle.0.lock().unwrap();
        if let Some(result) = &state.extract_result {
            return Ok(result.clone());
        }
        Ok(ExtractResult {
            url: state.url.clone(),
            title: state.title.clone(),
            ..Default::default()
        })
    }

    async fn links(&self, _filter: &str) -> Result<Vec<Link>> {
        Ok(self.handle.0.lock().unwrap().links_result.clone())
    }

    async fn set_timeout(&self, ms: u64) -> Result<()> {
        self.handle.0.lock().unwrap().timeout_ms = ms;
        Ok(())
    }

    async fn eval(&self, js: &str) -> Result<serde_json::Value> {
        let delay = {
            let mut state = self.handle.0.lock().unwrap();
            state.evals.push(js.to_string());
            if state.in_flight {
                state.overlapped = true;
            }
            state.in_flight = true;
            state.eval_delay_ms
        };
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }
        let mut state = self.handle.0.lock().unwrap();
        state.in_flight = false;
        match &state.eval_result {
            Some(value) => Ok(value.clone()),
            None => bail!("no eval result"),
        }
    }

    async fn url(&self) -> Result<String> {
        Ok(self.handle.0.lock().unwrap().url.clone())
    }

    async fn title(&self) -> Result<String> {
        Ok(self.handle.0.lock().unwrap().title.clone())
    }

    async fn close(&self) -> Result<()> {
        self.handle.0.lock().unwrap().closed = true;
        Ok(())
    }
}
