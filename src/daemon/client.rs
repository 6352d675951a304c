//! Client stub: one dedicated connection, strictly in-order framed
//! request/response. The id echo is a sanity check, not a demultiplexer.

use crate::browser::Link;
use crate::daemon::protocol::*;
use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    pub async fn connect(socket_path: &Path) -> Result<Client> {
        let stream = UnixStream::connect(socket_path)
            .await
            .with_context(|| format!("connect {}", socket_path.display()))?;
        let (read, writer) = stream.into_split();
        Ok(Client {
            reader: BufReader::new(read),
            writer,
        })
    }

    /// Sends one request and waits for its response. Errors carry the
    /// server's `error.message` verbatim.
    pub async fn call(&mut self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
        let id = id.to_string();
        let req = Request {
            id: id.clone(),
            method: method.to_string(),
            params,
        };
        let mut payload = serde_json::to_vec(&req)?;
        payload.push(b'\n');
        self.writer
            .write_all(&payload)
            .await
            .context("send request")?;

        let mut line = String::new();
        let n = self
            .reader
            .read_line(&mut line)
            .await
            .context("read response")?;
        if n == 0 {
            bail!("daemon closed the connection");
        }
        let resp: Response = serde_json::from_str(&line).context("decode response")?;
        if resp.id != id {
            bail!("response id mismatch: sent {}, got {}", id, resp.id);
        }
        if let Some(err) = resp.error {
            bail!("{}", err.message);
        }
        Ok(resp.result.unwrap_or(Value::Null))
    }

    async fn call_as<P: Serialize, R: DeserializeOwned>(
        &mut self,
        method: &str,
        params: Option<P>,
    ) -> Result<R> {
        let params = match params {
            Some(p) => Some(serde_json::to_value(p)?),
            None => None,
        };
        let value = self.call(method, params).await?;
        serde_json::from_value(value).with_context(|| format!("decode {} result", method))
    }

    pub async fn status(&mut self) -> Result<StatusResult> {
        self.call_as::<Value, _>("Status", None).await
    }

    pub async fn tab_list(&mut self) -> Result<Vec<TabInfo>> {
        self.call_as::<Value, _>("TabList", None).await
    }

    pub async fn tab_new(&mut self, url: &str) -> Result<TabInfo> {
        self.call_as(
            "TabNew",
            Some(TabNewParams {
                url: url.to_string(),
            }),
        )
        .await
    }

    pub async fn tab_switch(&mut self, tab: u64) -> Result<()> {
        self.call("TabSwitch", Some(serde_json::to_value(TabSwitchParams { tab })?))
            .await?;
        Ok(())
    }

    pub async fn tab_close(&mut self, tab: u64) -> Result<()> {
        self.call("TabClose", Some(serde_json::to_value(TabCloseParams { tab })?))
            .await?;
        Ok(())
    }

    pub async fn goto(&mut self, tab: u64, url: &str, timeout_ms: u64) -> Result<()> {
        self.call(
            "Goto",
            Some(serde_json::to_value(GotoParams {
                tab,
                url: url.to_string(),
                timeout_ms,
            })?),
        )
        .await?;
        Ok(())
    }

    pub async fn click(&mut self, tab: u64, selector: &str, timeout_ms: u64) -> Result<()> {
        self.call(
            "Click",
            Some(serde_json::to_value(ClickParams {
                tab,
                selector: selector.to_string(),
                timeout_ms,
            })?),
        )
        .await?;
        Ok(())
    }

    pub async fn fill(
        &mut self,
        tab: u64,
        selector: &str,
        value: &str,
        timeout_ms: u64,
    ) -> Result<()> {
        self.call(
            "Fill",
            Some(serde_json::to_value(FillParams {
                tab,
                selector: selector.to_string(),
                value: value.to_string(),
                timeout_ms,
            })?),
        )
        .await?;
        Ok(())
    }

    pub async fn shot(
        &mut self,
        tab: u64,
        path: &str,
        full_page: bool,
        selector: &str,
        timeout_ms: u64,
    ) -> Result<()> {
        self.call(
            "Shot",
            Some(serde_json::to_value(ShotParams {
                tab,
                path: path.to_string(),
                full_page,
                selector: selector.to_string(),
                timeout_ms,
            })?),
        )
        .await?;
        Ok(())
    }

    /// Raw extract result, so `--json` can print it untouched.
    pub async fn extract(
        &mut self,
        tab: u64,
        selector: &str,
        main: bool,
        timeout_ms: u64,
    ) -> Result<Value> {
        self.call(
            "Extract",
            Some(serde_json::to_value(ExtractParams {
                tab,
                selector: selector.to_string(),
                main,
                timeout_ms,
            })?),
        )
        .await
    }

    pub async fn eval(&mut self, tab: u64, js: &str, timeout_ms: u64) -> Result<Value> {
        self.call(
            "Eval",
            Some(serde_json::to_value(EvalParams {
                tab,
                js: js.to_string(),
                timeout_ms,
            })?),
        )
        .await
    }

    pub async fn url(&mut self, tab: u64) -> Result<String> {
        self.call_as("URL", Some(UrlParams { tab })).await
    }

    pub async fn links(&mut self, tab: u64, filter: &str) -> Result<Vec<Link>> {
        self.call_as(
            "Links",
            Some(LinksParams {
                tab,
                filter: filter.to_string(),
            }),
        )
        .await
    }

    pub async fn stop(&mut self) -> Result<()> {
        self.call("Stop", None).await?;
        Ok(())
    }
}
