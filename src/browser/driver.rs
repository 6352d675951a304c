//! WebDriver process management.
//!
//! Each browser session owns one driver process, started on a free port
//! and killed when the session closes.

use anyhow::{bail, Context, Result};
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};

pub struct DriverProcess {
    child: Option<Child>,
    pub url: String,
    port: u16,
}

pub async fn launch(browser: &str) -> Result<DriverProcess> {
    let command = driver_command(browser)?;
    let port = find_free_port()?;
    let args: Vec<String> = match command {
        "geckodriver" => vec!["--port".to_string(), port.to_string()],
        "chromedriver" => vec![format!("--port={}", port)],
        "safaridriver" => vec!["-p".to_string(), port.to_string()],
        _ => unreachable!(),
    };

    if !command_exists(command) {
        bail!(
            "{} not found in PATH. Install it:\n\
               macOS: brew install {}\n\
               Linux: download from the official releases",
            command,
            command
        );
    }

    let child = Command::new(command)
        .args(&args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("start {}", command))?;

    let url = format!("http://localhost:{}", port);
    let mut driver = DriverProcess {
        child: Some(child),
        url: url.clone(),
        port,
    };

    // 3 seconds total
    for _ in 0..30 {
        if is_driver_ready(&url).await {
            info!("{} ready on port {}", command, port);
            return Ok(driver);
        }
        sleep(Duration::from_millis(100)).await;
    }
    driver.kill();
    bail!("{} did not become ready within timeout", command)
}

pub fn driver_command(browser: &str) -> Result<&'static str> {
    match browser {
        "chromium" | "" => Ok("chromedriver"),
        "firefox" => Ok("geckodriver"),
        "webkit" => Ok("safaridriver"),
        other => bail!("unknown browser: {}", other),
    }
}

pub fn command_exists(command: &str) -> bool {
    #[cfg(unix)]
    {
        Command::new("which")
            .arg(command)
            .stdout(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        Command::new("where")
            .arg(command)
            .stdout(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

fn find_free_port() -> Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(port)
}

async fn is_driver_ready(url: &str) -> bool {
    let status_url = format!("{}/status", url);
    match reqwest::Client::new()
        .get(&status_url)
        .timeout(Duration::from_secs(1))
        .send()
        .await
    {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}

impl DriverProcess {
    pub fn kill(&mut self) {
        if let Some(mut child) = self.child.take() {
            debug!("stopping webdriver on port {}", self.port);
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for DriverProcess {
    fn drop(&mut self) {
        self.kill();
    }
}
