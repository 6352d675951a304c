//! End-to-end daemon tests over a real Unix socket with the fake engine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::json;
use www::browser::fake::FakeEngine;
use www::browser::{ExtractResult, Link, StartOptions};
use www::daemon::client::Client;
use www::daemon::server::serve_profile;

async fn wait_for_socket(path: &Path) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if std::os::unix::net::UnixStream::connect(path).is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("socket {} never came up", path.display());
}

struct Daemon {
    _dir: tempfile::TempDir,
    socket: PathBuf,
    storage: PathBuf,
    engine: FakeEngine,
    handle: tokio::task::JoinHandle<anyhow::Result<()>>,
}

async fn start_daemon(profile: &str) -> Daemon {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("daemon.sock");
    let storage = dir.path().join("storage.json");
    let engine = FakeEngine::new();
    let handle = tokio::spawn({
        let engine = engine.clone();
        let socket = socket.clone();
        let storage = storage.clone();
        let profile = profile.to_string();
        async move {
            serve_profile(
                &socket,
                &profile,
                &engine,
                StartOptions {
                    browser: "chromium".to_string(),
                    headless: true,
                    storage_in: Some(storage),
                    ..Default::default()
                },
            )
            .await
        }
    });
    wait_for_socket(&socket).await;
    Daemon {
        _dir: dir,
        socket,
        storage,
        engine,
        handle,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn full_session_flow() {
    let daemon = start_daemon("work").await;
    let mut client = Client::connect(&daemon.socket).await.unwrap();

    // the daemon starts with one active tab
    let status = client.status().await.unwrap();
    assert_eq!(status.profile, "work");
    assert_eq!(status.tabs.len(), 1);
    assert!(status.tabs[0].active);

    // drive the initial tab
    client.goto(0, "https://example.com", 5000).await.unwrap();
    client.click(0, "text=Sign in", 0).await.unwrap();
    client.fill(0, "css=#q", "rust", 0).await.unwrap();
    client.shot(0, "/tmp/www-test.png", true, "", 0).await.unwrap();

    let page = daemon.engine.session().page(0);
    assert_eq!(page.url_value(), "https://example.com");
    assert_eq!(page.timeout_ms(), 5000);
    assert_eq!(page.clicks(), vec!["text=Sign in"]);
    assert_eq!(page.fills(), vec![("css=#q".to_string(), "rust".to_string())]);
    assert_eq!(page.shots(), vec![PathBuf::from("/tmp/www-test.png")]);

    // programmed extract flows through untouched
    page.set_extract_result(ExtractResult {
        url: "https://example.com".to_string(),
        title: "Example".to_string(),
        text: "Hello world".to_string(),
        links: vec![Link {
            text: "More".to_string(),
            href: "https://example.com/more".to_string(),
        }],
        ..Default::default()
    });
    let extract = client.extract(0, "", true, 0).await.unwrap();
    assert_eq!(extract["text"], "Hello world");
    assert_eq!(extract["links"][0]["href"], "https://example.com/more");

    // every mutating method persisted the session storage
    let writes = daemon.engine.session().storage_writes();
    assert!(writes.len() >= 5);
    assert!(writes.iter().all(|p| p == &daemon.storage));

    client.stop().await.unwrap();
    daemon.handle.await.unwrap().unwrap();
    assert!(daemon.engine.session().closed());
}

#[tokio::test(flavor = "multi_thread")]
async fn second_tab_and_explicit_targets() {
    let daemon = start_daemon("t").await;
    let mut client = Client::connect(&daemon.socket).await.unwrap();

    let tab = client.tab_new("https://docs.rs").await.unwrap();
    assert_eq!(tab.id, 2);
    assert_eq!(daemon.engine.session().page(1).url_value(), "https://docs.rs");

    // tab 0 resolves to the new active tab; explicit ids still work
    client.goto(0, "https://docs.rs/anyhow", 0).await.unwrap();
    assert_eq!(
        daemon.engine.session().page(1).url_value(),
        "https://docs.rs/anyhow"
    );
    client.goto(1, "https://example.org", 0).await.unwrap();
    assert_eq!(
        daemon.engine.session().page(0).url_value(),
        "https://example.org"
    );

    let tabs = client.tab_list().await.unwrap();
    assert_eq!(tabs.len(), 2);
    assert_eq!(tabs[0].id, 1);
    assert!(!tabs[0].active);
    assert!(tabs[1].active);

    client.stop().await.unwrap();
    daemon.handle.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn eval_returns_opaque_json() {
    let daemon = start_daemon("t").await;
    let mut client = Client::connect(&daemon.socket).await.unwrap();

    daemon
        .engine
        .session()
        .page(0)
        .set_eval_result(json!(["a", "b"]));
    let value = client.eval(0, "return tags();", 0).await.unwrap();
    assert_eq!(value, json!(["a", "b"]));

    client.stop().await.unwrap();
    daemon.handle.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn requests_after_stop_find_the_socket_gone() {
    let daemon = start_daemon("t").await;
    let mut client = Client::connect(&daemon.socket).await.unwrap();
    client.stop().await.unwrap();
    daemon.handle.await.unwrap().unwrap();

    // the daemon is down; the next invocation must not connect silently
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(Client::connect(&daemon.socket).await.is_err() || {
        // the socket file may linger; a dead listener still refuses work
        let mut c = Client::connect(&daemon.socket).await.unwrap();
        c.status().await.is_err()
    });
}
