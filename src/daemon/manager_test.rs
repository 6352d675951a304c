use super::*;

fn test_manager() -> (tempfile::TempDir, Manager) {
    let dir = tempfile::tempdir().unwrap();
    let mgr = Manager::new(dir.path().to_path_buf());
    (dir, mgr)
}

#[test]
fn binary_mismatch_tracks_path_and_mod_time() {
    let (path, mod_time) = current_binary_info().unwrap();
    let mut info = DaemonInfo {
        pid: 1,
        socket: PathBuf::from("/tmp/x.sock"),
        started_at: Utc::now(),
        binary_path: Some(path.clone()),
        binary_mod_time: Some(mod_time),
    };
    assert!(!binary_mismatch(&info));

    info.binary_mod_time = Some(mod_time - chrono::Duration::minutes(1));
    assert!(binary_mismatch(&info));

    info.binary_path = Some(std::env::temp_dir().join("nonexistent-binary"));
    info.binary_mod_time = Some(mod_time);
    assert!(binary_mismatch(&info));

    // missing recorded info never counts as a mismatch
    info.binary_path = None;
    assert!(!binary_mismatch(&info));
}

#[tokio::test]
async fn missing_info_file_means_not_running() {
    let (_dir, mgr) = test_manager();
    assert!(mgr.is_running("ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn dead_pid_is_cleaned_up() {
    let (_dir, mgr) = test_manager();
    fs::create_dir_all(mgr.profile_dir.join("p")).unwrap();
    let info = DaemonInfo {
        // kernel pids top out well below this; the probe must fail
        pid: i32::MAX - 1,
        socket: mgr.socket_path("p"),
        started_at: Utc::now(),
        binary_path: None,
        binary_mod_time: None,
    };
    mgr.save_info("p", &info).unwrap();
    fs::write(mgr.socket_path("p"), b"").unwrap();

    assert!(mgr.is_running("p").await.unwrap().is_none());
    assert!(!mgr.info_path("p").exists());
    assert!(!mgr.socket_path("p").exists());
}

#[tokio::test]
async fn live_pid_with_dead_socket_is_cleaned_up() {
    let (_dir, mgr) = test_manager();
    fs::create_dir_all(mgr.profile_dir.join("p")).unwrap();
    let info = DaemonInfo {
        // our own pid is alive, but nothing listens on the socket
        pid: std::process::id() as i32,
        socket: mgr.socket_path("p"),
        started_at: Utc::now(),
        binary_path: None,
        binary_mod_time: None,
    };
    mgr.save_info("p", &info).unwrap();

    assert!(mgr.is_running("p").await.unwrap().is_none());
    assert!(!mgr.info_path("p").exists());
}

#[test]
fn partial_info_file_reads_as_not_running() {
    let (_dir, mgr) = test_manager();
    fs::create_dir_all(mgr.profile_dir.join("p")).unwrap();
    fs::write(mgr.info_path("p"), "{\"pid\": 12").unwrap();
    assert!(mgr.load_info("p").unwrap().is_none());
}

#[test]
fn daemon_info_round_trips() {
    let (_dir, mgr) = test_manager();
    fs::create_dir_all(mgr.profile_dir.join("p")).unwrap();
    let (path, mod_time) = current_binary_info().unwrap();
    let info = DaemonInfo {
        pid: 4242,
        socket: mgr.socket_path("p"),
        started_at: Utc::now(),
        binary_path: Some(path),
        binary_mod_time: Some(mod_time),
    };
    mgr.save_info("p", &info).unwrap();
    let loaded = mgr.load_info("p").unwrap().unwrap();
    assert_eq!(loaded.pid, 4242);
    assert_eq!(loaded.binary_path, info.binary_path);
    assert_eq!(loaded.binary_mod_time, info.binary_mod_time);
    assert!(!binary_mismatch(&loaded));
}

#[test]
fn ensure_profile_dir_validates() {
    let dir = tempfile::tempdir().unwrap();
    ensure_profile_dir(&dir.path().join("nested").join("root")).unwrap();
    assert!(dir.path().join("nested").join("root").is_dir());
    assert!(ensure_profile_dir(Path::new("")).is_err());
}

#[tokio::test]
async fn running_profiles_skips_non_running_entries() {
    let (_dir, mgr) = test_manager();
    fs::create_dir_all(mgr.profile_dir.join("idle")).unwrap();
    assert!(mgr.running_profiles().await.unwrap().is_empty());
}
