use super::*;

#[test]
fn config_file_overrides_profile_dir_and_ttl() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        "profile_dir = \"/tmp/www-test-root\"\ndefault_ttl = \"1h\"\n",
    )
    .unwrap();

    let mut cfg = Config {
        profile_dir: PathBuf::from("/elsewhere"),
        default_ttl: DEFAULT_TTL,
    };
    apply_config_file(&mut cfg, &path).unwrap();

    assert_eq!(cfg.profile_dir, PathBuf::from("/tmp/www-test-root"));
    assert_eq!(cfg.default_ttl, Duration::from_secs(3600));
}

#[test]
fn config_file_with_missing_keys_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "# nothing configured\n").unwrap();

    let mut cfg = Config {
        profile_dir: PathBuf::from("/elsewhere"),
        default_ttl: DEFAULT_TTL,
    };
    apply_config_file(&mut cfg, &path).unwrap();

    assert_eq!(cfg.profile_dir, PathBuf::from("/elsewhere"));
    assert_eq!(cfg.default_ttl, DEFAULT_TTL);
}

#[test]
fn config_file_with_bad_ttl_keeps_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "default_ttl = \"not-a-duration\"\n").unwrap();

    let mut cfg = Config {
        profile_dir: PathBuf::from("/elsewhere"),
        default_ttl: DEFAULT_TTL,
    };
    apply_config_file(&mut cfg, &path).unwrap();
    assert_eq!(cfg.default_ttl, DEFAULT_TTL);
}

#[test]
fn explicit_override_wins() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = load(Some(dir.path()), Some("30m")).unwrap();
    assert_eq!(cfg.profile_dir, dir.path());
    assert_eq!(cfg.default_ttl, Duration::from_secs(30 * 60));
}

#[test]
fn writable_dir_probe() {
    let dir = tempfile::tempdir().unwrap();
    assert!(is_writable_dir(dir.path()));
    assert!(!is_writable_dir(Path::new("/proc/no-such-dir")));
}
