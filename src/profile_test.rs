use super::*;

fn test_store() -> (tempfile::TempDir, Store) {
    let dir = tempfile::tempdir().unwrap();
    let store = Store {
        root: dir.path().join("profiles"),
        default_ttl: Duration::from_secs(14 * 24 * 3600),
    };
    (dir, store)
}

#[test]
fn upsert_creates_with_defaults_and_sanitized_name() {
    let (_dir, store) = test_store();
    let (profile, created) = store.upsert("Alice", &Overrides::default()).unwrap();
    assert!(created);
    assert_eq!(profile.name, "alice");
    assert_eq!(profile.browser, "chromium");
    assert_eq!(profile.channel, "chrome");
    assert!(profile.headless);
    assert_eq!(profile.ttl_seconds, 14 * 24 * 3600);
    assert!(profile.created_at <= profile.last_used);

    // file lookups work through the sanitized name
    let loaded = store.load("  Alice ").unwrap();
    assert_eq!(loaded, profile);
}

#[test]
fn upsert_sanitizes_spaces() {
    let (_dir, store) = test_store();
    let (profile, _) = store.upsert("My Work Stuff", &Overrides::default()).unwrap();
    assert_eq!(profile.name, "my-work-stuff");
    assert!(store.profile_path("my-work-stuff").exists());
}

#[test]
fn upsert_empty_name_is_an_error() {
    let (_dir, store) = test_store();
    assert!(store.upsert("   ", &Overrides::default()).is_err());
}

#[test]
fn upsert_is_idempotent_on_disk() {
    let (_dir, store) = test_store();
    let overrides = Overrides {
        browser: Some("firefox".to_string()),
        ..Default::default()
    };
    store.upsert("x", &overrides).unwrap();
    let first = fs::read_to_string(store.profile_path("x")).unwrap();

    let (profile, created) = store.upsert("x", &overrides).unwrap();
    assert!(!created);
    assert_eq!(profile.browser, "firefox");
    let second = fs::read_to_string(store.profile_path("x")).unwrap();
    assert_eq!(first, second);
}

#[test]
fn overrides_only_touch_set_fields() {
    let (_dir, store) = test_store();
    store
        .upsert(
            "x",
            &Overrides {
                browser: Some("firefox".to_string()),
                headless: Some(false),
                ..Default::default()
            },
        )
        .unwrap();

    // headless=None must not overwrite the stored false
    let (profile, _) = store
        .upsert(
            "x",
            &Overrides {
                channel: Some("beta".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(profile.browser, "firefox");
    assert_eq!(profile.channel, "beta");
    assert!(!profile.headless);

    // headless=Some(true) is distinguishable from unset
    let (profile, _) = store
        .upsert(
            "x",
            &Overrides {
                headless: Some(true),
                ..Default::default()
            },
        )
        .unwrap();
    assert!(profile.headless);
}

#[test]
fn touch_preserves_everything_but_last_used() {
    let (_dir, store) = test_store();
    let (before, _) = store.upsert("x", &Overrides::default()).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(10));
    let after = store.touch("x").unwrap();
    assert!(after.last_used > before.last_used);
    assert_eq!(after.created_at, before.created_at);
    assert_eq!(after.browser, before.browser);
    assert_eq!(after.ttl_seconds, before.ttl_seconds);
}

#[test]
fn list_is_sorted_and_skips_unreadable_entries() {
    let (_dir, store) = test_store();
    store.upsert("beta", &Overrides::default()).unwrap();
    store.upsert("alpha", &Overrides::default()).unwrap();

    // a directory without profile.json is skipped, as is garbage metadata
    fs::create_dir_all(store.root.join("empty")).unwrap();
    fs::create_dir_all(store.root.join("garbage")).unwrap();
    fs::write(store.root.join("garbage").join("profile.json"), "not json").unwrap();

    let names: Vec<String> = store.list().unwrap().into_iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["alpha", "beta"]);
}

#[test]
fn list_on_missing_root_is_empty() {
    let (_dir, store) = test_store();
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn expiry_boundary() {
    let (_dir, store) = test_store();
    let (mut profile, _) = store.upsert("x", &Overrides::default()).unwrap();

    profile.ttl_seconds = 0;
    assert!(!store.is_expired(&profile));

    profile.ttl_seconds = 1;
    profile.last_used = Utc::now();
    assert!(!store.is_expired(&profile));

    profile.last_used = Utc::now() - chrono::Duration::seconds(2);
    assert!(store.is_expired(&profile));

    // touch strictly shrinks now - last_used
    store.save(&profile).unwrap();
    let touched = store.touch("x").unwrap();
    assert!(!store.is_expired(&touched));
}

#[test]
fn prune_removes_exactly_the_expired() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store {
        root: dir.path().to_path_buf(),
        default_ttl: Duration::from_secs(1),
    };
    store.upsert("x", &Overrides::default()).unwrap();
    store
        .upsert(
            "keep",
            &Overrides {
                ttl: Some(Duration::from_secs(3600)),
                ..Default::default()
            },
        )
        .unwrap();

    // rewind x's last_used past its 1s ttl
    let mut expired = store.load("x").unwrap();
    expired.last_used = Utc::now() - chrono::Duration::seconds(2);
    store.save(&expired).unwrap();

    let removed: Vec<String> = store.prune().unwrap().into_iter().map(|p| p.name).collect();
    assert_eq!(removed, vec!["x"]);
    assert!(!store.profile_dir("x").exists());
    assert!(store.profile_dir("keep").exists());
}

#[test]
fn remove_is_recursive_and_tolerates_missing() {
    let (_dir, store) = test_store();
    store.upsert("x", &Overrides::default()).unwrap();
    fs::write(store.profile_dir("x").join("storage.json"), "{}").unwrap();
    store.remove("x").unwrap();
    assert!(!store.profile_dir("x").exists());
    store.remove("x").unwrap();
    assert!(store.remove("").is_err());
}

#[test]
fn format_ttl_strings() {
    assert_eq!(format_ttl(0), "never");
    assert_eq!(format_ttl(-5), "never");
    assert_eq!(format_ttl(90), "1m 30s");
}
