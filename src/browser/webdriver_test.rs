use super::*;

#[test]
fn normalize_collapses_whitespace_and_case() {
    assert_eq!(normalize_text("Sign In"), "sign in");
    assert_eq!(normalize_text("sign   in"), "sign in");
    assert_eq!(normalize_text("  Sign\n\tIn "), "sign in");
    assert_eq!(normalize_text(""), "");
    assert_eq!(normalize_text("Sign In"), normalize_text("sign   in"));
}

#[test]
fn levenshtein_basics() {
    assert_eq!(levenshtein_distance("", ""), 0);
    assert_eq!(levenshtein_distance("abc", "abc"), 0);
    assert_eq!(levenshtein_distance("", "abc"), 3);
    assert_eq!(levenshtein_distance("abc", ""), 3);
    assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
    assert_eq!(levenshtein_distance("sign in", "sign up"), 2);
}

#[test]
fn stored_cookie_host_matching() {
    let mut cookie = StoredCookie {
        name: "session".to_string(),
        value: "abc".to_string(),
        ..Default::default()
    };
    assert!(cookie.matches_host("example.com"));

    cookie.domain = Some(".example.com".to_string());
    assert!(cookie.matches_host("example.com"));
    assert!(cookie.matches_host("app.example.com"));
    assert!(!cookie.matches_host("example.org"));
    assert!(!cookie.matches_host("badexample.com"));

    cookie.domain = Some("example.com".to_string());
    assert!(cookie.matches_host("example.com"));
    assert!(cookie.matches_host("app.example.com"));
}

#[test]
fn storage_state_round_trips() {
    let state = StorageState {
        cookies: vec![StoredCookie {
            name: "session".to_string(),
            value: "abc".to_string(),
            domain: Some("example.com".to_string()),
            path: Some("/".to_string()),
            secure: true,
            http_only: true,
        }],
        origins: vec![OriginState {
            origin: "https://example.com".to_string(),
            local_storage: [("theme".to_string(), "dark".to_string())].into(),
        }],
    };
    let data = serde_json::to_string(&state).unwrap();
    let back: StorageState = serde_json::from_str(&data).unwrap();
    assert_eq!(back.cookies.len(), 1);
    assert_eq!(back.cookies[0].name, "session");
    assert!(back.cookies[0].secure);
    assert_eq!(back.origins[0].local_storage["theme"], "dark");
}

#[test]
fn load_seed_tolerates_garbage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.json");
    fs::write(&path, "not json").unwrap();
    let seed = load_seed(&path);
    assert!(seed.pending_cookies.is_empty());
    assert!(seed.pending_origins.is_empty());
}

#[test]
fn driver_command_mapping() {
    use super::super::driver::driver_command;
    assert_eq!(driver_command("chromium").unwrap(), "chromedriver");
    assert_eq!(driver_command("").unwrap(), "chromedriver");
    assert_eq!(driver_command("firefox").unwrap(), "geckodriver");
    assert_eq!(driver_command("webkit").unwrap(), "safaridriver");
    assert!(driver_command("netscape").is_err());
}
