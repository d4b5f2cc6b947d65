//! Env-file store behavior on real files.

use std::fs;

use tempfile::TempDir;

use dockhand::env_store::EnvStore;

fn store(dir: &TempDir) -> EnvStore {
    EnvStore::new(dir.path().join(".env"))
}

#[test]
fn rewrite_preserves_line_order_and_comments() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(".env"),
        "# deployment settings\nIP=old:3000\n\nTS_AUTH_KEY=secret\nOTHER=x\n",
    )
    .unwrap();
    let store = store(&dir);

    store.set("IP", "10.0.0.5:3000").unwrap();

    let contents = fs::read_to_string(dir.path().join(".env")).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(
        lines,
        vec![
            "# deployment settings",
            "IP=10.0.0.5:3000",
            "",
            "TS_AUTH_KEY=secret",
            "OTHER=x",
        ]
    );
}

#[test]
fn set_twice_leaves_a_single_entry() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);

    store.set("IP", "localhost:3000").unwrap();
    store.set("IP", "localhost:8080").unwrap();

    let contents = fs::read_to_string(dir.path().join(".env")).unwrap();
    let ip_lines: Vec<&str> = contents.lines().filter(|l| l.starts_with("IP=")).collect();
    assert_eq!(ip_lines, vec!["IP=localhost:8080"]);
}

#[test]
fn missing_key_appends_at_end() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".env"), "FIRST=1\n").unwrap();
    let store = store(&dir);

    store.set("SECOND", "2").unwrap();

    let contents = fs::read_to_string(dir.path().join(".env")).unwrap();
    assert_eq!(contents, "FIRST=1\nSECOND=2\n");
}

#[test]
fn get_returns_none_for_missing_file_and_missing_key() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    assert_eq!(store.get("IP").unwrap(), None);

    store.set("IP", "x").unwrap();
    assert_eq!(store.get("NOPE").unwrap(), None);
}

#[test]
fn values_may_contain_equals_signs() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);

    store.set("TS_AUTH_KEY", "tskey-abc=def=").unwrap();
    assert_eq!(
        store.get("TS_AUTH_KEY").unwrap().as_deref(),
        Some("tskey-abc=def=")
    );
}

#[test]
fn values_with_newlines_are_rejected() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);

    assert!(store.set("KEY", "line1\nline2").is_err());
    assert!(store.set("KEY", "line1\rline2").is_err());
    // the file is untouched after a rejected write
    assert!(!dir.path().join(".env").exists());
}

#[test]
fn seed_defaults_only_fills_gaps() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".env"), "TS_AUTH_KEY=existing\n").unwrap();
    let store = store(&dir);

    store
        .seed_defaults(&[("IP", ""), ("TS_AUTH_KEY", "")])
        .unwrap();

    assert_eq!(store.get("TS_AUTH_KEY").unwrap().as_deref(), Some("existing"));
    // IP was missing and got seeded empty
    let contents = fs::read_to_string(dir.path().join(".env")).unwrap();
    assert!(contents.lines().any(|l| l == "IP="));
}

#[test]
fn get_trims_surrounding_whitespace() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".env"), "IP=  10.0.0.1:3000  \n").unwrap();
    let store = store(&dir);
    assert_eq!(store.get("IP").unwrap().as_deref(), Some("10.0.0.1:3000"));
}
