//! Unit tests for interactive shell discovery.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use remote_console::config::InteractiveConfig;
use remote_console::shell::discovery::{candidate_paths, discover, probe};

fn config(program: &str) -> InteractiveConfig {
    InteractiveConfig {
        program: program.to_owned(),
        ..InteractiveConfig::default()
    }
}

fn write_script(path: &Path, body: &str) {
    std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    std::fs::write(path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    let mut perms = std::fs::metadata(path).expect("metadata").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms).expect("chmod");
}

#[test]
fn candidates_follow_search_dir_order() {
    let base = Path::new("/opt/console");
    let paths = candidate_paths(base, &config("adb"));

    assert_eq!(
        paths,
        vec![
            PathBuf::from("/opt/console/adb/adb"),
            PathBuf::from("/opt/console/adb/adb.exe"),
            PathBuf::from("/opt/console/platform-tools/adb"),
            PathBuf::from("/opt/console/platform-tools/adb.exe"),
        ]
    );
}

#[tokio::test]
async fn probe_reports_exit_status() {
    assert!(probe(Path::new("true"), "version").await);
    assert!(!probe(Path::new("false"), "version").await);
    assert!(!probe(Path::new("/definitely/not/here"), "version").await);
}

#[tokio::test]
async fn disabled_config_finds_nothing() {
    let mut cfg = config("true");
    cfg.enabled = false;
    assert_eq!(discover(&cfg, Path::new(".")).await, None);
}

#[tokio::test]
async fn local_directory_wins_over_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let local = dir.path().join("platform-tools").join("true");
    write_script(&local, "exit 0");

    let found = discover(&config("true"), dir.path()).await;
    assert_eq!(found, Some(local));
}

#[tokio::test]
async fn failing_local_candidate_falls_back_to_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_script(&dir.path().join("adb").join("true"), "exit 1");

    let found = discover(&config("true"), dir.path()).await;
    assert_eq!(found, Some(PathBuf::from("true")));
}

#[tokio::test]
async fn missing_program_disables_interactive_mode() {
    let dir = tempfile::tempdir().expect("tempdir");
    let found = discover(&config("definitely-not-a-real-shell-binary"), dir.path()).await;
    assert_eq!(found, None);
}

#[tokio::test]
async fn explicit_path_skips_discovery() {
    let mut cfg = config("adb");
    cfg.path = Some(PathBuf::from("true"));
    assert_eq!(
        discover(&cfg, Path::new("/nowhere")).await,
        Some(PathBuf::from("true"))
    );

    cfg.path = Some(PathBuf::from("false"));
    assert_eq!(discover(&cfg, Path::new("/nowhere")).await, None);
}
