use serial_test::serial;
use site_hook::config::{Config, load_env_file};
use site_hook::error::HookError;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[test]
#[serial]
fn env_file_values_land_in_process_environment() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("env");
    fs::write(&path, "SITE_HOOK_TEST_A=1\nSITE_HOOK_TEST_B=2\n").unwrap();

    let applied = load_env_file(&path).unwrap();

    assert_eq!(applied, 2);
    assert_eq!(std::env::var("SITE_HOOK_TEST_A").unwrap(), "1");
    assert_eq!(std::env::var("SITE_HOOK_TEST_B").unwrap(), "2");
}

#[test]
#[serial]
fn malformed_line_sets_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("env");
    fs::write(
        &path,
        "SITE_HOOK_TEST_BEFORE=1\nBADLINE\nSITE_HOOK_TEST_AFTER=2\n",
    )
    .unwrap();

    let err = load_env_file(&path).unwrap_err();

    assert!(matches!(err, HookError::MalformedConfigLine { line_no: 2, .. }));
    assert!(std::env::var("SITE_HOOK_TEST_BEFORE").is_err());
    assert!(std::env::var("SITE_HOOK_TEST_AFTER").is_err());
}

#[test]
#[serial]
fn missing_file_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load(dir.path().join("env")).unwrap_err();
    assert!(matches!(err, HookError::ConfigRead { .. }));
}

#[test]
#[serial]
fn load_builds_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("env");
    fs::write(
        &path,
        "GITHUB_SECRET=from-file\n\
         LOCAL_REPO_DIR=/srv/blog\n\
         SERVER_DIR=/var/www/blog\n\
         GITHUB_TOKEN=ghp_example\n\
         COMMAND_TIMEOUT_SECS=90\n",
    )
    .unwrap();

    let config = Config::load(&path).unwrap();

    assert_eq!(config.github_secret, "from-file");
    assert_eq!(config.local_repo_dir, PathBuf::from("/srv/blog"));
    assert_eq!(config.server_dir, PathBuf::from("/var/www/blog"));
    assert_eq!(config.github_token.as_deref(), Some("ghp_example"));
    assert_eq!(config.command_timeout, Duration::from_secs(90));
}
