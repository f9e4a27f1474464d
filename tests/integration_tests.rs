use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;
use std::path::Path;
use std::process::{Command, Output};

/// Integration tests for sitesync CLI commands
/// These tests run the actual binary and verify its behavior

const FTP_VARS: [&str; 6] = [
    "FTP_HOST",
    "FTP_PORT",
    "FTP_USER",
    "FTP_PASSWORD",
    "FTP_SECURE",
    "FTP_REMOTE_DIR",
];

fn sitesync(dir: &Path, args: &[&str]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_sitesync"));
    command.args(args).current_dir(dir).env_remove("RUST_LOG");
    for var in FTP_VARS {
        command.env_remove(var);
    }
    command.output().expect("Failed to execute sitesync")
}

fn write_config(temp: &TempDir, build_dir: &Path) -> String {
    let config = temp.child("deploy.yml");
    config
        .write_str(&format!(
            r#"
ftp:
  host: "127.0.0.1"
  user: "deployer"
  password: "super-secret"
local:
  build_dir: "{}"
  exclude_patterns:
    - ".env"
    - "node_modules"
    - pattern: '^\..*'
build:
  enabled: false
"#,
            build_dir.display()
        ))
        .expect("Failed to write config");
    config.path().to_string_lossy().into_owned()
}

#[test]
fn test_cli_help() {
    let temp = TempDir::new().unwrap();
    let output = sitesync(temp.path(), &["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("deploy"));
    assert!(stdout.contains("init"));
    assert!(stdout.contains("doctor"));
    assert!(stdout.contains("config"));
}

#[test]
fn test_cli_version() {
    let temp = TempDir::new().unwrap();
    let output = sitesync(temp.path(), &["--version"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("sitesync"));
}

#[test]
fn test_init_writes_config() {
    let temp = TempDir::new().unwrap();
    let output = sitesync(temp.path(), &["init"]);

    assert!(output.status.success());
    temp.child("sitesync.yml").assert(predicate::path::exists());
    let written = std::fs::read_to_string(temp.child("sitesync.yml").path()).unwrap();
    assert!(written.contains("ftpupload.net"));

    // A second init without --force refuses to overwrite
    let again = sitesync(temp.path(), &["init"]);
    assert!(!again.status.success());
    assert!(String::from_utf8_lossy(&again.stderr).contains("already exists"));
}

#[test]
fn test_init_force_replaces_broken_config() {
    let temp = TempDir::new().unwrap();
    temp.child("sitesync.yml").write_str("ftp: [").unwrap();

    let output = sitesync(temp.path(), &["init", "--force"]);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let written = std::fs::read_to_string(temp.child("sitesync.yml").path()).unwrap();
    assert!(written.contains("ftpupload.net"));
}

#[test]
fn test_init_ignores_invalid_port_override() {
    let temp = TempDir::new().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_sitesync"))
        .arg("init")
        .current_dir(temp.path())
        .env("FTP_PORT", "not-a-port")
        .output()
        .expect("Failed to execute sitesync");

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    temp.child("sitesync.yml").assert(predicate::path::exists());
}

#[test]
fn test_config_masks_password() {
    let temp = TempDir::new().unwrap();
    let dist = temp.child("dist");
    dist.create_dir_all().unwrap();
    let config_path = write_config(&temp, dist.path());

    let output = sitesync(temp.path(), &["--config", &config_path, "config"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("********"));
    assert!(!stdout.contains("super-secret"));
}

#[test]
fn test_dry_run_deploy() {
    let temp = TempDir::new().unwrap();
    let dist = temp.child("dist");
    dist.child("index.html").write_str("<html></html>").unwrap();
    dist.child(".env").write_str("SECRET=1").unwrap();
    dist.child("assets/logo.png").write_str("png").unwrap();
    dist.child("node_modules/pkg/index.js")
        .write_str("module.exports = 1")
        .unwrap();
    let config_path = write_config(&temp, dist.path());

    let output = sitesync(
        temp.path(),
        &["--config", &config_path, "deploy", "--dry-run", "--skip-build"],
    );

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Files uploaded: 2"));
    assert!(stdout.contains("Files skipped: 2"));
    assert!(stdout.contains("Errors: 0"));
}

#[test]
fn test_dry_run_deploy_json() {
    let temp = TempDir::new().unwrap();
    let dist = temp.child("dist");
    dist.child("index.html").write_str("<html></html>").unwrap();
    let config_path = write_config(&temp, dist.path());

    let output = sitesync(
        temp.path(),
        &["--config", &config_path, "deploy", "--dry-run", "--json"],
    );

    assert!(output.status.success());
    let summary: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be a single JSON document");

    assert_eq!(summary["uploaded"], 1);
    assert_eq!(summary["errors"], 0);
}

#[test]
fn test_deploy_missing_build_dir_fails() {
    let temp = TempDir::new().unwrap();
    let config_path = write_config(&temp, &temp.path().join("missing-dist"));

    let output = sitesync(
        temp.path(),
        &["--config", &config_path, "deploy", "--dry-run", "--skip-build"],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does not exist"));
}

#[test]
fn test_deploy_requires_credentials() {
    let temp = TempDir::new().unwrap();
    temp.child("dist/index.html").write_str("hi").unwrap();

    let config = temp.child("deploy.yml");
    config
        .write_str("local:\n  build_dir: dist\nbuild:\n  enabled: false\n")
        .unwrap();

    let output = sitesync(
        temp.path(),
        &["--config", config.path().to_str().unwrap(), "deploy"],
    );

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("credentials"));
}

#[test]
fn test_invalid_command() {
    let temp = TempDir::new().unwrap();
    let output = sitesync(temp.path(), &["nonexistent-command"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("error") || stderr.contains("unrecognized") || stderr.contains("invalid")
    );
}

#[test]
fn test_error_handling_invalid_config() {
    let temp = TempDir::new().unwrap();
    let config_path = temp.child("invalid-config.yml");
    config_path.write_str("invalid: yaml: content: [").unwrap();

    let output = sitesync(
        temp.path(),
        &["--config", config_path.path().to_str().unwrap(), "doctor"],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("parse") || stderr.contains("config"));
}

#[test]
fn test_doctor_command() {
    let temp = TempDir::new().unwrap();
    let dist = temp.child("dist");
    dist.create_dir_all().unwrap();
    let config_path = write_config(&temp, dist.path());

    let output = sitesync(temp.path(), &["--config", &config_path, "doctor"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Diagnostics"));
    assert!(stdout.contains("Build Directory"));
    assert!(stdout.contains("All checks passed (1 warnings)"));
}

#[test]
fn test_doctor_reports_failure_counts() {
    let temp = TempDir::new().unwrap();
    let config_path = write_config(&temp, &temp.path().join("missing-dist"));

    let output = sitesync(temp.path(), &["--config", &config_path, "doctor"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Some checks failed (1 errors, 1 warnings)"));
}
