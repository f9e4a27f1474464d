//! Runs the site's build command before a deployment

use std::process::Stdio;
use tokio::process::Command as AsyncCommand;
use tracing::{debug, info};

use crate::config::BuildConfig;
use crate::error::DeployError;

/// Run the configured build command, inheriting stdout and stderr
pub async fn run_build(build: &BuildConfig) -> Result<(), DeployError> {
    let command_line = build.command.trim();
    if command_line.is_empty() {
        return Err(DeployError::Build("build command is empty".to_string()));
    }

    info!("Building project for production: {}", command_line);
    debug!("Build working directory: {}", build.working_dir);

    let status = shell_command(command_line)
        .current_dir(&build.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .map_err(|e| DeployError::Build(format!("failed to run '{}': {}", command_line, e)))?;

    if !status.success() {
        return Err(DeployError::Build(format!(
            "'{}' exited with {}",
            command_line, status
        )));
    }

    info!("Build completed successfully");
    Ok(())
}

#[cfg(unix)]
fn shell_command(command_line: &str) -> AsyncCommand {
    let mut command = AsyncCommand::new("sh");
    command.arg("-c").arg(command_line);
    command
}

#[cfg(windows)]
fn shell_command(command_line: &str) -> AsyncCommand {
    let mut command = AsyncCommand::new("cmd");
    command.arg("/C").arg(command_line);
    command
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    fn build_config(command: &str, working_dir: &str) -> BuildConfig {
        BuildConfig {
            enabled: true,
            command: command.to_string(),
            working_dir: working_dir.to_string(),
        }
    }

    #[tokio::test]
    async fn test_successful_build() {
        let result = run_build(&build_config("true", ".")).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_failing_build() {
        let result = run_build(&build_config("exit 3", ".")).await;
        assert_matches!(result, Err(DeployError::Build(msg)) if msg.contains("exit 3"));
    }

    #[tokio::test]
    async fn test_empty_command() {
        let result = run_build(&build_config("   ", ".")).await;
        assert_matches!(result, Err(DeployError::Build(_)));
    }

    #[tokio::test]
    async fn test_build_runs_in_working_dir() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().to_string_lossy().into_owned();

        run_build(&build_config("mkdir -p dist && touch dist/index.html", &dir))
            .await
            .expect("Build should succeed");

        assert!(temp.path().join("dist/index.html").exists());
    }

    #[tokio::test]
    async fn test_missing_working_dir() {
        let result = run_build(&build_config("true", "/nonexistent/sitesync/dir")).await;
        assert_matches!(result, Err(DeployError::Build(msg)) if msg.contains("failed to run"));
    }
}
