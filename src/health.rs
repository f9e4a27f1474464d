//! System health checks for sitesync
//!
//! This module provides preflight checks to verify a deployment is likely to
//! succeed before running it.

use std::path::Path;

use crate::config::Config;
use crate::transport::resolve_address;

/// Result of system health checks
#[derive(Debug, Clone)]
pub struct HealthCheck {
    /// Local build output status
    pub build_dir: CheckResult,
    /// FTP credentials status
    pub credentials: CheckResult,
    /// FTP server address resolution
    pub server: CheckResult,
    /// Build command status (warning only, not required)
    pub build_command: CheckResult,
}

/// Result of an individual health check
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub passed: bool,
    pub message: String,
    pub details: Option<String>,
    pub is_warning: bool,
}

impl CheckResult {
    fn ok_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            details: Some(details.into()),
            is_warning: false,
        }
    }

    fn error_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
            details: Some(details.into()),
            is_warning: false,
        }
    }

    fn warning_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            details: Some(details.into()),
            is_warning: true,
        }
    }
}

impl HealthCheck {
    /// Run all health checks
    pub fn run(config: &Config) -> Self {
        Self {
            build_dir: Self::check_build_dir(config),
            credentials: Self::check_credentials(config),
            server: Self::check_server(config),
            build_command: Self::check_build_command(config),
        }
    }

    /// Check if all required checks passed (excludes warnings)
    pub fn all_passed(&self) -> bool {
        self.build_dir.passed && self.credentials.passed && self.server.passed
    }

    /// Get list of failed checks (errors only, not warnings)
    pub fn errors(&self) -> Vec<&CheckResult> {
        self.all_checks()
            .into_iter()
            .map(|(_, result)| result)
            .filter(|r| !r.passed && !r.is_warning)
            .collect()
    }

    /// Get list of warnings
    pub fn warnings(&self) -> Vec<&CheckResult> {
        self.all_checks()
            .into_iter()
            .map(|(_, result)| result)
            .filter(|r| r.is_warning)
            .collect()
    }

    /// Check the build output directory exists
    fn check_build_dir(config: &Config) -> CheckResult {
        let path = Path::new(&config.local.build_dir);
        if path.is_dir() {
            CheckResult::ok_with_details("Build directory exists", path.display().to_string())
        } else if config.build.enabled {
            CheckResult::warning_with_details(
                "Build directory does not exist yet",
                format!("It should be created by: {}", config.build.command),
            )
        } else {
            CheckResult::error_with_details(
                "Build directory does not exist",
                format!("Expected: {}", path.display()),
            )
        }
    }

    /// Check FTP credentials are configured
    fn check_credentials(config: &Config) -> CheckResult {
        if config.has_credentials() {
            CheckResult::ok_with_details("FTP credentials configured", format!("User: {}", config.ftp.user))
        } else {
            CheckResult::error_with_details(
                "FTP credentials missing",
                "Set FTP_USER and FTP_PASSWORD in the environment or a .env file",
            )
        }
    }

    /// Check the server address resolves
    fn check_server(config: &Config) -> CheckResult {
        match resolve_address(&config.ftp.host, config.ftp.port) {
            Ok(address) => CheckResult::ok_with_details(
                "FTP server address resolves",
                format!("{}:{} -> {}", config.ftp.host, config.ftp.port, address),
            ),
            Err(e) => CheckResult::error_with_details(
                "FTP server address does not resolve",
                format!("{:#}", e),
            ),
        }
    }

    /// Check a build command is configured (warning only)
    fn check_build_command(config: &Config) -> CheckResult {
        if !config.build.enabled {
            CheckResult::warning_with_details(
                "Build step disabled",
                "The build directory will be uploaded as-is",
            )
        } else if config.build.command.trim().is_empty() {
            CheckResult::warning_with_details(
                "Build command is empty",
                "Set build.command or disable the build step",
            )
        } else {
            CheckResult::ok_with_details("Build command configured", config.build.command.clone())
        }
    }

    /// Get all checks as a slice for iteration
    pub fn all_checks(&self) -> [(&'static str, &CheckResult); 4] {
        [
            ("Build Directory", &self.build_dir),
            ("FTP Credentials", &self.credentials),
            ("FTP Server", &self.server),
            ("Build Command", &self.build_command),
        ]
    }
}
