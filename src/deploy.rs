//! Deployer - the end-to-end deployment lifecycle
//!
//! build → pre-flight → connect → ensure root → synchronize → summarize →
//! disconnect. Everything before traversal is fatal; the session is always
//! released once it has been opened.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::build_step::run_build;
use crate::config::Config;
use crate::error::DeployError;
use crate::sync::{format_size, synchronize, DeploymentStats, SyncConfig};
use crate::transport::{DryRunSession, FtpSession, RemoteSession};

/// Per-invocation switches
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Log the transfers instead of connecting to the server
    pub dry_run: bool,
    /// Do not run the build command
    pub skip_build: bool,
}

/// Orchestrates one deployment from a resolved configuration
pub struct Deployer {
    config: Config,
}

impl Deployer {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the full deployment
    pub async fn deploy(&self, options: RunOptions) -> Result<DeploymentStats> {
        info!(
            "Starting deployment to {}:{}{}",
            self.config.ftp.host,
            self.config.ftp.port,
            self.config.ftp.remote_dir
        );

        // Reject bad exclusion rules before spending time on a build
        let sync_config = self
            .config
            .sync_config()
            .map_err(|e| DeployError::Config(format!("{:#}", e)))?;

        if options.skip_build || !self.config.build.enabled {
            info!("Skipping build step");
        } else {
            run_build(&self.config.build).await?;
        }

        preflight(&sync_config)?;

        let ftp = self.config.ftp.clone();
        let transfer = self.config.options.clone();
        let dry_run = options.dry_run;

        // The FTP client is blocking; keep it off the async workers
        let stats = tokio::task::spawn_blocking(move || -> Result<DeploymentStats> {
            let mut session: Box<dyn RemoteSession> = if dry_run {
                info!("Dry run: no files will be transferred");
                Box::new(DryRunSession::new())
            } else {
                Box::new(FtpSession::connect(&ftp, &transfer)?)
            };
            run_session(session.as_mut(), &sync_config)
        })
        .await
        .context("Deployment task panicked")??;

        log_summary(&stats);
        Ok(stats)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Fail before connecting if there is nothing to upload
pub fn preflight(config: &SyncConfig) -> Result<(), DeployError> {
    if config.local_root.is_dir() {
        Ok(())
    } else {
        Err(DeployError::MissingLocalRoot(config.local_root.clone()))
    }
}

/// Ensure the remote root, synchronize, then always disconnect
pub fn run_session(session: &mut dyn RemoteSession, config: &SyncConfig) -> Result<DeploymentStats> {
    info!("Ensuring remote directory exists: {}", config.remote_root);

    let result = match session.ensure_dir(&config.remote_root) {
        Ok(()) => {
            info!("Starting file upload");
            Ok(synchronize(session, config))
        }
        Err(e) => Err(DeployError::RemoteRoot {
            path: config.remote_root.clone(),
            reason: format!("{:#}", e),
        }
        .into()),
    };

    if let Err(e) = session.disconnect() {
        warn!("Failed to close remote session cleanly: {:#}", e);
    }

    result
}

/// Log the end-of-run summary
pub fn log_summary(stats: &DeploymentStats) {
    info!(
        "Deployment finished in {:.2}s: {} uploaded ({}), {} skipped, {} errors",
        stats.duration.as_secs_f64(),
        stats.uploaded,
        format_size(stats.bytes_uploaded),
        stats.skipped,
        stats.errors
    );

    if stats.has_errors() {
        warn!("Deployment completed with {} errors", stats.errors);
    }
}
