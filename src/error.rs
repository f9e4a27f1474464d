//! Fatal deployment errors
//!
//! Per-file and per-directory failures never surface here; the synchronizer
//! turns them into counters. These variants abort a run.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a deployment
#[derive(Debug, Error)]
pub enum DeployError {
    /// The build command could not be started or exited unsuccessfully
    #[error("Build failed: {0}")]
    Build(String),

    /// The local build output directory is missing or not a directory
    #[error("Build directory '{}' does not exist", .0.display())]
    MissingLocalRoot(PathBuf),

    /// Connecting or authenticating to the remote server failed
    #[error("FTP connection failed: {0}")]
    Connection(String),

    /// The remote root directory could not be created or entered
    #[error("Failed to prepare remote directory {path}: {reason}")]
    RemoteRoot { path: String, reason: String },

    /// Configuration could not be turned into a usable deployment setup
    #[error("Invalid configuration: {0}")]
    Config(String),
}
