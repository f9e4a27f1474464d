//! Deployment synchronizer - mirrors a local tree onto a remote session
//!
//! Traversal is depth-first and strictly sequential. Per-entry failures are
//! recorded in [`DeploymentStats`] and never abort the walk; the stats value is
//! threaded through the traversal rather than held in shared state.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::exclude::ExclusionRules;
use crate::transport::{remote_join, remote_parent, RemoteSession};

/// Immutable settings for one synchronization run
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub local_root: PathBuf,
    pub remote_root: String,
    pub exclude_rules: ExclusionRules,
    pub max_file_size: Option<u64>,
}

impl SyncConfig {
    /// Check a path relative to the local root against the exclusion rules
    pub fn should_exclude(&self, relative_path: &str) -> bool {
        self.exclude_rules.should_exclude(relative_path)
    }
}

/// Why an entry was skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Excluded,
    TooLarge { size: u64, limit: u64 },
    /// Directory reached through a symbolic link; never descended into
    SymlinkedDirectory,
}

/// Classification of a single visited entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EntryOutcome {
    Uploaded { path: String, bytes: u64 },
    Skipped { path: String, reason: SkipReason },
    Failed { path: String, error: String },
}

impl EntryOutcome {
    pub fn path(&self) -> &str {
        match self {
            Self::Uploaded { path, .. } | Self::Skipped { path, .. } | Self::Failed { path, .. } => {
                path
            }
        }
    }
}

/// Aggregate results of a deployment run
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentStats {
    pub started_at: DateTime<Utc>,
    pub uploaded: usize,
    pub skipped: usize,
    pub errors: usize,
    pub bytes_uploaded: u64,
    #[serde(rename = "duration_secs", serialize_with = "serialize_secs")]
    pub duration: Duration,
    pub outcomes: Vec<EntryOutcome>,
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

impl DeploymentStats {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            uploaded: 0,
            skipped: 0,
            errors: 0,
            bytes_uploaded: 0,
            duration: Duration::ZERO,
            outcomes: Vec::new(),
        }
    }

    fn record_uploaded(&mut self, path: String, bytes: u64) {
        self.uploaded += 1;
        self.bytes_uploaded += bytes;
        self.outcomes.push(EntryOutcome::Uploaded { path, bytes });
    }

    fn record_skipped(&mut self, path: String, reason: SkipReason) {
        self.skipped += 1;
        self.outcomes.push(EntryOutcome::Skipped { path, reason });
    }

    fn record_failed(&mut self, path: String, error: String) {
        self.errors += 1;
        self.outcomes.push(EntryOutcome::Failed { path, error });
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    pub fn uploaded_paths(&self) -> Vec<&str> {
        self.paths_where(|o| matches!(o, EntryOutcome::Uploaded { .. }))
    }

    pub fn skipped_paths(&self) -> Vec<&str> {
        self.paths_where(|o| matches!(o, EntryOutcome::Skipped { .. }))
    }

    pub fn failed_paths(&self) -> Vec<&str> {
        self.paths_where(|o| matches!(o, EntryOutcome::Failed { .. }))
    }

    fn paths_where(&self, keep: impl Fn(&EntryOutcome) -> bool) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| keep(o))
            .map(EntryOutcome::path)
            .collect()
    }
}

impl Default for DeploymentStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Mirror `config.local_root` onto `config.remote_root` through `session`
///
/// The session must already be connected and the remote root must exist.
pub fn synchronize<S>(session: &mut S, config: &SyncConfig) -> DeploymentStats
where
    S: RemoteSession + ?Sized,
{
    let start = Instant::now();
    let mut stats = DeploymentStats::new();

    info!(
        "Mirroring {} -> {}",
        config.local_root.display(),
        config.remote_root
    );

    let mut walker = Walker {
        session,
        config,
        stats: &mut stats,
    };
    walker.walk_dir(&config.local_root, "");

    stats.duration = start.elapsed();
    stats
}

struct Walker<'a, S: RemoteSession + ?Sized> {
    session: &'a mut S,
    config: &'a SyncConfig,
    stats: &'a mut DeploymentStats,
}

impl<S: RemoteSession + ?Sized> Walker<'_, S> {
    fn walk_dir(&mut self, local_dir: &Path, relative_dir: &str) {
        let entries = match fs::read_dir(local_dir) {
            Ok(entries) => entries,
            Err(e) => {
                error!("Failed to read directory {}: {}", local_dir.display(), e);
                self.stats
                    .record_failed(display_relative(relative_dir), e.to_string());
                return;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    error!("Failed to read entry in {}: {}", local_dir.display(), e);
                    self.stats
                        .record_failed(display_relative(relative_dir), e.to_string());
                    continue;
                }
            };

            let name = entry.file_name().to_string_lossy().into_owned();
            let relative = relative_join(relative_dir, &name);
            let local_path = entry.path();

            if self.config.should_exclude(&relative) {
                info!("Skipping: {}", relative);
                self.stats.record_skipped(relative, SkipReason::Excluded);
                continue;
            }

            // Linked files are uploaded from their target; linked directories can form cycles
            let metadata = match fs::symlink_metadata(&local_path).and_then(|meta| {
                if meta.file_type().is_symlink() {
                    fs::metadata(&local_path).map(|target| (target, true))
                } else {
                    Ok((meta, false))
                }
            }) {
                Ok((metadata, true)) if metadata.is_dir() => {
                    warn!("Skipping symlinked directory: {}", relative);
                    self.stats
                        .record_skipped(relative, SkipReason::SymlinkedDirectory);
                    continue;
                }
                Ok((metadata, _)) => metadata,
                Err(e) => {
                    error!("Failed to stat {}: {}", local_path.display(), e);
                    self.stats.record_failed(relative, e.to_string());
                    continue;
                }
            };

            let remote_path = remote_join(&self.config.remote_root, &relative);

            if metadata.is_dir() {
                self.visit_dir(&local_path, relative, &remote_path);
            } else {
                self.visit_file(&local_path, relative, &remote_path, metadata.len());
            }
        }
    }

    fn visit_dir(&mut self, local_path: &Path, relative: String, remote_path: &str) {
        if let Err(e) = self.session.ensure_dir(remote_path) {
            error!("Failed to process directory {}: {:#}", relative, e);
            self.stats.record_failed(relative, format!("{:#}", e));
            return;
        }

        debug!("Entering directory {}", relative);
        self.walk_dir(local_path, &relative);
    }

    fn visit_file(&mut self, local_path: &Path, relative: String, remote_path: &str, size: u64) {
        if let Some(limit) = self.config.max_file_size {
            if size > limit {
                warn!(
                    "Skipping {}: {} exceeds the {} limit",
                    relative,
                    format_size(size),
                    format_size(limit)
                );
                self.stats
                    .record_skipped(relative, SkipReason::TooLarge { size, limit });
                return;
            }
        }

        info!("Uploading: {} ({})", relative, format_size(size));

        let result = self
            .session
            .ensure_dir(&remote_parent(remote_path))
            .and_then(|()| self.session.upload_file(local_path, remote_path));

        match result {
            Ok(bytes) => self.stats.record_uploaded(relative, bytes),
            Err(e) => {
                error!("Failed to upload {}: {:#}", relative, e);
                self.stats.record_failed(relative, format!("{:#}", e));
            }
        }
    }
}

fn relative_join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

fn display_relative(relative: &str) -> String {
    if relative.is_empty() {
        ".".to_string()
    } else {
        relative.to_string()
    }
}

/// Human-readable size in KB with two decimals
pub fn format_size(bytes: u64) -> String {
    format!("{:.2} KB", bytes as f64 / 1024.0)
}
